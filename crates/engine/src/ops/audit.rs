//! Recompute balances and stock from the documents that currently exist.
//!
//! A consistent store satisfies, for every party,
//!
//! ```text
//! current_balance = opening_balance
//!                 + Σ sale totals - Σ purchase totals
//!                 - Σ payments in + Σ payments out
//!                 - Σ credit note totals
//! ```
//!
//! and for every product,
//!
//! ```text
//! stock_quantity = opening_stock
//!                - Σ sold + Σ purchased + Σ returned
//!                + Σ manual adjustments
//! ```

use sea_orm::{Statement, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{DocumentType, EngineError, Money, Quantity, ResultEngine, StockSource};

use super::{Engine, with_tx};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PartyAudit {
    pub party_id: Uuid,
    pub opening_balance: Money,
    pub recorded_balance: Money,
    pub expected_balance: Money,
}

impl PartyAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded_balance == self.expected_balance
    }

    pub fn drift(&self) -> Money {
        self.recorded_balance - self.expected_balance
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ItemAudit {
    pub item_id: Uuid,
    pub opening_stock: Quantity,
    pub recorded_stock: Quantity,
    pub expected_stock: Quantity,
}

impl ItemAudit {
    pub fn is_consistent(&self) -> bool {
        self.recorded_stock == self.expected_stock
    }

    pub fn drift(&self) -> Quantity {
        self.recorded_stock - self.expected_stock
    }
}

impl Engine {
    pub async fn audit_party(&self, party_id: Uuid) -> ResultEngine<PartyAudit> {
        with_tx!(self, |db_tx| {
            let party = self.require_party(&db_tx, party_id).await?;
            let id = party_id.to_string();

            let stmt = Statement::from_sql_and_values(
                self.backend(),
                "SELECT \
                 (SELECT COALESCE(SUM(CASE kind WHEN 'sale' THEN total ELSE -total END), 0) \
                    FROM invoices WHERE party_id = ?) \
                 + (SELECT COALESCE(SUM(CASE kind WHEN 'in' THEN -amount ELSE amount END), 0) \
                    FROM payments WHERE party_id = ?) \
                 - (SELECT COALESCE(SUM(total), 0) FROM credit_notes WHERE party_id = ?) \
                 AS delta;",
                vec![id.clone().into(), id.clone().into(), id.into()],
            );
            let row = db_tx.query_one(stmt).await?;
            let delta: i64 = row.and_then(|r| r.try_get("", "delta").ok()).unwrap_or(0);

            let audit = PartyAudit {
                party_id,
                opening_balance: party.opening_balance,
                recorded_balance: party.current_balance,
                expected_balance: party.opening_balance + Money::new(delta),
            };
            if audit.is_consistent() {
                info!(%party_id, balance = %audit.recorded_balance, "party balance consistent");
            } else {
                warn!(
                    %party_id,
                    recorded = %audit.recorded_balance,
                    expected = %audit.expected_balance,
                    "party balance drift"
                );
            }
            Ok(audit)
        })
    }

    /// Services never move stock, so their expected stock is their
    /// opening stock.
    pub async fn audit_item(&self, item_id: Uuid) -> ResultEngine<ItemAudit> {
        with_tx!(self, |db_tx| {
            let items = self.load_items(&db_tx, [item_id]).await?;
            let Some(item) = items.get(&item_id) else {
                return Err(EngineError::NotFound(format!("item {item_id}")));
            };

            let delta: i64 = if item.tracks_stock() {
                let id = item_id.to_string();
                let stmt = Statement::from_sql_and_values(
                    self.backend(),
                    "SELECT \
                     (SELECT COALESCE(SUM(CASE document_type \
                        WHEN ? THEN -quantity \
                        WHEN ? THEN quantity \
                        WHEN ? THEN quantity \
                        ELSE 0 END), 0) \
                        FROM line_items WHERE item_id = ?) \
                     + (SELECT COALESCE(SUM(delta), 0) FROM item_history \
                        WHERE item_id = ? AND source = ?) \
                     AS delta;",
                    vec![
                        DocumentType::SaleInvoice.as_str().into(),
                        DocumentType::PurchaseInvoice.as_str().into(),
                        DocumentType::CreditNote.as_str().into(),
                        id.clone().into(),
                        id.into(),
                        StockSource::Manual.as_str().into(),
                    ],
                );
                let row = db_tx.query_one(stmt).await?;
                row.and_then(|r| r.try_get("", "delta").ok()).unwrap_or(0)
            } else {
                0
            };

            let audit = ItemAudit {
                item_id,
                opening_stock: item.opening_stock,
                recorded_stock: item.stock_quantity,
                expected_stock: item.opening_stock + Quantity::new(delta),
            };
            if audit.is_consistent() {
                info!(%item_id, stock = %audit.recorded_stock, "item stock consistent");
            } else {
                warn!(
                    %item_id,
                    recorded = %audit.recorded_stock,
                    expected = %audit.expected_stock,
                    "item stock drift"
                );
            }
            Ok(audit)
        })
    }
}
