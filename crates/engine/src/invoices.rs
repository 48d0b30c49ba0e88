//! Sale and purchase invoices.
//!
//! Both kinds share the `invoices` table and differ only in the direction
//! of their side effects:
//!
//! | kind       | stock per product line | party balance |
//! |------------|------------------------|---------------|
//! | `sale`     | `-quantity`            | `+total`      |
//! | `purchase` | `+quantity`            | `-total`      |
//!
//! `amount_due` is always `total - amount_paid` and `status` is always
//! [`InvoiceStatus::derive`] of the two.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DocumentTotals, DocumentType, EngineError, InvoiceStatus, Line, Money, StockSource,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Sale,
    Purchase,
}

impl InvoiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
        }
    }

    pub fn document_type(self) -> DocumentType {
        match self {
            Self::Sale => DocumentType::SaleInvoice,
            Self::Purchase => DocumentType::PurchaseInvoice,
        }
    }

    pub(crate) fn stock_source(self) -> StockSource {
        match self {
            Self::Sale => StockSource::SaleInvoice,
            Self::Purchase => StockSource::PurchaseInvoice,
        }
    }

    /// Sign applied to line quantities when the invoice takes effect.
    pub(crate) fn stock_sign(self) -> i64 {
        match self {
            Self::Sale => -1,
            Self::Purchase => 1,
        }
    }

    /// Signed balance delta of an invoice with the given total.
    pub(crate) fn balance_delta(self, total: Money) -> Money {
        match self {
            Self::Sale => total,
            Self::Purchase => -total,
        }
    }
}

impl TryFrom<&str> for InvoiceKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale" => Ok(Self::Sale),
            "purchase" => Ok(Self::Purchase),
            other => Err(EngineError::Validation(format!(
                "invalid invoice kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub kind: InvoiceKind,
    pub number: String,
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub status: InvoiceStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub amount_paid: Money,
    pub amount_due: Money,
    /// Estimate this invoice was converted from, if any.
    pub estimate_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<Line>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub number: String,
    pub party_id: String,
    pub date: Date,
    pub status: String,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub discount_amount: i64,
    pub total: i64,
    pub amount_paid: i64,
    pub amount_due: i64,
    pub estimate_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::parties::Entity",
        from = "Column::PartyId",
        to = "super::parties::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Parties,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::parties::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parties.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Header row of a freshly created invoice: nothing paid yet.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_header(
        id: Uuid,
        kind: InvoiceKind,
        number: String,
        party_id: Uuid,
        date: NaiveDate,
        totals: &DocumentTotals,
        estimate_id: Option<Uuid>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActiveValue::Set(id.to_string()),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            number: ActiveValue::Set(number),
            party_id: ActiveValue::Set(party_id.to_string()),
            date: ActiveValue::Set(date),
            status: ActiveValue::Set(
                InvoiceStatus::derive(Money::ZERO, totals.total)
                    .as_str()
                    .to_string(),
            ),
            subtotal: ActiveValue::Set(totals.subtotal.minor()),
            tax_amount: ActiveValue::Set(totals.tax_amount.minor()),
            discount_amount: ActiveValue::Set(totals.discount_amount.minor()),
            total: ActiveValue::Set(totals.total.minor()),
            amount_paid: ActiveValue::Set(0),
            amount_due: ActiveValue::Set(totals.total.minor()),
            estimate_id: ActiveValue::Set(estimate_id.map(|id| id.to_string())),
            notes: ActiveValue::Set(notes),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
    }
}

impl TryFrom<Model> for Invoice {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "invoice")?,
            kind: InvoiceKind::try_from(model.kind.as_str())?,
            number: model.number,
            party_id: parse_uuid(&model.party_id, "party")?,
            date: model.date,
            status: InvoiceStatus::try_from(model.status.as_str())?,
            subtotal: Money::new(model.subtotal),
            tax_amount: Money::new(model.tax_amount),
            discount_amount: Money::new(model.discount_amount),
            total: Money::new(model.total),
            amount_paid: Money::new(model.amount_paid),
            amount_due: Money::new(model.amount_due),
            estimate_id: parse_optional_uuid(model.estimate_id.as_deref(), "estimate")?,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
            lines: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effects_are_mirrored_between_kinds() {
        let total = Money::new(16_000);
        assert_eq!(InvoiceKind::Sale.balance_delta(total), total);
        assert_eq!(InvoiceKind::Purchase.balance_delta(total), -total);
        assert_eq!(InvoiceKind::Sale.stock_sign(), -1);
        assert_eq!(InvoiceKind::Purchase.stock_sign(), 1);
    }
}
