use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, Order, QueryFilter, QueryOrder, Statement,
    TransactionTrait, prelude::*,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Actor, AdjustStockCmd, EngineError, Item, ItemHistoryEntry, LineInput, Quantity, ResultEngine,
    StockSource, item_history,
    item_history::STOCK_ADJUSTED,
    util::normalize_required_text,
};

use super::{Engine, with_tx};

/// One signed stock movement and what caused it.
pub(super) struct StockMove<'a> {
    pub item_id: Uuid,
    pub delta: Quantity,
    pub source: StockSource,
    pub reference_id: Option<Uuid>,
    pub reason: &'a str,
}

/// Requested quantity per product item, in first-seen line order.
fn requested_per_item(lines: &[LineInput], items: &HashMap<Uuid, Item>) -> Vec<(Uuid, Quantity)> {
    let mut requested: Vec<(Uuid, Quantity)> = Vec::new();
    for line in lines {
        let Some(item_id) = line.item_id else {
            continue;
        };
        if !items.get(&item_id).is_some_and(Item::tracks_stock) {
            continue;
        }
        match requested.iter_mut().find(|(id, _)| *id == item_id) {
            Some((_, quantity)) => *quantity += line.quantity,
            None => requested.push((item_id, line.quantity)),
        }
    }
    requested
}

/// Check that every product on a sale can be sold on `date`.
///
/// Expiry is checked before availability. Quantities of the same item on
/// several lines are summed. The check reads the stock as loaded in the
/// current transaction; it is not enforced by the store.
pub(super) fn validate_sale_lines(
    lines: &[LineInput],
    items: &HashMap<Uuid, Item>,
    date: NaiveDate,
) -> ResultEngine<()> {
    for (item_id, requested) in requested_per_item(lines, items) {
        let Some(item) = items.get(&item_id) else {
            return Err(EngineError::NotFound(format!("item {item_id}")));
        };
        if let Some(expiry_date) = item.expiry_date
            && item.is_expired_on(date)
        {
            return Err(EngineError::ExpiredItem {
                item_id,
                item_name: item.name.clone(),
                expiry_date,
            });
        }
        if item.stock_quantity < requested {
            return Err(EngineError::InsufficientStock {
                item_id,
                item_name: item.name.clone(),
                available: item.stock_quantity,
                requested,
            });
        }
    }
    Ok(())
}

impl Engine {
    /// Apply `stock_quantity += delta` and log the movement.
    ///
    /// Returns the quantity after the update.
    pub(super) async fn adjust_stock_in(
        &self,
        db_tx: &DatabaseTransaction,
        movement: StockMove<'_>,
        actor: &Actor,
    ) -> ResultEngine<Quantity> {
        let now = Utc::now();
        let row = db_tx
            .query_one(Statement::from_sql_and_values(
                self.backend(),
                "UPDATE items SET stock_quantity = stock_quantity + ?, updated_at = ? \
                 WHERE id = ? RETURNING stock_quantity;",
                vec![
                    movement.delta.hundredths().into(),
                    now.into(),
                    movement.item_id.to_string().into(),
                ],
            ))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("item {}", movement.item_id)))?;
        let new_quantity = Quantity::new(row.try_get::<i64>("", "stock_quantity")?);
        let old_quantity = new_quantity - movement.delta;

        let description = format!(
            "{}: stock {old_quantity} -> {new_quantity} ({:+})",
            movement.reason, movement.delta
        );
        item_history::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            item_id: ActiveValue::Set(movement.item_id.to_string()),
            action: ActiveValue::Set(STOCK_ADJUSTED.to_string()),
            delta: ActiveValue::Set(movement.delta.hundredths()),
            old_quantity: ActiveValue::Set(old_quantity.hundredths()),
            new_quantity: ActiveValue::Set(new_quantity.hundredths()),
            source: ActiveValue::Set(movement.source.as_str().to_string()),
            reference_id: ActiveValue::Set(movement.reference_id.map(|id| id.to_string())),
            description: ActiveValue::Set(description),
            user_id: ActiveValue::Set(actor.user_id.clone()),
            created_at: ActiveValue::Set(now),
        }
        .insert(db_tx)
        .await?;

        debug!(
            item_id = %movement.item_id,
            delta = %movement.delta,
            old = %old_quantity,
            new = %new_quantity,
            source = movement.source.as_str(),
            "stock adjusted"
        );
        Ok(new_quantity)
    }

    /// Move stock for every product line of a document by `sign * quantity`.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn move_line_stock(
        &self,
        db_tx: &DatabaseTransaction,
        lines: &[LineInput],
        items: &HashMap<Uuid, Item>,
        sign: i64,
        source: StockSource,
        reference_id: Uuid,
        reason: &str,
        actor: &Actor,
    ) -> ResultEngine<()> {
        for line in lines {
            let Some(item_id) = line.item_id else {
                continue;
            };
            if !items.get(&item_id).is_some_and(Item::tracks_stock) {
                continue;
            }
            let delta = if sign < 0 { -line.quantity } else { line.quantity };
            self.adjust_stock_in(
                db_tx,
                StockMove {
                    item_id,
                    delta,
                    source,
                    reference_id: Some(reference_id),
                    reason,
                },
                actor,
            )
            .await?;
        }
        Ok(())
    }

    /// Manual stock correction. May take the stock below zero.
    pub async fn adjust_stock(&self, cmd: AdjustStockCmd, actor: &Actor) -> ResultEngine<Item> {
        let AdjustStockCmd {
            item_id,
            delta,
            reason,
        } = cmd;
        if delta.is_zero() {
            return Err(EngineError::Validation(
                "stock adjustment must not be zero".to_string(),
            ));
        }
        let reason = normalize_required_text(&reason, "reason")?;

        with_tx!(self, |db_tx| {
            let items = self.load_items(&db_tx, [item_id]).await?;
            if !items.get(&item_id).is_some_and(Item::tracks_stock) {
                return Err(EngineError::Validation(
                    "only product items carry stock".to_string(),
                ));
            }
            let new_quantity = self
                .adjust_stock_in(
                    &db_tx,
                    StockMove {
                        item_id,
                        delta,
                        source: StockSource::Manual,
                        reference_id: None,
                        reason: &reason,
                    },
                    actor,
                )
                .await?;
            info!(%item_id, %delta, %new_quantity, "manual stock adjustment");

            let mut refreshed = self.load_items(&db_tx, [item_id]).await?;
            refreshed
                .remove(&item_id)
                .ok_or_else(|| EngineError::NotFound(format!("item {item_id}")))
        })
    }

    /// Stock log of an item in the order it was written.
    pub async fn item_history(&self, item_id: Uuid) -> ResultEngine<Vec<ItemHistoryEntry>> {
        item_history::Entity::find()
            .filter(item_history::Column::ItemId.eq(item_id.to_string()))
            .order_by_asc(item_history::Column::CreatedAt)
            .order_by(Expr::cust("rowid"), Order::Asc)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ItemHistoryEntry::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{ItemKind, Money};

    fn item(kind: ItemKind, stock: i64, expiry: Option<NaiveDate>) -> Item {
        let now = Utc::now();
        Item {
            id: Uuid::new_v4(),
            name: "Rice 5kg".to_string(),
            sku: None,
            kind,
            sale_price: Money::from_major(80),
            purchase_price: Money::from_major(60),
            opening_stock: Quantity::units(stock),
            stock_quantity: Quantity::units(stock),
            low_stock_alert: Quantity::ZERO,
            is_active: true,
            expiry_date: expiry,
            created_at: now,
            updated_at: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sums_quantities_of_repeated_items() {
        let rice = item(ItemKind::Product, 5, None);
        let items = HashMap::from([(rice.id, rice.clone())]);
        let lines = vec![
            LineInput::item(rice.id, Quantity::units(3), Money::from_major(80)),
            LineInput::item(rice.id, Quantity::units(3), Money::from_major(80)),
        ];
        let err = validate_sale_lines(&lines, &items, date(2026, 3, 1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientStock {
                item_id: rice.id,
                item_name: rice.name,
                available: Quantity::units(5),
                requested: Quantity::units(6),
            }
        );
    }

    #[test]
    fn services_are_never_checked() {
        let service = item(ItemKind::Service, 0, Some(date(2020, 1, 1)));
        let items = HashMap::from([(service.id, service.clone())]);
        let lines = vec![LineInput::item(
            service.id,
            Quantity::units(10),
            Money::from_major(5),
        )];
        assert!(validate_sale_lines(&lines, &items, date(2026, 3, 1)).is_ok());
    }

    #[test]
    fn expiry_wins_over_stock() {
        let milk = item(ItemKind::Product, 0, Some(date(2026, 2, 28)));
        let items = HashMap::from([(milk.id, milk.clone())]);
        let lines = vec![LineInput::item(milk.id, Quantity::units(1), Money::from_major(1))];
        let err = validate_sale_lines(&lines, &items, date(2026, 3, 1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::ExpiredItem {
                item_id: milk.id,
                item_name: milk.name.clone(),
                expiry_date: date(2026, 2, 28),
            }
        );

        // Selling on the expiry day itself is still allowed.
        let fresh = item(ItemKind::Product, 1, Some(date(2026, 3, 1)));
        let items = HashMap::from([(fresh.id, fresh.clone())]);
        let lines = vec![LineInput::item(fresh.id, Quantity::units(1), Money::from_major(1))];
        assert!(validate_sale_lines(&lines, &items, date(2026, 3, 1)).is_ok());
    }
}
