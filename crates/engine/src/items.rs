//! The module contains the `Item` struct and its stock bookkeeping.
//!
//! Only [`ItemKind::Product`] items carry stock. Service lines never move
//! `stock_quantity` and are never checked for availability.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Quantity, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Product,
    Service,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
        }
    }
}

impl TryFrom<&str> for ItemKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "product" => Ok(Self::Product),
            "service" => Ok(Self::Service),
            other => Err(EngineError::Validation(format!(
                "invalid item kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub kind: ItemKind,
    pub sale_price: Money,
    pub purchase_price: Money,
    pub opening_stock: Quantity,
    pub stock_quantity: Quantity,
    pub low_stock_alert: Quantity,
    pub is_active: bool,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn tracks_stock(&self) -> bool {
        self.kind == ItemKind::Product
    }

    /// `true` once the item can no longer be sold on `date`.
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < date)
    }

    pub fn is_low_on_stock(&self) -> bool {
        self.tracks_stock() && self.stock_quantity <= self.low_stock_alert
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub kind: String,
    pub sale_price: i64,
    pub purchase_price: i64,
    pub opening_stock: i64,
    pub stock_quantity: i64,
    pub low_stock_alert: i64,
    pub is_active: bool,
    pub expiry_date: Option<Date>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::lines::Entity")]
    Lines,
    #[sea_orm(has_many = "super::item_history::Entity")]
    History,
}

impl Related<super::lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::item_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Item> for ActiveModel {
    fn from(item: &Item) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            name: ActiveValue::Set(item.name.clone()),
            sku: ActiveValue::Set(item.sku.clone()),
            kind: ActiveValue::Set(item.kind.as_str().to_string()),
            sale_price: ActiveValue::Set(item.sale_price.minor()),
            purchase_price: ActiveValue::Set(item.purchase_price.minor()),
            opening_stock: ActiveValue::Set(item.opening_stock.hundredths()),
            stock_quantity: ActiveValue::Set(item.stock_quantity.hundredths()),
            low_stock_alert: ActiveValue::Set(item.low_stock_alert.hundredths()),
            is_active: ActiveValue::Set(item.is_active),
            expiry_date: ActiveValue::Set(item.expiry_date),
            created_at: ActiveValue::Set(item.created_at),
            updated_at: ActiveValue::Set(item.updated_at),
        }
    }
}

impl TryFrom<Model> for Item {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "item")?,
            name: model.name,
            sku: model.sku,
            kind: ItemKind::try_from(model.kind.as_str())?,
            sale_price: Money::new(model.sale_price),
            purchase_price: Money::new(model.purchase_price),
            opening_stock: Quantity::new(model.opening_stock),
            stock_quantity: Quantity::new(model.stock_quantity),
            low_stock_alert: Quantity::new(model.low_stock_alert),
            is_active: model.is_active,
            expiry_date: model.expiry_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn item(expiry_date: Option<NaiveDate>) -> Item {
        let now = Utc.timestamp_opt(0, 0).unwrap();
        Item {
            id: Uuid::new_v4(),
            name: "Milk".to_string(),
            sku: None,
            kind: ItemKind::Product,
            sale_price: Money::new(150),
            purchase_price: Money::new(100),
            opening_stock: Quantity::units(10),
            stock_quantity: Quantity::units(3),
            low_stock_alert: Quantity::units(3),
            is_active: true,
            expiry_date,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn expired_strictly_after_expiry_date() {
        let expiry = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let item = item(Some(expiry));
        assert!(!item.is_expired_on(expiry));
        assert!(item.is_expired_on(expiry.succ_opt().unwrap()));
        assert!(!item.is_expired_on(expiry.pred_opt().unwrap()));
    }

    #[test]
    fn no_expiry_never_expires() {
        let date = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap();
        assert!(!item(None).is_expired_on(date));
    }

    #[test]
    fn low_stock_includes_alert_level() {
        let mut item = item(None);
        assert!(item.is_low_on_stock());
        item.stock_quantity = Quantity::units(4);
        assert!(!item.is_low_on_stock());
        item.kind = ItemKind::Service;
        item.stock_quantity = Quantity::ZERO;
        assert!(!item.is_low_on_stock());
    }
}
