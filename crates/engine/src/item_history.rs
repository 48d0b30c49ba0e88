//! Per-item stock log.
//!
//! One row per stock adjustment, whatever caused it. Together with the
//! item's `opening_stock` the rows explain its current `stock_quantity`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Quantity,
    util::{parse_optional_uuid, parse_uuid},
};

pub(crate) const STOCK_ADJUSTED: &str = "stock_adjusted";

/// What moved the stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockSource {
    SaleInvoice,
    PurchaseInvoice,
    CreditNote,
    Manual,
}

impl StockSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SaleInvoice => "sale_invoice",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::CreditNote => "credit_note",
            Self::Manual => "manual",
        }
    }
}

impl TryFrom<&str> for StockSource {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale_invoice" => Ok(Self::SaleInvoice),
            "purchase_invoice" => Ok(Self::PurchaseInvoice),
            "credit_note" => Ok(Self::CreditNote),
            "manual" => Ok(Self::Manual),
            other => Err(EngineError::Validation(format!(
                "invalid stock source: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemHistoryEntry {
    pub id: Uuid,
    pub item_id: Uuid,
    pub action: String,
    pub delta: Quantity,
    pub old_quantity: Quantity,
    pub new_quantity: Quantity,
    pub source: StockSource,
    /// Document that caused the movement; `None` for manual adjustments.
    pub reference_id: Option<Uuid>,
    pub description: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "item_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item_id: String,
    pub action: String,
    pub delta: i64,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub source: String,
    pub reference_id: Option<String>,
    pub description: String,
    pub user_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Items,
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ItemHistoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "item history")?,
            item_id: parse_uuid(&model.item_id, "item")?,
            action: model.action,
            delta: Quantity::new(model.delta),
            old_quantity: Quantity::new(model.old_quantity),
            new_quantity: Quantity::new(model.new_quantity),
            source: StockSource::try_from(model.source.as_str())?,
            reference_id: parse_optional_uuid(model.reference_id.as_deref(), "document")?,
            description: model.description,
            user_id: model.user_id,
            created_at: model.created_at,
        })
    }
}
