//! Credit notes (sales returns).
//!
//! A credit note mirrors a negative sale: product lines come back into
//! stock and the party receivable shrinks by the note total.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DocumentTotals, EngineError, Line, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNote {
    pub id: Uuid,
    pub number: String,
    pub party_id: Uuid,
    /// Sale invoice the goods were originally sold on, if known.
    pub invoice_id: Option<Uuid>,
    pub date: NaiveDate,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<Line>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "credit_notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub number: String,
    pub party_id: String,
    pub invoice_id: Option<String>,
    pub date: Date,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub discount_amount: i64,
    pub total: i64,
    pub reason: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn set_totals(&mut self, totals: &DocumentTotals) {
        self.subtotal = ActiveValue::Set(totals.subtotal.minor());
        self.tax_amount = ActiveValue::Set(totals.tax_amount.minor());
        self.discount_amount = ActiveValue::Set(totals.discount_amount.minor());
        self.total = ActiveValue::Set(totals.total.minor());
    }
}

impl TryFrom<Model> for CreditNote {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "credit note")?,
            number: model.number,
            party_id: parse_uuid(&model.party_id, "party")?,
            invoice_id: parse_optional_uuid(model.invoice_id.as_deref(), "invoice")?,
            date: model.date,
            subtotal: Money::new(model.subtotal),
            tax_amount: Money::new(model.tax_amount),
            discount_amount: Money::new(model.discount_amount),
            total: Money::new(model.total),
            reason: model.reason,
            created_at: model.created_at,
            updated_at: model.updated_at,
            lines: Vec::new(),
        })
    }
}
