//! Estimates (quotations).
//!
//! An estimate has no stock or balance effect of its own. Converting it
//! creates a regular sale invoice and freezes the estimate.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DocumentTotals, EngineError, Line, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Open,
    Converted,
}

impl EstimateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Converted => "converted",
        }
    }
}

impl TryFrom<&str> for EstimateStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "converted" => Ok(Self::Converted),
            other => Err(EngineError::Validation(format!(
                "invalid estimate status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: Uuid,
    pub number: String,
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: EstimateStatus,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub converted_to_invoice_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<Line>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "estimates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub number: String,
    pub party_id: String,
    pub date: Date,
    pub valid_until: Option<Date>,
    pub status: String,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub discount_amount: i64,
    pub total: i64,
    pub converted_to_invoice_id: Option<String>,
    pub notes: Option<String>,
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

impl TryFrom<Model> for Estimate {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "estimate")?,
            number: model.number,
            party_id: parse_uuid(&model.party_id, "party")?,
            date: model.date,
            valid_until: model.valid_until,
            status: EstimateStatus::try_from(model.status.as_str())?,
            subtotal: Money::new(model.subtotal),
            tax_amount: Money::new(model.tax_amount),
            discount_amount: Money::new(model.discount_amount),
            total: Money::new(model.total),
            converted_to_invoice_id: parse_optional_uuid(
                model.converted_to_invoice_id.as_deref(),
                "invoice",
            )?,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
            lines: Vec::new(),
        })
    }
}
