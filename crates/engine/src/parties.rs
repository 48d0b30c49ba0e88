//! The module contains the `Party` struct: a customer, a supplier or both.
//!
//! A party carries one signed running balance:
//! - positive: the party owes us (receivable)
//! - negative: we owe the party (payable)

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
    Customer,
    Supplier,
    Both,
}

impl PartyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Supplier => "supplier",
            Self::Both => "both",
        }
    }
}

impl TryFrom<&str> for PartyType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "customer" => Ok(Self::Customer),
            "supplier" => Ok(Self::Supplier),
            "both" => Ok(Self::Both),
            other => Err(EngineError::Validation(format!(
                "invalid party type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
    pub party_type: PartyType,
    pub opening_balance: Money,
    /// `opening_balance` plus every signed delta applied by documents.
    pub current_balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "parties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub party_type: String,
    pub opening_balance: i64,
    pub current_balance: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::invoices::Entity")]
    Invoices,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Party> for ActiveModel {
    fn from(party: &Party) -> Self {
        Self {
            id: ActiveValue::Set(party.id.to_string()),
            name: ActiveValue::Set(party.name.clone()),
            party_type: ActiveValue::Set(party.party_type.as_str().to_string()),
            opening_balance: ActiveValue::Set(party.opening_balance.minor()),
            current_balance: ActiveValue::Set(party.current_balance.minor()),
            created_at: ActiveValue::Set(party.created_at),
            updated_at: ActiveValue::Set(party.updated_at),
        }
    }
}

impl TryFrom<Model> for Party {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "party")?,
            name: model.name,
            party_type: PartyType::try_from(model.party_type.as_str())?,
            opening_balance: Money::new(model.opening_balance),
            current_balance: Money::new(model.current_balance),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
