//! Payments received from (in) or made to (out) a party.
//!
//! A payment moves the party balance toward zero and, when linked to an
//! invoice of the matching kind, moves that invoice's paid amount.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DocumentType, EngineError, InvoiceKind, Money,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    In,
    Out,
}

impl PaymentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn document_type(self) -> DocumentType {
        match self {
            Self::In => DocumentType::PaymentIn,
            Self::Out => DocumentType::PaymentOut,
        }
    }

    /// The only invoice kind a payment of this kind may settle.
    pub fn invoice_kind(self) -> InvoiceKind {
        match self {
            Self::In => InvoiceKind::Sale,
            Self::Out => InvoiceKind::Purchase,
        }
    }

    /// Signed balance delta of a payment with the given amount.
    pub(crate) fn balance_delta(self, amount: Money) -> Money {
        match self {
            Self::In => -amount,
            Self::Out => amount,
        }
    }
}

impl TryFrom<&str> for PaymentKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(EngineError::Validation(format!(
                "invalid payment kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub kind: PaymentKind,
    pub number: String,
    pub party_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: Money,
    pub date: NaiveDate,
    pub method: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub number: String,
    pub party_id: String,
    pub invoice_id: Option<String>,
    pub amount: i64,
    pub date: Date,
    pub method: Option<String>,
    pub note: Option<String>,
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
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Invoices,
}

impl Related<super::parties::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parties.def()
    }
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            kind: ActiveValue::Set(payment.kind.as_str().to_string()),
            number: ActiveValue::Set(payment.number.clone()),
            party_id: ActiveValue::Set(payment.party_id.to_string()),
            invoice_id: ActiveValue::Set(payment.invoice_id.map(|id| id.to_string())),
            amount: ActiveValue::Set(payment.amount.minor()),
            date: ActiveValue::Set(payment.date),
            method: ActiveValue::Set(payment.method.clone()),
            note: ActiveValue::Set(payment.note.clone()),
            created_at: ActiveValue::Set(payment.created_at),
            updated_at: ActiveValue::Set(payment.updated_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payment")?,
            kind: PaymentKind::try_from(model.kind.as_str())?,
            number: model.number,
            party_id: parse_uuid(&model.party_id, "party")?,
            invoice_id: parse_optional_uuid(model.invoice_id.as_deref(), "invoice")?,
            amount: Money::new(model.amount),
            date: model.date,
            method: model.method,
            note: model.note,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
