use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// One installment paid against a loan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub date: NaiveDate,
    /// `principal + interest`.
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loan_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub loan_id: String,
    pub date: Date,
    pub amount: i64,
    pub principal: i64,
    pub interest: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loans::Entity",
        from = "Column::LoanId",
        to = "super::loans::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Loans,
}

impl Related<super::loans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LoanPayment> for ActiveModel {
    fn from(payment: &LoanPayment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            loan_id: ActiveValue::Set(payment.loan_id.to_string()),
            date: ActiveValue::Set(payment.date),
            amount: ActiveValue::Set(payment.amount.minor()),
            principal: ActiveValue::Set(payment.principal.minor()),
            interest: ActiveValue::Set(payment.interest.minor()),
            created_at: ActiveValue::Set(payment.created_at),
        }
    }
}

impl TryFrom<Model> for LoanPayment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "loan payment")?,
            loan_id: parse_uuid(&model.loan_id, "loan")?,
            date: model.date,
            amount: Money::new(model.amount),
            principal: Money::new(model.principal),
            interest: Money::new(model.interest),
            created_at: model.created_at,
        })
    }
}
