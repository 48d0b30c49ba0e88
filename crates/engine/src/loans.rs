//! Loans and their installments (EMIs).
//!
//! Only the principal part of an installment reduces `outstanding_amount`;
//! interest is recorded on the payment row and nowhere else. A loan closes
//! once its outstanding amount reaches zero and reopens if a payment that
//! closed it is removed.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Percent, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Closed,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Defaulted => "defaulted",
        }
    }

    /// Status after the outstanding amount moved to `outstanding`.
    ///
    /// A defaulted loan stays defaulted until fully repaid.
    #[must_use]
    pub fn settle(self, outstanding: Money) -> Self {
        if outstanding.minor() <= 0 {
            Self::Closed
        } else if self == Self::Closed {
            Self::Active
        } else {
            self
        }
    }
}

impl TryFrom<&str> for LoanStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            "defaulted" => Ok(Self::Defaulted),
            other => Err(EngineError::Validation(format!(
                "invalid loan status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Uuid,
    pub lender: String,
    pub principal: Money,
    pub interest_rate: Percent,
    pub emi_count: i32,
    pub paid_emis: i32,
    pub outstanding_amount: Money,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub lender: String,
    pub principal: i64,
    pub interest_bps: i64,
    pub emi_count: i32,
    pub paid_emis: i32,
    pub outstanding_amount: i64,
    pub status: String,
    pub start_date: Date,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan_payments::Entity")]
    Payments,
}

impl Related<super::loan_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Loan> for ActiveModel {
    fn from(loan: &Loan) -> Self {
        Self {
            id: ActiveValue::Set(loan.id.to_string()),
            lender: ActiveValue::Set(loan.lender.clone()),
            principal: ActiveValue::Set(loan.principal.minor()),
            interest_bps: ActiveValue::Set(loan.interest_rate.basis_points()),
            emi_count: ActiveValue::Set(loan.emi_count),
            paid_emis: ActiveValue::Set(loan.paid_emis),
            outstanding_amount: ActiveValue::Set(loan.outstanding_amount.minor()),
            status: ActiveValue::Set(loan.status.as_str().to_string()),
            start_date: ActiveValue::Set(loan.start_date),
            created_at: ActiveValue::Set(loan.created_at),
            updated_at: ActiveValue::Set(loan.updated_at),
        }
    }
}

impl TryFrom<Model> for Loan {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "loan")?,
            lender: model.lender,
            principal: Money::new(model.principal),
            interest_rate: Percent::from_basis_points(model.interest_bps),
            emi_count: model.emi_count,
            paid_emis: model.paid_emis,
            outstanding_amount: Money::new(model.outstanding_amount),
            status: LoanStatus::try_from(model.status.as_str())?,
            start_date: model.start_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_closes_at_zero_or_below() {
        assert_eq!(LoanStatus::Active.settle(Money::ZERO), LoanStatus::Closed);
        assert_eq!(LoanStatus::Active.settle(Money::new(-1)), LoanStatus::Closed);
        assert_eq!(LoanStatus::Defaulted.settle(Money::ZERO), LoanStatus::Closed);
    }

    #[test]
    fn settle_reopens_closed_loans() {
        assert_eq!(LoanStatus::Closed.settle(Money::new(100)), LoanStatus::Active);
        assert_eq!(LoanStatus::Active.settle(Money::new(100)), LoanStatus::Active);
        assert_eq!(
            LoanStatus::Defaulted.settle(Money::new(100)),
            LoanStatus::Defaulted
        );
    }
}
