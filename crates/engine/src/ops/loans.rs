use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, Statement,
    TransactionTrait, prelude::*,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Actor, DocumentType, EngineError, HistoryAction, Loan, LoanCmd, LoanPayment, LoanPaymentCmd,
    LoanStatus, Money, Percent, ResultEngine, Snapshot,
    history::NewEntry,
    loan_payments, loans,
    util::normalize_required_text,
};

use super::{Engine, with_tx};

fn validate_installment(cmd: &LoanPaymentCmd) -> ResultEngine<Money> {
    if cmd.principal.is_negative() || cmd.interest.is_negative() {
        return Err(EngineError::Validation(
            "principal and interest must be >= 0".to_string(),
        ));
    }
    let amount = cmd.principal + cmd.interest;
    if !amount.is_positive() {
        return Err(EngineError::Validation(
            "loan payment amount must be > 0".to_string(),
        ));
    }
    Ok(amount)
}

impl Engine {
    pub async fn create_loan(&self, cmd: LoanCmd, actor: &Actor) -> ResultEngine<Loan> {
        let lender = normalize_required_text(&cmd.lender, "lender")?;
        if !cmd.principal.is_positive() {
            return Err(EngineError::Validation(
                "loan principal must be > 0".to_string(),
            ));
        }
        if cmd.emi_count <= 0 {
            return Err(EngineError::Validation(
                "emi count must be > 0".to_string(),
            ));
        }
        if cmd.interest_rate < Percent::ZERO {
            return Err(EngineError::Validation(
                "interest rate must be >= 0%".to_string(),
            ));
        }

        let now = Utc::now();
        let loan = Loan {
            id: Uuid::new_v4(),
            lender,
            principal: cmd.principal,
            interest_rate: cmd.interest_rate,
            emi_count: cmd.emi_count,
            paid_emis: 0,
            outstanding_amount: cmd.principal,
            status: LoanStatus::Active,
            start_date: cmd.start_date,
            created_at: now,
            updated_at: now,
        };

        with_tx!(self, |db_tx| {
            loans::ActiveModel::from(&loan).insert(&db_tx).await?;
            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: loan.id,
                    document_type: DocumentType::Loan,
                    action: HistoryAction::Created,
                    description: format!("Loan from {} of {} created", loan.lender, loan.principal),
                    old_values: None,
                    new_values: Some(Snapshot::from(&loan)),
                    actor,
                },
            )
            .await?;
            info!(loan_id = %loan.id, principal = %loan.principal, "loan created");
            Ok(loan)
        })
    }

    /// Flag a loan as defaulted. Closed loans cannot default.
    pub async fn mark_loan_defaulted(&self, loan_id: Uuid, actor: &Actor) -> ResultEngine<Loan> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_loan(&db_tx, loan_id).await?;
            if old.status == LoanStatus::Closed {
                return Err(EngineError::Validation(format!(
                    "loan {loan_id} is already closed"
                )));
            }
            self.set_loan_status(&db_tx, loan_id, LoanStatus::Defaulted)
                .await?;
            let new = self.fetch_loan(&db_tx, loan_id).await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: loan_id,
                    document_type: DocumentType::Loan,
                    action: HistoryAction::Updated,
                    description: format!("Loan from {} marked as defaulted", new.lender),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: Some(Snapshot::from(&new)),
                    actor,
                },
            )
            .await?;
            info!(loan_id = %loan_id, "loan defaulted");
            Ok(new)
        })
    }

    /// Delete a loan that has no recorded payments.
    pub async fn delete_loan(&self, loan_id: Uuid, actor: &Actor) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_loan(&db_tx, loan_id).await?;
            let paid = loan_payments::Entity::find()
                .filter(loan_payments::Column::LoanId.eq(loan_id.to_string()))
                .count(&db_tx)
                .await?;
            if paid > 0 {
                return Err(EngineError::Validation(format!(
                    "loan {loan_id} has {paid} recorded payment(s)"
                )));
            }
            loans::Entity::delete_by_id(loan_id.to_string())
                .exec(&db_tx)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: loan_id,
                    document_type: DocumentType::Loan,
                    action: HistoryAction::Deleted,
                    description: format!("Loan from {} deleted", old.lender),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: None,
                    actor,
                },
            )
            .await?;
            info!(loan_id = %loan_id, "loan deleted");
            Ok(())
        })
    }

    /// Record one installment.
    ///
    /// Only the principal reduces the outstanding amount. The loan closes
    /// when the outstanding amount, as read back after the decrement, is
    /// zero or less.
    pub async fn record_loan_payment(
        &self,
        loan_id: Uuid,
        cmd: LoanPaymentCmd,
        actor: &Actor,
    ) -> ResultEngine<LoanPayment> {
        let amount = validate_installment(&cmd)?;
        with_tx!(self, |db_tx| {
            let loan = self.fetch_loan(&db_tx, loan_id).await?;
            if loan.status == LoanStatus::Closed {
                return Err(EngineError::Validation(format!(
                    "loan {loan_id} is closed"
                )));
            }

            let payment = LoanPayment {
                id: Uuid::new_v4(),
                loan_id,
                date: cmd.date,
                amount,
                principal: cmd.principal,
                interest: cmd.interest,
                created_at: Utc::now(),
            };
            loan_payments::ActiveModel::from(&payment)
                .insert(&db_tx)
                .await?;
            let status = self
                .move_loan_outstanding(&db_tx, loan_id, -payment.principal, 1)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: payment.id,
                    document_type: DocumentType::LoanPayment,
                    action: HistoryAction::Created,
                    description: format!(
                        "Loan payment of {} (principal {}, interest {}) recorded",
                        payment.amount, payment.principal, payment.interest
                    ),
                    old_values: None,
                    new_values: Some(Snapshot::from(&payment)),
                    actor,
                },
            )
            .await?;
            info!(
                loan_id = %loan_id,
                payment_id = %payment.id,
                principal = %payment.principal,
                status = status.as_str(),
                "loan payment recorded"
            );
            Ok(payment)
        })
    }

    /// Rewrite an installment: the old principal is given back and the new
    /// one taken, and the loan status follows the resulting outstanding.
    pub async fn update_loan_payment(
        &self,
        payment_id: Uuid,
        cmd: LoanPaymentCmd,
        actor: &Actor,
    ) -> ResultEngine<LoanPayment> {
        let amount = validate_installment(&cmd)?;
        with_tx!(self, |db_tx| {
            let old = self.fetch_loan_payment(&db_tx, payment_id).await?;
            let new = LoanPayment {
                date: cmd.date,
                amount,
                principal: cmd.principal,
                interest: cmd.interest,
                ..old.clone()
            };
            loan_payments::ActiveModel {
                id: ActiveValue::Unchanged(payment_id.to_string()),
                date: ActiveValue::Set(new.date),
                amount: ActiveValue::Set(new.amount.minor()),
                principal: ActiveValue::Set(new.principal.minor()),
                interest: ActiveValue::Set(new.interest.minor()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            self.move_loan_outstanding(&db_tx, old.loan_id, old.principal - new.principal, 0)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: payment_id,
                    document_type: DocumentType::LoanPayment,
                    action: HistoryAction::Updated,
                    description: format!(
                        "Loan payment updated: principal {} -> {}",
                        old.principal, new.principal
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: Some(Snapshot::from(&new)),
                    actor,
                },
            )
            .await?;
            info!(payment_id = %payment_id, principal = %new.principal, "loan payment updated");
            Ok(new)
        })
    }

    /// Remove an installment and give its principal back to the loan.
    ///
    /// A loan closed by its payments becomes active again when something is
    /// outstanding after the reversal.
    pub async fn delete_loan_payment(&self, payment_id: Uuid, actor: &Actor) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_loan_payment(&db_tx, payment_id).await?;
            loan_payments::Entity::delete_by_id(payment_id.to_string())
                .exec(&db_tx)
                .await?;
            let status = self
                .move_loan_outstanding(&db_tx, old.loan_id, old.principal, -1)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: payment_id,
                    document_type: DocumentType::LoanPayment,
                    action: HistoryAction::Deleted,
                    description: format!(
                        "Loan payment of {} (principal {}) deleted",
                        old.amount, old.principal
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: None,
                    actor,
                },
            )
            .await?;
            info!(
                payment_id = %payment_id,
                loan_id = %old.loan_id,
                status = status.as_str(),
                "loan payment deleted"
            );
            Ok(())
        })
    }

    pub async fn loan(&self, loan_id: Uuid) -> ResultEngine<Loan> {
        with_tx!(self, |db_tx| self.fetch_loan(&db_tx, loan_id).await)
    }

    /// Installments of a loan, oldest first.
    pub async fn loan_payments(&self, loan_id: Uuid) -> ResultEngine<Vec<LoanPayment>> {
        loan_payments::Entity::find()
            .filter(loan_payments::Column::LoanId.eq(loan_id.to_string()))
            .order_by_asc(loan_payments::Column::Date)
            .order_by_asc(loan_payments::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LoanPayment::try_from)
            .collect()
    }

    async fn fetch_loan(&self, db_tx: &DatabaseTransaction, loan_id: Uuid) -> ResultEngine<Loan> {
        let model = loans::Entity::find_by_id(loan_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;
        Loan::try_from(model)
    }

    async fn fetch_loan_payment(
        &self,
        db_tx: &DatabaseTransaction,
        payment_id: Uuid,
    ) -> ResultEngine<LoanPayment> {
        let model = loan_payments::Entity::find_by_id(payment_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan payment {payment_id}")))?;
        LoanPayment::try_from(model)
    }

    /// Apply `outstanding_amount += delta` and `paid_emis += emi_delta`
    /// (never below zero), then settle the status on the value read back.
    async fn move_loan_outstanding(
        &self,
        db_tx: &DatabaseTransaction,
        loan_id: Uuid,
        delta: Money,
        emi_delta: i32,
    ) -> ResultEngine<LoanStatus> {
        let row = db_tx
            .query_one(Statement::from_sql_and_values(
                self.backend(),
                "UPDATE loans SET outstanding_amount = outstanding_amount + ?, \
                 paid_emis = MAX(paid_emis + ?, 0), updated_at = ? \
                 WHERE id = ? RETURNING outstanding_amount, status;",
                vec![
                    delta.minor().into(),
                    emi_delta.into(),
                    Utc::now().into(),
                    loan_id.to_string().into(),
                ],
            ))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("loan {loan_id}")))?;
        let outstanding = Money::new(row.try_get::<i64>("", "outstanding_amount")?);
        let current = LoanStatus::try_from(row.try_get::<String>("", "status")?.as_str())?;

        let settled = current.settle(outstanding);
        if settled != current {
            self.set_loan_status(db_tx, loan_id, settled).await?;
        }
        debug!(%loan_id, %outstanding, status = settled.as_str(), "loan outstanding moved");
        Ok(settled)
    }

    async fn set_loan_status(
        &self,
        db_tx: &DatabaseTransaction,
        loan_id: Uuid,
        status: LoanStatus,
    ) -> ResultEngine<()> {
        loans::ActiveModel {
            id: ActiveValue::Unchanged(loan_id.to_string()),
            status: ActiveValue::Set(status.as_str().to_string()),
            updated_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .update(db_tx)
        .await?;
        Ok(())
    }
}
