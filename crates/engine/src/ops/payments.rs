use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Actor, EngineError, HistoryAction, Invoice, InvoiceKind, Payment, PaymentCmd, PaymentKind,
    ResultEngine, Snapshot,
    history::NewEntry,
    invoices, payments,
    util::normalize_optional_text,
};

use super::{Engine, with_tx};

fn validate_payment(cmd: &PaymentCmd) -> ResultEngine<()> {
    if !cmd.amount.is_positive() {
        return Err(EngineError::Validation(
            "payment amount must be > 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Money received from a party, optionally against a sale invoice.
    pub async fn create_payment_in(&self, cmd: PaymentCmd, actor: &Actor) -> ResultEngine<Payment> {
        self.create_payment(PaymentKind::In, cmd, actor).await
    }

    /// Money paid to a party, optionally against a purchase invoice.
    pub async fn create_payment_out(&self, cmd: PaymentCmd, actor: &Actor) -> ResultEngine<Payment> {
        self.create_payment(PaymentKind::Out, cmd, actor).await
    }

    async fn create_payment(
        &self,
        kind: PaymentKind,
        cmd: PaymentCmd,
        actor: &Actor,
    ) -> ResultEngine<Payment> {
        validate_payment(&cmd)?;
        let document_type = kind.document_type();
        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, cmd.party_id).await?;
            if let Some(invoice_id) = cmd.invoice_id {
                self.require_payable_invoice(&db_tx, kind, invoice_id, cmd.party_id)
                    .await?;
            }

            let now = Utc::now();
            let payment = Payment {
                id: Uuid::new_v4(),
                kind,
                number: self.allocate_number_in(&db_tx, document_type).await?,
                party_id: cmd.party_id,
                invoice_id: cmd.invoice_id,
                amount: cmd.amount,
                date: cmd.date,
                method: normalize_optional_text(cmd.method.as_deref()),
                note: normalize_optional_text(cmd.note.as_deref()),
                created_at: now,
                updated_at: now,
            };
            payments::ActiveModel::from(&payment).insert(&db_tx).await?;

            self.apply_payment_effects(&db_tx, &payment, 1).await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: payment.id,
                    document_type,
                    action: HistoryAction::Created,
                    description: format!(
                        "{} {} of {} recorded",
                        document_type.label(),
                        payment.number,
                        payment.amount
                    ),
                    old_values: None,
                    new_values: Some(Snapshot::from(&payment)),
                    actor,
                },
            )
            .await?;

            info!(
                payment_id = %payment.id,
                kind = kind.as_str(),
                number = %payment.number,
                amount = %payment.amount,
                "payment created"
            );
            Ok(payment)
        })
    }

    /// Rewrite a payment: its old effects are reversed, then the new ones
    /// applied, including a move to another invoice or party.
    pub async fn update_payment(
        &self,
        payment_id: Uuid,
        cmd: PaymentCmd,
        actor: &Actor,
    ) -> ResultEngine<Payment> {
        validate_payment(&cmd)?;
        with_tx!(self, |db_tx| {
            let old = self.fetch_payment(&db_tx, payment_id).await?;
            let document_type = old.kind.document_type();

            self.apply_payment_effects(&db_tx, &old, -1).await?;

            self.require_party(&db_tx, cmd.party_id).await?;
            if let Some(invoice_id) = cmd.invoice_id {
                self.require_payable_invoice(&db_tx, old.kind, invoice_id, cmd.party_id)
                    .await?;
            }

            let new = Payment {
                party_id: cmd.party_id,
                invoice_id: cmd.invoice_id,
                amount: cmd.amount,
                date: cmd.date,
                method: normalize_optional_text(cmd.method.as_deref()),
                note: normalize_optional_text(cmd.note.as_deref()),
                updated_at: Utc::now(),
                ..old.clone()
            };
            let mut model = payments::ActiveModel::from(&new);
            model.created_at = ActiveValue::Unchanged(old.created_at);
            model.update(&db_tx).await?;

            self.apply_payment_effects(&db_tx, &new, 1).await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: payment_id,
                    document_type,
                    action: HistoryAction::Updated,
                    description: format!(
                        "{} {} updated: amount {} -> {}",
                        document_type.label(),
                        new.number,
                        old.amount,
                        new.amount
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: Some(Snapshot::from(&new)),
                    actor,
                },
            )
            .await?;

            info!(payment_id = %payment_id, amount = %new.amount, "payment updated");
            Ok(new)
        })
    }

    /// Delete a payment and undo its balance and invoice effects.
    pub async fn delete_payment(&self, payment_id: Uuid, actor: &Actor) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_payment(&db_tx, payment_id).await?;
            let document_type = old.kind.document_type();

            self.apply_payment_effects(&db_tx, &old, -1).await?;
            payments::Entity::delete_by_id(payment_id.to_string())
                .exec(&db_tx)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: payment_id,
                    document_type,
                    action: HistoryAction::Deleted,
                    description: format!(
                        "{} {} of {} deleted",
                        document_type.label(),
                        old.number,
                        old.amount
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: None,
                    actor,
                },
            )
            .await?;

            info!(payment_id = %payment_id, number = %old.number, "payment deleted");
            Ok(())
        })
    }

    pub async fn payment(&self, payment_id: Uuid) -> ResultEngine<Payment> {
        with_tx!(self, |db_tx| self.fetch_payment(&db_tx, payment_id).await)
    }

    async fn fetch_payment(
        &self,
        db_tx: &DatabaseTransaction,
        payment_id: Uuid,
    ) -> ResultEngine<Payment> {
        let model = payments::Entity::find_by_id(payment_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payment {payment_id}")))?;
        Payment::try_from(model)
    }

    /// Apply (`sign = 1`) or reverse (`sign = -1`) the effects of a payment.
    async fn apply_payment_effects(
        &self,
        db_tx: &DatabaseTransaction,
        payment: &Payment,
        sign: i64,
    ) -> ResultEngine<()> {
        let amount = if sign < 0 { -payment.amount } else { payment.amount };
        self.adjust_party_balance(db_tx, payment.party_id, payment.kind.balance_delta(amount))
            .await?;
        if let Some(invoice_id) = payment.invoice_id {
            self.apply_invoice_payment(db_tx, invoice_id, amount).await?;
        }
        Ok(())
    }

    /// A payment may only settle an existing invoice of the matching kind
    /// that belongs to the same party.
    async fn require_payable_invoice(
        &self,
        db_tx: &DatabaseTransaction,
        kind: PaymentKind,
        invoice_id: Uuid,
        party_id: Uuid,
    ) -> ResultEngine<Invoice> {
        let model = invoices::Entity::find_by_id(invoice_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("invoice {invoice_id}")))?;
        let invoice = Invoice::try_from(model)?;
        let expected: InvoiceKind = kind.invoice_kind();
        if invoice.kind != expected {
            return Err(EngineError::Validation(format!(
                "{} cannot settle {} {}",
                kind.document_type().label(),
                invoice.kind.document_type().label().to_lowercase(),
                invoice.number
            )));
        }
        if invoice.party_id != party_id {
            return Err(EngineError::Validation(format!(
                "invoice {} belongs to another party",
                invoice.number
            )));
        }
        Ok(invoice)
    }
}
