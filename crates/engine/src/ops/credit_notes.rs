use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Actor, CreditNote, CreditNoteCmd, DocumentType, EngineError, HistoryAction, Invoice,
    InvoiceKind, LineInput, ResultEngine, Snapshot, StockSource, compute_totals, credit_notes,
    history::NewEntry,
    invoices,
    util::normalize_optional_text,
};

use super::{Engine, line_item_ids, with_tx};

const DOCUMENT_TYPE: DocumentType = DocumentType::CreditNote;

impl Engine {
    /// Record goods returned by a customer.
    ///
    /// Product lines come back into stock and the customer's receivable
    /// shrinks by the note total.
    pub async fn create_credit_note(
        &self,
        cmd: CreditNoteCmd,
        actor: &Actor,
    ) -> ResultEngine<CreditNote> {
        let (amounts, totals) = compute_totals(&cmd.lines)?;
        let reason = normalize_optional_text(cmd.reason.as_deref());

        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, cmd.party_id).await?;
            if let Some(invoice_id) = cmd.invoice_id {
                self.require_returned_invoice(&db_tx, invoice_id, cmd.party_id)
                    .await?;
            }
            let items = self.load_items(&db_tx, line_item_ids(&cmd.lines)).await?;

            let note_id = Uuid::new_v4();
            let number = self.allocate_number_in(&db_tx, DOCUMENT_TYPE).await?;
            let now = Utc::now();
            let mut header = credit_notes::ActiveModel {
                id: ActiveValue::Set(note_id.to_string()),
                number: ActiveValue::Set(number.clone()),
                party_id: ActiveValue::Set(cmd.party_id.to_string()),
                invoice_id: ActiveValue::Set(cmd.invoice_id.map(|id| id.to_string())),
                date: ActiveValue::Set(cmd.date),
                reason: ActiveValue::Set(reason),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            header.set_totals(&totals);
            header.insert(&db_tx).await?;
            self.insert_lines(&db_tx, DOCUMENT_TYPE, note_id, &cmd.lines, &amounts)
                .await?;

            self.move_line_stock(
                &db_tx,
                &cmd.lines,
                &items,
                1,
                StockSource::CreditNote,
                note_id,
                &format!("{} {number}", DOCUMENT_TYPE.label()),
                actor,
            )
            .await?;
            self.adjust_party_balance(&db_tx, cmd.party_id, -totals.total)
                .await?;

            let note = self.fetch_credit_note(&db_tx, note_id).await?;
            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: note_id,
                    document_type: DOCUMENT_TYPE,
                    action: HistoryAction::Created,
                    description: format!("Credit note {number} created (total {})", note.total),
                    old_values: None,
                    new_values: Some(Snapshot::from(&note)),
                    actor,
                },
            )
            .await?;

            info!(credit_note_id = %note_id, number = %number, total = %note.total, "credit note created");
            Ok(note)
        })
    }

    /// Replace the content of a credit note, reversing the stored one first.
    pub async fn update_credit_note(
        &self,
        note_id: Uuid,
        cmd: CreditNoteCmd,
        actor: &Actor,
    ) -> ResultEngine<CreditNote> {
        let (amounts, totals) = compute_totals(&cmd.lines)?;
        let reason = normalize_optional_text(cmd.reason.as_deref());

        with_tx!(self, |db_tx| {
            let old = self.fetch_credit_note(&db_tx, note_id).await?;
            self.reverse_credit_note(&db_tx, &old, "edited (reversal)", actor)
                .await?;

            self.require_party(&db_tx, cmd.party_id).await?;
            if let Some(invoice_id) = cmd.invoice_id {
                self.require_returned_invoice(&db_tx, invoice_id, cmd.party_id)
                    .await?;
            }
            let items = self.load_items(&db_tx, line_item_ids(&cmd.lines)).await?;

            self.delete_lines(&db_tx, DOCUMENT_TYPE, note_id).await?;
            let mut header = credit_notes::ActiveModel {
                id: ActiveValue::Unchanged(note_id.to_string()),
                party_id: ActiveValue::Set(cmd.party_id.to_string()),
                invoice_id: ActiveValue::Set(cmd.invoice_id.map(|id| id.to_string())),
                date: ActiveValue::Set(cmd.date),
                reason: ActiveValue::Set(reason),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            header.set_totals(&totals);
            header.update(&db_tx).await?;
            self.insert_lines(&db_tx, DOCUMENT_TYPE, note_id, &cmd.lines, &amounts)
                .await?;

            self.move_line_stock(
                &db_tx,
                &cmd.lines,
                &items,
                1,
                StockSource::CreditNote,
                note_id,
                &format!("{} {} edited", DOCUMENT_TYPE.label(), old.number),
                actor,
            )
            .await?;
            self.adjust_party_balance(&db_tx, cmd.party_id, -totals.total)
                .await?;

            let new = self.fetch_credit_note(&db_tx, note_id).await?;
            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: note_id,
                    document_type: DOCUMENT_TYPE,
                    action: HistoryAction::Updated,
                    description: format!(
                        "Credit note {} updated: total {} -> {}",
                        new.number, old.total, new.total
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: Some(Snapshot::from(&new)),
                    actor,
                },
            )
            .await?;

            info!(credit_note_id = %note_id, total = %new.total, "credit note updated");
            Ok(new)
        })
    }

    pub async fn delete_credit_note(&self, note_id: Uuid, actor: &Actor) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_credit_note(&db_tx, note_id).await?;
            self.reverse_credit_note(&db_tx, &old, "deleted", actor)
                .await?;
            self.delete_lines(&db_tx, DOCUMENT_TYPE, note_id).await?;
            credit_notes::Entity::delete_by_id(note_id.to_string())
                .exec(&db_tx)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: note_id,
                    document_type: DOCUMENT_TYPE,
                    action: HistoryAction::Deleted,
                    description: format!("Credit note {} deleted (total {})", old.number, old.total),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: None,
                    actor,
                },
            )
            .await?;

            info!(credit_note_id = %note_id, number = %old.number, "credit note deleted");
            Ok(())
        })
    }

    pub async fn credit_note(&self, note_id: Uuid) -> ResultEngine<CreditNote> {
        with_tx!(self, |db_tx| self.fetch_credit_note(&db_tx, note_id).await)
    }

    async fn fetch_credit_note(
        &self,
        db_tx: &DatabaseTransaction,
        note_id: Uuid,
    ) -> ResultEngine<CreditNote> {
        let model = credit_notes::Entity::find_by_id(note_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("credit note {note_id}")))?;
        let mut note = CreditNote::try_from(model)?;
        note.lines = self.load_lines(db_tx, DOCUMENT_TYPE, note_id).await?;
        Ok(note)
    }

    /// Take the returned goods back out of stock and restore the receivable.
    async fn reverse_credit_note(
        &self,
        db_tx: &DatabaseTransaction,
        note: &CreditNote,
        what: &str,
        actor: &Actor,
    ) -> ResultEngine<()> {
        let old_lines: Vec<LineInput> = note.lines.iter().map(|line| line.to_input()).collect();
        let old_items = self.load_items(db_tx, line_item_ids(&old_lines)).await?;
        self.move_line_stock(
            db_tx,
            &old_lines,
            &old_items,
            -1,
            StockSource::CreditNote,
            note.id,
            &format!("{} {} {what}", DOCUMENT_TYPE.label(), note.number),
            actor,
        )
        .await?;
        self.adjust_party_balance(db_tx, note.party_id, note.total)
            .await
    }

    async fn require_returned_invoice(
        &self,
        db_tx: &DatabaseTransaction,
        invoice_id: Uuid,
        party_id: Uuid,
    ) -> ResultEngine<()> {
        let model = invoices::Entity::find_by_id(invoice_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("invoice {invoice_id}")))?;
        let invoice = Invoice::try_from(model)?;
        if invoice.kind != InvoiceKind::Sale {
            return Err(EngineError::Validation(format!(
                "credit notes can only reference sale invoices, {} is a purchase",
                invoice.number
            )));
        }
        if invoice.party_id != party_id {
            return Err(EngineError::Validation(format!(
                "invoice {} belongs to another party",
                invoice.number
            )));
        }
        Ok(())
    }
}
