use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, PaginatorTrait, QueryFilter, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Actor, DocumentTotals, EngineError, HistoryAction, Invoice, InvoiceCmd, InvoiceKind,
    LineAmounts, LineInput, ResultEngine, Snapshot, compute_totals, credit_notes,
    history::NewEntry,
    invoices, payments,
    util::normalize_optional_text,
};

use super::{
    Engine, line_item_ids,
    status::InvoiceHeader,
    stock::validate_sale_lines,
    with_tx,
};

/// Validated invoice content, computed before any transaction opens.
pub(super) struct PreparedInvoice {
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub lines: Vec<LineInput>,
    pub amounts: Vec<LineAmounts>,
    pub totals: DocumentTotals,
}

impl PreparedInvoice {
    pub(super) fn new(cmd: InvoiceCmd) -> ResultEngine<Self> {
        let (amounts, totals) = compute_totals(&cmd.lines)?;
        Ok(Self {
            party_id: cmd.party_id,
            date: cmd.date,
            notes: normalize_optional_text(cmd.notes.as_deref()),
            lines: cmd.lines,
            amounts,
            totals,
        })
    }
}

impl Engine {
    /// Create a sale invoice: stock goes out, the customer owes the total.
    pub async fn create_sale_invoice(&self, cmd: InvoiceCmd, actor: &Actor) -> ResultEngine<Invoice> {
        let prepared = PreparedInvoice::new(cmd)?;
        with_tx!(self, |db_tx| {
            self.create_invoice_in(&db_tx, InvoiceKind::Sale, prepared, None, actor)
                .await
        })
    }

    /// Create a purchase invoice: stock comes in, we owe the supplier the total.
    pub async fn create_purchase_invoice(
        &self,
        cmd: InvoiceCmd,
        actor: &Actor,
    ) -> ResultEngine<Invoice> {
        let prepared = PreparedInvoice::new(cmd)?;
        with_tx!(self, |db_tx| {
            self.create_invoice_in(&db_tx, InvoiceKind::Purchase, prepared, None, actor)
                .await
        })
    }

    /// Replace the content of an invoice.
    ///
    /// The stored invoice is fully reversed (stock and party balance) before
    /// the new content is validated and applied. What was already paid is
    /// kept and status is derived again against the new total.
    ///
    /// An invoice referenced by payments or credit notes stays with its
    /// party.
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        cmd: InvoiceCmd,
        actor: &Actor,
    ) -> ResultEngine<Invoice> {
        let prepared = PreparedInvoice::new(cmd)?;
        with_tx!(self, |db_tx| {
            let old = self.fetch_invoice(&db_tx, invoice_id).await?;
            let kind = old.kind;
            let document_type = kind.document_type();
            if prepared.party_id != old.party_id {
                self.ensure_unreferenced(&db_tx, &old, "moved to another party")
                    .await?;
            }
            let old_lines: Vec<LineInput> = old.lines.iter().map(|line| line.to_input()).collect();

            // Reverse the stored effects.
            let old_items = self.load_items(&db_tx, line_item_ids(&old_lines)).await?;
            self.move_line_stock(
                &db_tx,
                &old_lines,
                &old_items,
                -kind.stock_sign(),
                kind.stock_source(),
                invoice_id,
                &format!("{} {} edited (reversal)", document_type.label(), old.number),
                actor,
            )
            .await?;
            self.adjust_party_balance(&db_tx, old.party_id, -kind.balance_delta(old.total))
                .await?;

            // Validate the new content against the restored stock.
            self.require_party(&db_tx, prepared.party_id).await?;
            let new_items = self.load_items(&db_tx, line_item_ids(&prepared.lines)).await?;
            if kind == InvoiceKind::Sale {
                validate_sale_lines(&prepared.lines, &new_items, prepared.date)?;
            }

            self.delete_lines(&db_tx, document_type, invoice_id).await?;
            self.rewrite_invoice_header(
                &db_tx,
                invoice_id,
                InvoiceHeader {
                    party_id: prepared.party_id,
                    date: prepared.date,
                    notes: prepared.notes.as_deref(),
                    totals: &prepared.totals,
                },
            )
            .await?;
            self.insert_lines(&db_tx, document_type, invoice_id, &prepared.lines, &prepared.amounts)
                .await?;

            // Apply the new effects.
            self.move_line_stock(
                &db_tx,
                &prepared.lines,
                &new_items,
                kind.stock_sign(),
                kind.stock_source(),
                invoice_id,
                &format!("{} {} edited", document_type.label(), old.number),
                actor,
            )
            .await?;
            self.adjust_party_balance(
                &db_tx,
                prepared.party_id,
                kind.balance_delta(prepared.totals.total),
            )
            .await?;

            let new = self.fetch_invoice(&db_tx, invoice_id).await?;
            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: invoice_id,
                    document_type,
                    action: HistoryAction::Updated,
                    description: format!(
                        "{} {} updated: total {} -> {}",
                        document_type.label(),
                        new.number,
                        old.total,
                        new.total
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: Some(Snapshot::from(&new)),
                    actor,
                },
            )
            .await?;

            info!(
                invoice_id = %invoice_id,
                number = %new.number,
                old_total = %old.total,
                total = %new.total,
                status = %new.status,
                "invoice updated"
            );
            Ok(new)
        })
    }

    /// Delete an invoice and reverse all its effects.
    ///
    /// Invoices with linked payments cannot be deleted; the payments have to
    /// go first.
    pub async fn delete_invoice(&self, invoice_id: Uuid, actor: &Actor) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_invoice(&db_tx, invoice_id).await?;
            let kind = old.kind;
            let document_type = kind.document_type();
            self.ensure_no_payments(&db_tx, &old, "deleted").await?;

            let old_lines: Vec<LineInput> = old.lines.iter().map(|line| line.to_input()).collect();
            let old_items = self.load_items(&db_tx, line_item_ids(&old_lines)).await?;
            self.move_line_stock(
                &db_tx,
                &old_lines,
                &old_items,
                -kind.stock_sign(),
                kind.stock_source(),
                invoice_id,
                &format!("{} {} deleted", document_type.label(), old.number),
                actor,
            )
            .await?;
            self.adjust_party_balance(&db_tx, old.party_id, -kind.balance_delta(old.total))
                .await?;

            self.delete_lines(&db_tx, document_type, invoice_id).await?;
            invoices::Entity::delete_by_id(invoice_id.to_string())
                .exec(&db_tx)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: invoice_id,
                    document_type,
                    action: HistoryAction::Deleted,
                    description: format!(
                        "{} {} deleted (total {})",
                        document_type.label(),
                        old.number,
                        old.total
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: None,
                    actor,
                },
            )
            .await?;

            info!(invoice_id = %invoice_id, number = %old.number, "invoice deleted");
            Ok(())
        })
    }

    async fn ensure_no_payments(
        &self,
        db_tx: &DatabaseTransaction,
        invoice: &Invoice,
        what: &str,
    ) -> ResultEngine<()> {
        let linked = payments::Entity::find()
            .filter(payments::Column::InvoiceId.eq(invoice.id.to_string()))
            .count(db_tx)
            .await?;
        if linked > 0 {
            return Err(EngineError::Validation(format!(
                "{} {} has {linked} linked payment(s) and cannot be {what}",
                invoice.kind.document_type().label(),
                invoice.number
            )));
        }
        Ok(())
    }

    /// Fail when payments or credit notes point at `invoice`.
    async fn ensure_unreferenced(
        &self,
        db_tx: &DatabaseTransaction,
        invoice: &Invoice,
        what: &str,
    ) -> ResultEngine<()> {
        self.ensure_no_payments(db_tx, invoice, what).await?;
        let notes = credit_notes::Entity::find()
            .filter(credit_notes::Column::InvoiceId.eq(invoice.id.to_string()))
            .count(db_tx)
            .await?;
        if notes > 0 {
            return Err(EngineError::Validation(format!(
                "{} {} is referenced by {notes} credit note(s) and cannot be {what}",
                invoice.kind.document_type().label(),
                invoice.number
            )));
        }
        Ok(())
    }

    /// Return an invoice with its lines.
    pub async fn invoice(&self, invoice_id: Uuid) -> ResultEngine<Invoice> {
        with_tx!(self, |db_tx| self.fetch_invoice(&db_tx, invoice_id).await)
    }

    pub(super) async fn fetch_invoice(
        &self,
        db_tx: &DatabaseTransaction,
        invoice_id: Uuid,
    ) -> ResultEngine<Invoice> {
        let model = invoices::Entity::find_by_id(invoice_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("invoice {invoice_id}")))?;
        let mut invoice = Invoice::try_from(model)?;
        invoice.lines = self
            .load_lines(db_tx, invoice.kind.document_type(), invoice_id)
            .await?;
        Ok(invoice)
    }

    /// Insert a new invoice and apply its effects inside `db_tx`.
    ///
    /// Shared by direct creation and estimate conversion.
    pub(super) async fn create_invoice_in(
        &self,
        db_tx: &DatabaseTransaction,
        kind: InvoiceKind,
        prepared: PreparedInvoice,
        estimate_id: Option<Uuid>,
        actor: &Actor,
    ) -> ResultEngine<Invoice> {
        let document_type = kind.document_type();

        self.require_party(db_tx, prepared.party_id).await?;
        let items = self.load_items(db_tx, line_item_ids(&prepared.lines)).await?;
        if kind == InvoiceKind::Sale {
            validate_sale_lines(&prepared.lines, &items, prepared.date)?;
        }

        let invoice_id = Uuid::new_v4();
        let number = self.allocate_number_in(db_tx, document_type).await?;
        invoices::ActiveModel::new_header(
            invoice_id,
            kind,
            number.clone(),
            prepared.party_id,
            prepared.date,
            &prepared.totals,
            estimate_id,
            prepared.notes.clone(),
            Utc::now(),
        )
        .insert(db_tx)
        .await?;
        self.insert_lines(db_tx, document_type, invoice_id, &prepared.lines, &prepared.amounts)
            .await?;

        self.move_line_stock(
            db_tx,
            &prepared.lines,
            &items,
            kind.stock_sign(),
            kind.stock_source(),
            invoice_id,
            &format!("{} {number}", document_type.label()),
            actor,
        )
        .await?;
        self.adjust_party_balance(db_tx, prepared.party_id, kind.balance_delta(prepared.totals.total))
            .await?;

        let invoice = self.fetch_invoice(db_tx, invoice_id).await?;
        self.append_history(
            db_tx,
            NewEntry {
                document_id: invoice_id,
                document_type,
                action: HistoryAction::Created,
                description: format!(
                    "{} {number} created (total {})",
                    document_type.label(),
                    invoice.total
                ),
                old_values: None,
                new_values: Some(Snapshot::from(&invoice)),
                actor,
            },
        )
        .await?;

        info!(
            invoice_id = %invoice_id,
            kind = kind.as_str(),
            number = %invoice.number,
            total = %invoice.total,
            "invoice created"
        );
        Ok(invoice)
    }
}
