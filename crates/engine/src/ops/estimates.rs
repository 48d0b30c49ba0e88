use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveValue, DatabaseTransaction, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Actor, DocumentType, EngineError, Estimate, EstimateCmd, EstimateStatus, HistoryAction,
    Invoice, InvoiceCmd, InvoiceKind, ResultEngine, Snapshot, compute_totals, estimates,
    history::NewEntry,
    util::normalize_optional_text,
};

use super::{Engine, invoices::PreparedInvoice, line_item_ids, with_tx};

const DOCUMENT_TYPE: DocumentType = DocumentType::Estimate;

fn ensure_open(estimate: &Estimate) -> ResultEngine<()> {
    if estimate.status == EstimateStatus::Converted {
        return Err(EngineError::Validation(format!(
            "estimate {} was already converted",
            estimate.number
        )));
    }
    Ok(())
}

impl Engine {
    /// Create an estimate. Estimates move neither stock nor balances.
    pub async fn create_estimate(&self, cmd: EstimateCmd, actor: &Actor) -> ResultEngine<Estimate> {
        let (amounts, totals) = compute_totals(&cmd.lines)?;
        let notes = normalize_optional_text(cmd.notes.as_deref());

        with_tx!(self, |db_tx| {
            self.require_party(&db_tx, cmd.party_id).await?;
            self.load_items(&db_tx, line_item_ids(&cmd.lines)).await?;

            let estimate_id = Uuid::new_v4();
            let number = self.allocate_number_in(&db_tx, DOCUMENT_TYPE).await?;
            let now = Utc::now();
            let mut header = estimates::ActiveModel {
                id: ActiveValue::Set(estimate_id.to_string()),
                number: ActiveValue::Set(number.clone()),
                party_id: ActiveValue::Set(cmd.party_id.to_string()),
                date: ActiveValue::Set(cmd.date),
                valid_until: ActiveValue::Set(cmd.valid_until),
                status: ActiveValue::Set(EstimateStatus::Open.as_str().to_string()),
                converted_to_invoice_id: ActiveValue::Set(None),
                notes: ActiveValue::Set(notes),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            header.set_totals(&totals);
            header.insert(&db_tx).await?;
            self.insert_lines(&db_tx, DOCUMENT_TYPE, estimate_id, &cmd.lines, &amounts)
                .await?;

            let estimate = self.fetch_estimate(&db_tx, estimate_id).await?;
            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: estimate_id,
                    document_type: DOCUMENT_TYPE,
                    action: HistoryAction::Created,
                    description: format!("Estimate {number} created (total {})", estimate.total),
                    old_values: None,
                    new_values: Some(Snapshot::from(&estimate)),
                    actor,
                },
            )
            .await?;

            info!(estimate_id = %estimate_id, number = %number, "estimate created");
            Ok(estimate)
        })
    }

    /// Replace the content of an open estimate.
    pub async fn update_estimate(
        &self,
        estimate_id: Uuid,
        cmd: EstimateCmd,
        actor: &Actor,
    ) -> ResultEngine<Estimate> {
        let (amounts, totals) = compute_totals(&cmd.lines)?;
        let notes = normalize_optional_text(cmd.notes.as_deref());

        with_tx!(self, |db_tx| {
            let old = self.fetch_estimate(&db_tx, estimate_id).await?;
            ensure_open(&old)?;
            self.require_party(&db_tx, cmd.party_id).await?;
            self.load_items(&db_tx, line_item_ids(&cmd.lines)).await?;

            self.delete_lines(&db_tx, DOCUMENT_TYPE, estimate_id).await?;
            let mut header = estimates::ActiveModel {
                id: ActiveValue::Unchanged(estimate_id.to_string()),
                party_id: ActiveValue::Set(cmd.party_id.to_string()),
                date: ActiveValue::Set(cmd.date),
                valid_until: ActiveValue::Set(cmd.valid_until),
                notes: ActiveValue::Set(notes),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            header.set_totals(&totals);
            header.update(&db_tx).await?;
            self.insert_lines(&db_tx, DOCUMENT_TYPE, estimate_id, &cmd.lines, &amounts)
                .await?;

            let new = self.fetch_estimate(&db_tx, estimate_id).await?;
            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: estimate_id,
                    document_type: DOCUMENT_TYPE,
                    action: HistoryAction::Updated,
                    description: format!(
                        "Estimate {} updated: total {} -> {}",
                        new.number, old.total, new.total
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: Some(Snapshot::from(&new)),
                    actor,
                },
            )
            .await?;

            info!(estimate_id = %estimate_id, total = %new.total, "estimate updated");
            Ok(new)
        })
    }

    /// Delete an open estimate. Converted estimates stay as the source
    /// record of their invoice.
    pub async fn delete_estimate(&self, estimate_id: Uuid, actor: &Actor) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_estimate(&db_tx, estimate_id).await?;
            ensure_open(&old)?;
            self.delete_lines(&db_tx, DOCUMENT_TYPE, estimate_id).await?;
            estimates::Entity::delete_by_id(estimate_id.to_string())
                .exec(&db_tx)
                .await?;

            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: estimate_id,
                    document_type: DOCUMENT_TYPE,
                    action: HistoryAction::Deleted,
                    description: format!("Estimate {} deleted", old.number),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: None,
                    actor,
                },
            )
            .await?;

            info!(estimate_id = %estimate_id, number = %old.number, "estimate deleted");
            Ok(())
        })
    }

    /// Turn an open estimate into a sale invoice dated `date`.
    ///
    /// The invoice gets a fresh number and a verbatim copy of the estimate
    /// lines, and carries the usual sale effects: stock is validated and
    /// moved, the customer balance grows by the total. The estimate is marked
    /// converted. Both documents get a history entry.
    pub async fn convert_estimate(
        &self,
        estimate_id: Uuid,
        date: NaiveDate,
        actor: &Actor,
    ) -> ResultEngine<Invoice> {
        with_tx!(self, |db_tx| {
            let old = self.fetch_estimate(&db_tx, estimate_id).await?;
            ensure_open(&old)?;

            let mut cmd = InvoiceCmd::new(old.party_id, date);
            cmd.notes = old.notes.clone();
            cmd.lines = old.lines.iter().map(|line| line.to_input()).collect();
            let prepared = PreparedInvoice::new(cmd)?;

            let invoice = self
                .create_invoice_in(&db_tx, InvoiceKind::Sale, prepared, Some(estimate_id), actor)
                .await?;

            estimates::ActiveModel {
                id: ActiveValue::Unchanged(estimate_id.to_string()),
                status: ActiveValue::Set(EstimateStatus::Converted.as_str().to_string()),
                converted_to_invoice_id: ActiveValue::Set(Some(invoice.id.to_string())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            let new = self.fetch_estimate(&db_tx, estimate_id).await?;
            self.append_history(
                &db_tx,
                NewEntry {
                    document_id: estimate_id,
                    document_type: DOCUMENT_TYPE,
                    action: HistoryAction::Converted,
                    description: format!(
                        "Estimate {} converted to sale invoice {}",
                        old.number, invoice.number
                    ),
                    old_values: Some(Snapshot::from(&old)),
                    new_values: Some(Snapshot::from(&new)),
                    actor,
                },
            )
            .await?;

            info!(
                estimate_id = %estimate_id,
                invoice_id = %invoice.id,
                number = %invoice.number,
                "estimate converted"
            );
            Ok(invoice)
        })
    }

    pub async fn estimate(&self, estimate_id: Uuid) -> ResultEngine<Estimate> {
        with_tx!(self, |db_tx| self.fetch_estimate(&db_tx, estimate_id).await)
    }

    async fn fetch_estimate(
        &self,
        db_tx: &DatabaseTransaction,
        estimate_id: Uuid,
    ) -> ResultEngine<Estimate> {
        let model = estimates::Entity::find_by_id(estimate_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("estimate {estimate_id}")))?;
        let mut estimate = Estimate::try_from(model)?;
        estimate.lines = self.load_lines(db_tx, DOCUMENT_TYPE, estimate_id).await?;
        Ok(estimate)
    }
}
