//! Atomic invoice status updates.
//!
//! `amount_due` and `status` are rewritten in the same `UPDATE` that moves
//! `amount_paid` or `total`, so no reader ever sees them disagree. The
//! right-hand side of an SQLite `UPDATE` sees the row as it was before the
//! statement, hence the explicit `amount_paid + ?` expressions.

use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseTransaction, Statement, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{DocumentTotals, EngineError, InvoiceStatus, Money, ResultEngine};

use super::Engine;

/// SQL mirror of [`InvoiceStatus::derive`].
fn status_case(paid: &str, due: &str) -> String {
    format!(
        "CASE WHEN {due} <= 0 THEN '{}' WHEN {paid} > 0 THEN '{}' ELSE '{}' END",
        InvoiceStatus::Paid.as_str(),
        InvoiceStatus::Partial.as_str(),
        InvoiceStatus::Unpaid.as_str(),
    )
}

/// Header fields rewritten by an invoice edit.
pub(super) struct InvoiceHeader<'a> {
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<&'a str>,
    pub totals: &'a DocumentTotals,
}

impl Engine {
    /// Move the paid amount of an invoice by `delta` and re-derive its status.
    pub(super) async fn apply_invoice_payment(
        &self,
        db_tx: &DatabaseTransaction,
        invoice_id: Uuid,
        delta: Money,
    ) -> ResultEngine<()> {
        let sql = format!(
            "UPDATE invoices SET amount_paid = amount_paid + ?, \
             amount_due = total - (amount_paid + ?), \
             status = {}, \
             updated_at = ? \
             WHERE id = ?;",
            status_case("(amount_paid + ?)", "(total - (amount_paid + ?))"),
        );
        let delta = delta.minor();
        let result = db_tx
            .execute(Statement::from_sql_and_values(
                self.backend(),
                sql,
                vec![
                    delta.into(),
                    delta.into(),
                    delta.into(),
                    delta.into(),
                    Utc::now().into(),
                    invoice_id.to_string().into(),
                ],
            ))
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("invoice {invoice_id}")));
        }
        debug!(%invoice_id, delta, "invoice payment applied");
        Ok(())
    }

    /// Rewrite an invoice header with new totals, keeping what was paid.
    pub(super) async fn rewrite_invoice_header(
        &self,
        db_tx: &DatabaseTransaction,
        invoice_id: Uuid,
        header: InvoiceHeader<'_>,
    ) -> ResultEngine<()> {
        let sql = format!(
            "UPDATE invoices SET party_id = ?, date = ?, notes = ?, \
             subtotal = ?, tax_amount = ?, discount_amount = ?, total = ?, \
             amount_due = ? - amount_paid, \
             status = {}, \
             updated_at = ? \
             WHERE id = ?;",
            status_case("amount_paid", "(? - amount_paid)"),
        );
        let total = header.totals.total.minor();
        let result = db_tx
            .execute(Statement::from_sql_and_values(
                self.backend(),
                sql,
                vec![
                    header.party_id.to_string().into(),
                    header.date.into(),
                    header.notes.map(ToString::to_string).into(),
                    header.totals.subtotal.minor().into(),
                    header.totals.tax_amount.minor().into(),
                    header.totals.discount_amount.minor().into(),
                    total.into(),
                    total.into(),
                    total.into(),
                    Utc::now().into(),
                    invoice_id.to_string().into(),
                ],
            ))
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("invoice {invoice_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_checks_due_before_paid() {
        assert_eq!(
            status_case("p", "d"),
            "CASE WHEN d <= 0 THEN 'paid' WHEN p > 0 THEN 'partial' ELSE 'unpaid' END"
        );
    }
}
