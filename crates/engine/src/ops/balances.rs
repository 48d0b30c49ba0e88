use chrono::Utc;
use sea_orm::{DatabaseTransaction, Statement, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

use super::Engine;

impl Engine {
    /// Apply `current_balance += delta` to a party.
    ///
    /// Positive balances are receivables, negative ones payables. The update
    /// is relative so concurrent writers never lose each other's deltas.
    pub(super) async fn adjust_party_balance(
        &self,
        db_tx: &DatabaseTransaction,
        party_id: Uuid,
        delta: Money,
    ) -> ResultEngine<()> {
        let result = db_tx
            .execute(Statement::from_sql_and_values(
                self.backend(),
                "UPDATE parties SET current_balance = current_balance + ?, updated_at = ? WHERE id = ?;",
                vec![
                    delta.minor().into(),
                    Utc::now().into(),
                    party_id.to_string().into(),
                ],
            ))
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("party {party_id}")));
        }
        debug!(%party_id, delta = %delta, "party balance adjusted");
        Ok(())
    }
}
