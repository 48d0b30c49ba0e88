use sea_orm::{DatabaseTransaction, Statement, TransactionTrait, prelude::*};
use tracing::{debug, info};

use crate::{
    DocumentType, EngineError, ResultEngine, SequenceCounter, format_number, sequences,
    util::normalize_required_text,
};

use super::{Engine, with_tx};

const MAX_PADDING: i32 = 12;

impl Engine {
    /// Hand out the next number for `doc_type` and burn it.
    ///
    /// Read and increment happen in one statement; a number is never handed
    /// out twice, even if the document that took it is deleted.
    pub(super) async fn allocate_number_in(
        &self,
        db_tx: &DatabaseTransaction,
        doc_type: DocumentType,
    ) -> ResultEngine<String> {
        let row = db_tx
            .query_one(Statement::from_sql_and_values(
                self.backend(),
                "UPDATE sequence_counters SET next_number = next_number + 1 WHERE id = ? \
                 RETURNING prefix, next_number - 1 AS allocated, padding;",
                vec![doc_type.as_str().into()],
            ))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("sequence counter {doc_type}")))?;
        let prefix: String = row.try_get("", "prefix")?;
        let allocated: i64 = row.try_get("", "allocated")?;
        let padding: i32 = row.try_get("", "padding")?;

        let number = format_number(&prefix, allocated, padding);
        debug!(%doc_type, %number, "number allocated");
        Ok(number)
    }

    /// Allocate a number outside of any document mutation.
    pub async fn allocate_number(&self, doc_type: DocumentType) -> ResultEngine<String> {
        with_tx!(self, |db_tx| self.allocate_number_in(&db_tx, doc_type).await)
    }

    pub async fn sequence(&self, doc_type: DocumentType) -> ResultEngine<SequenceCounter> {
        sequences::Entity::find_by_id(doc_type.as_str())
            .one(&self.database)
            .await?
            .map(SequenceCounter::from)
            .ok_or_else(|| EngineError::NotFound(format!("sequence counter {doc_type}")))
    }

    /// Change prefix and padding of a counter.
    ///
    /// `next_number` can only move forward: a lower value than the current
    /// one is ignored.
    pub async fn configure_sequence(
        &self,
        doc_type: DocumentType,
        prefix: &str,
        padding: i32,
        next_number: Option<i64>,
    ) -> ResultEngine<SequenceCounter> {
        let prefix = normalize_required_text(prefix, "prefix")?;
        if !(0..=MAX_PADDING).contains(&padding) {
            return Err(EngineError::Validation(format!(
                "padding must be between 0 and {MAX_PADDING}"
            )));
        }

        with_tx!(self, |db_tx| {
            let result = db_tx
                .execute(Statement::from_sql_and_values(
                    self.backend(),
                    "UPDATE sequence_counters SET prefix = ?, padding = ?, \
                     next_number = MAX(next_number, COALESCE(?, next_number)) WHERE id = ?;",
                    vec![
                        prefix.clone().into(),
                        padding.into(),
                        next_number.into(),
                        doc_type.as_str().into(),
                    ],
                ))
                .await?;
            if result.rows_affected() == 0 {
                return Err(EngineError::NotFound(format!("sequence counter {doc_type}")));
            }
            let counter = sequences::Entity::find_by_id(doc_type.as_str())
                .one(&db_tx)
                .await?
                .map(SequenceCounter::from)
                .ok_or_else(|| EngineError::NotFound(format!("sequence counter {doc_type}")))?;
            info!(%doc_type, prefix = %counter.prefix, next = counter.next_number, "sequence configured");
            Ok(counter)
        })
    }
}
