use chrono::Utc;
use sea_orm::{DatabaseTransaction, Order, QueryFilter, QueryOrder, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{
    HistoryEntry, ResultEngine, history,
    history::NewEntry,
};

use super::Engine;

impl Engine {
    /// Append one entry to the document history inside `db_tx`.
    pub(super) async fn append_history(
        &self,
        db_tx: &DatabaseTransaction,
        entry: NewEntry<'_>,
    ) -> ResultEngine<()> {
        let document_id = entry.document_id;
        let action = entry.action;
        history::ActiveModel::append(entry, Utc::now())?
            .insert(db_tx)
            .await?;
        debug!(%document_id, %action, "history appended");
        Ok(())
    }

    /// History of one document in the order it was written, with decoded
    /// snapshots.
    pub async fn history(&self, document_id: Uuid) -> ResultEngine<Vec<HistoryEntry>> {
        history::Entity::find()
            .filter(history::Column::DocumentId.eq(document_id.to_string()))
            .order_by_asc(history::Column::CreatedAt)
            // entries written within one clock tick keep insertion order
            .order_by(Expr::cust("rowid"), Order::Asc)
            .all(&self.database)
            .await?
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect()
    }
}
