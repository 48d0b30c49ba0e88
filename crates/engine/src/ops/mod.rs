use std::collections::HashMap;

use sea_orm::{
    DatabaseConnection, DatabaseTransaction, DbBackend, QueryFilter, QueryOrder,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    DocumentType, EngineError, Item, Line, LineAmounts, LineInput, Party, ResultEngine, items,
    lines, parties,
};

mod audit;
mod balances;
mod catalog;
mod credit_notes;
mod estimates;
mod history;
mod invoices;
mod loans;
mod payments;
mod sequences;
mod status;
mod stock;

pub use audit::{ItemAudit, PartyAudit};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn backend(&self) -> DbBackend {
        self.database.get_database_backend()
    }

    async fn require_party(&self, db_tx: &DatabaseTransaction, party_id: Uuid) -> ResultEngine<Party> {
        let model = parties::Entity::find_by_id(party_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("party {party_id}")))?;
        Party::try_from(model)
    }

    /// Load the given items, keyed by id.
    ///
    /// Fails with `NotFound` when any id is unknown.
    async fn load_items(
        &self,
        db_tx: &DatabaseTransaction,
        item_ids: impl IntoIterator<Item = Uuid>,
    ) -> ResultEngine<HashMap<Uuid, Item>> {
        let mut wanted: Vec<Uuid> = item_ids.into_iter().collect();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let models = items::Entity::find()
            .filter(items::Column::Id.is_in(wanted.iter().map(Uuid::to_string)))
            .all(db_tx)
            .await?;
        let mut found = HashMap::with_capacity(models.len());
        for model in models {
            let item = Item::try_from(model)?;
            found.insert(item.id, item);
        }
        if let Some(missing) = wanted.iter().find(|id| !found.contains_key(id)) {
            return Err(EngineError::NotFound(format!("item {missing}")));
        }
        Ok(found)
    }

    async fn load_lines(
        &self,
        db_tx: &DatabaseTransaction,
        document_type: DocumentType,
        document_id: Uuid,
    ) -> ResultEngine<Vec<Line>> {
        lines::Entity::find()
            .filter(lines::Column::DocumentType.eq(document_type.as_str()))
            .filter(lines::Column::DocumentId.eq(document_id.to_string()))
            .order_by_asc(lines::Column::Position)
            .all(db_tx)
            .await?
            .into_iter()
            .map(Line::try_from)
            .collect()
    }

    async fn insert_lines(
        &self,
        db_tx: &DatabaseTransaction,
        document_type: DocumentType,
        document_id: Uuid,
        inputs: &[LineInput],
        amounts: &[LineAmounts],
    ) -> ResultEngine<()> {
        for (position, (input, computed)) in inputs.iter().zip(amounts).enumerate() {
            lines::ActiveModel::for_document(document_type, document_id, position, input, computed)
                .insert(db_tx)
                .await?;
        }
        Ok(())
    }

    async fn delete_lines(
        &self,
        db_tx: &DatabaseTransaction,
        document_type: DocumentType,
        document_id: Uuid,
    ) -> ResultEngine<()> {
        lines::Entity::delete_many()
            .filter(lines::Column::DocumentType.eq(document_type.as_str()))
            .filter(lines::Column::DocumentId.eq(document_id.to_string()))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}

/// Item ids referenced by a set of lines, in line order.
fn line_item_ids<'a>(inputs: impl IntoIterator<Item = &'a LineInput>) -> Vec<Uuid> {
    inputs.into_iter().filter_map(|line| line.item_id).collect()
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
