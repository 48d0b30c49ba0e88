//! Per document type number counters.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    pub doc_type: String,
    pub prefix: String,
    pub next_number: i64,
    pub padding: i32,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sequence_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub prefix: String,
    pub next_number: i64,
    pub padding: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SequenceCounter {
    fn from(model: Model) -> Self {
        Self {
            doc_type: model.id,
            prefix: model.prefix,
            next_number: model.next_number,
            padding: model.padding,
        }
    }
}

/// `PREFIX-000NN`; numbers wider than `padding` are kept whole.
pub fn format_number(prefix: &str, number: i64, padding: i32) -> String {
    let width = usize::try_from(padding).unwrap_or(0);
    format!("{prefix}-{number:0width$}")
}
