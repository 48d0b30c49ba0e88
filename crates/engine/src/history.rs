//! Append-only document history (`invoice_history`).
//!
//! Every successful mutation writes exactly one entry inside its own
//! transaction; estimate conversion writes two. Entries are never updated
//! or deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Actor, DocumentType, EngineError, ResultEngine, Snapshot,
    util::parse_uuid,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    Deleted,
    Converted,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Converted => "converted",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for HistoryAction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            "converted" => Ok(Self::Converted),
            other => Err(EngineError::Validation(format!(
                "invalid history action: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub action: HistoryAction,
    pub description: String,
    pub old_values: Option<Snapshot>,
    pub new_values: Option<Snapshot>,
    pub user_id: Option<String>,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub document_id: String,
    pub document_type: String,
    pub action: String,
    pub description: String,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub user_id: Option<String>,
    pub user_name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Fields of a history entry about to be appended.
pub(crate) struct NewEntry<'a> {
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub action: HistoryAction,
    pub description: String,
    pub old_values: Option<Snapshot>,
    pub new_values: Option<Snapshot>,
    pub actor: &'a Actor,
}

impl ActiveModel {
    pub(crate) fn append(entry: NewEntry<'_>, now: DateTime<Utc>) -> ResultEngine<Self> {
        let old_values = entry.old_values.as_ref().map(Snapshot::encode).transpose()?;
        let new_values = entry.new_values.as_ref().map(Snapshot::encode).transpose()?;
        Ok(Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            document_id: ActiveValue::Set(entry.document_id.to_string()),
            document_type: ActiveValue::Set(entry.document_type.as_str().to_string()),
            action: ActiveValue::Set(entry.action.as_str().to_string()),
            description: ActiveValue::Set(entry.description),
            old_values: ActiveValue::Set(old_values),
            new_values: ActiveValue::Set(new_values),
            user_id: ActiveValue::Set(entry.actor.user_id.clone()),
            user_name: ActiveValue::Set(entry.actor.display_name().to_string()),
            created_at: ActiveValue::Set(now),
        })
    }
}

impl TryFrom<Model> for HistoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "history")?,
            document_id: parse_uuid(&model.document_id, "document")?,
            document_type: DocumentType::try_from(model.document_type.as_str())?,
            action: HistoryAction::try_from(model.action.as_str())?,
            description: model.description,
            old_values: model.old_values.as_deref().map(Snapshot::decode).transpose()?,
            new_values: model.new_values.as_deref().map(Snapshot::decode).transpose()?,
            user_id: model.user_id,
            user_name: model.user_name,
            created_at: model.created_at,
        })
    }
}
