//! The module contains the errors the engine can throw.
//!
//! Every variant aborts the surrounding database transaction, so a caller
//! receiving an error can assume no partial state was persisted.
//!
//! - [`NotFound`] a referenced document, party, item or counter is missing.
//! - [`InsufficientStock`] a sale asks for more than the available stock.
//! - [`ExpiredItem`] a sale line references an item expired at the invoice date.
//! - [`Validation`] malformed input, rejected before any write.
//! - [`Database`] opaque failure of the underlying store.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`InsufficientStock`]: EngineError::InsufficientStock
//!  [`ExpiredItem`]: EngineError::ExpiredItem
//!  [`Validation`]: EngineError::Validation
//!  [`Database`]: EngineError::Database
use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::Quantity;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Insufficient stock for {item_name}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: Uuid,
        item_name: String,
        available: Quantity,
        requested: Quantity,
    },
    #[error("{item_name} expired on {expiry_date}")]
    ExpiredItem {
        item_id: Uuid,
        item_name: String,
        expiry_date: NaiveDate,
    },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid history snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (
                Self::InsufficientStock {
                    item_id: a_id,
                    available: a_available,
                    requested: a_requested,
                    ..
                },
                Self::InsufficientStock {
                    item_id: b_id,
                    available: b_available,
                    requested: b_requested,
                    ..
                },
            ) => a_id == b_id && a_available == b_available && a_requested == b_requested,
            (
                Self::ExpiredItem {
                    item_id: a_id,
                    expiry_date: a_date,
                    ..
                },
                Self::ExpiredItem {
                    item_id: b_id,
                    expiry_date: b_date,
                    ..
                },
            ) => a_id == b_id && a_date == b_date,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Snapshot(a), Self::Snapshot(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
