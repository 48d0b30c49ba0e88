//! Seeds the default document number sequences.
//!
//! Counters are never reset by the application: a number consumed by a
//! deleted document stays burned.

use sea_orm::{ConnectionTrait, Statement};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEFAULT_PADDING: i32 = 5;

const DEFAULT_COUNTERS: [(&str, &str); 6] = [
    ("sale_invoice", "INV"),
    ("purchase_invoice", "PUR"),
    ("estimate", "EST"),
    ("credit_note", "CN"),
    ("payment_in", "PIN"),
    ("payment_out", "POUT"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        for (id, prefix) in DEFAULT_COUNTERS {
            db.execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO sequence_counters (id, prefix, next_number, padding) \
                 VALUES (?, ?, 1, ?) ON CONFLICT (id) DO NOTHING;",
                vec![id.into(), prefix.into(), DEFAULT_PADDING.into()],
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        for (id, _) in DEFAULT_COUNTERS {
            db.execute(Statement::from_sql_and_values(
                backend,
                "DELETE FROM sequence_counters WHERE id = ?;",
                vec![id.into()],
            ))
            .await?;
        }

        Ok(())
    }
}
