pub use sea_orm_migration::prelude::*;

mod m20260301_000001_ledger;
mod m20260301_000002_sequence_counters;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_ledger::Migration),
            Box::new(m20260301_000002_sequence_counters::Migration),
        ]
    }
}
