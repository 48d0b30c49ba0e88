use std::error::Error;

use clap::{Parser, Subcommand};
use engine::{DocumentType, Engine};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

mod settings;

const DEFAULT_DATABASE_URL: &str = "sqlite:./ledger.db?mode=rwc";

#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(about = "Maintenance utilities for the invoicing ledger")]
struct Cli {
    /// Settings file, without extension.
    #[arg(long, default_value = "ledger")]
    config: String,

    /// Database connection string (also read from `DATABASE_URL`).
    /// Takes precedence over the `database` section of the settings.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,
    /// Recompute a party balance from its documents.
    AuditParty { party_id: Uuid },
    /// Recompute an item stock from its documents and manual adjustments.
    AuditItem { item_id: Uuid },
    /// Change log of a document.
    History { document_id: Uuid },
    /// Stock movements of an item.
    ItemHistory { item_id: Uuid },
    /// Products at or below their alert level.
    LowStock,
    /// Show a sequence counter, or reconfigure it when any option is given.
    Sequence {
        /// e.g. `sale_invoice`, `credit_note`.
        #[arg(value_parser = parse_document_type)]
        doc_type: DocumentType,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        padding: Option<i32>,
        #[arg(long)]
        next_number: Option<i64>,
    },
}

fn parse_document_type(raw: &str) -> Result<DocumentType, String> {
    DocumentType::try_from(raw).map_err(|err| err.to_string())
}

async fn connect_db(database_url: &str) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledger={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let database_url = cli
        .database_url
        .or_else(|| settings.database.as_ref().map(settings::Database::url))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    tracing::debug!(%database_url, "connecting");
    let db = connect_db(&database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Migrate => {
            tracing::info!("migrations applied");
        }
        Command::AuditParty { party_id } => {
            let audit = engine.audit_party(party_id).await?;
            print_json(&audit)?;
            if !audit.is_consistent() {
                std::process::exit(1);
            }
        }
        Command::AuditItem { item_id } => {
            let audit = engine.audit_item(item_id).await?;
            print_json(&audit)?;
            if !audit.is_consistent() {
                std::process::exit(1);
            }
        }
        Command::History { document_id } => {
            print_json(&engine.history(document_id).await?)?;
        }
        Command::ItemHistory { item_id } => {
            print_json(&engine.item_history(item_id).await?)?;
        }
        Command::LowStock => {
            print_json(&engine.low_stock_items().await?)?;
        }
        Command::Sequence {
            doc_type,
            prefix,
            padding,
            next_number,
        } => {
            let current = engine.sequence(doc_type).await?;
            let counter = if prefix.is_none() && padding.is_none() && next_number.is_none() {
                current
            } else {
                engine
                    .configure_sequence(
                        doc_type,
                        prefix.as_deref().unwrap_or(&current.prefix),
                        padding.unwrap_or(current.padding),
                        next_number,
                    )
                    .await?
            };
            print_json(&counter)?;
        }
    }

    Ok(())
}
