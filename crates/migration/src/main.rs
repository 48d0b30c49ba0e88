//! Schema runner for the ledger database.
//!
//! Resolves the same database the `ledger` binary uses: `DATABASE_URL`
//! first, then `LEDGER__DATABASE__SQLITE=<path>` or `LEDGER__DATABASE=memory`.
use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./ledger.db?mode=rwc";
const USAGE: &str = "Usage: migration [up|down [steps]|fresh|refresh|status]";

fn database_url(var: impl Fn(&str) -> Option<String>) -> String {
    if let Some(url) = var("DATABASE_URL") {
        return url;
    }
    if let Some(path) = var("LEDGER__DATABASE__SQLITE") {
        return format!("sqlite:{path}?mode=rwc");
    }
    match var("LEDGER__DATABASE").as_deref() {
        Some("memory") => "sqlite::memory:".to_string(),
        _ => DEFAULT_DATABASE_URL.to_string(),
    }
}

fn usage() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = match args.next() {
        Some(raw) => Some(raw.parse::<u32>().unwrap_or_else(|_| usage())),
        None => None,
    };

    let db_url = database_url(|key| std::env::var(key).ok());
    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, steps).await?,
        // one step by default
        "down" => migration::Migrator::down(&db, Some(steps.unwrap_or(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => usage(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn url_from(pairs: &[(&str, &str)]) -> String {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (ToString::to_string(k), ToString::to_string(v)))
            .collect();
        database_url(|key| env.get(key).cloned())
    }

    #[test]
    fn explicit_url_wins() {
        let url = url_from(&[
            ("DATABASE_URL", "sqlite:/tmp/a.db"),
            ("LEDGER__DATABASE__SQLITE", "/tmp/b.db"),
        ]);
        assert_eq!(url, "sqlite:/tmp/a.db");
    }

    #[test]
    fn ledger_settings_are_honoured() {
        assert_eq!(
            url_from(&[("LEDGER__DATABASE__SQLITE", "/srv/ledger.db")]),
            "sqlite:/srv/ledger.db?mode=rwc"
        );
        assert_eq!(url_from(&[("LEDGER__DATABASE", "memory")]), "sqlite::memory:");
        assert_eq!(url_from(&[]), DEFAULT_DATABASE_URL);
    }
}
