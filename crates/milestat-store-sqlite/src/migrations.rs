use chrono::{SecondsFormat, Utc};
use milestat_core::{MilestatError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

const MIGRATION_0001: &str = include_str!("../migrations/0001_init.sql");
const MIGRATION_0002: &str = include_str!("../migrations/0002_add_company.sql");
const MIGRATION_0003: &str = include_str!("../migrations/0003_add_setting.sql");

/// Ordered schema migrations, applied once each
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_init", MIGRATION_0001),
    ("0002_add_company", MIGRATION_0002),
    ("0003_add_setting", MIGRATION_0003),
];

pub(crate) fn migrate(conn: &mut Connection) -> Result<()> {
    apply(conn).map_err(|e| MilestatError::storage("migrate", e))
}

fn apply(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migration (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )?;

    for (name, sql) in MIGRATIONS {
        let applied: Option<String> = tx
            .query_row(
                "SELECT name FROM schema_migration WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if applied.is_some() {
            continue;
        }
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migration (name, applied_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)],
        )?;
        info!("Applied migration {}", name);
    }

    tx.commit()
}
