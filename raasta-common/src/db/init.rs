//! Database initialization
//!
//! Creates the SQLite file on first run and the `reports` table if it is missing.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How long a writer waits on SQLite's lock before `database is locked` is returned
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas set here apply to every pooled connection, not just the first.
    // WAL lets listings read while an engagement update is being written.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_reports_table(&pool).await?;

    Ok(pool)
}

/// One row per report; the aggregate itself lives in `document`
///
/// Scalar columns duplicate fields of the document for filtering and ordering.
/// `version` is bumped on every write and guards read-modify-write cycles.
async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            reported_by TEXT NOT NULL,
            type TEXT NOT NULL,
            status TEXT NOT NULL,
            severity TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            reported_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            client_token TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            document TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_client_token ON reports(reported_by, client_token)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_active_reported_at ON reports(is_active, reported_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_reported_by ON reports(reported_by)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_type_status ON reports(type, status)")
        .execute(pool)
        .await?;

    Ok(())
}
