//! SQLite connection management for the index store.
//!
//! The index lives in a single database file inside the configured storage
//! directory. WAL journaling is enabled; the pipeline still assumes a single
//! writer and reader process at a time.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name of the index database inside the storage directory.
pub const INDEX_DB_FILE: &str = "index.sqlite";

/// Path of the index database for a storage directory.
pub fn index_db_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(INDEX_DB_FILE)
}

/// Open the index database under `storage_dir`.
///
/// With `create` set, the storage directory and database file are created
/// when missing; otherwise a missing database is an error.
pub async fn connect(storage_dir: &Path, create: bool) -> Result<SqlitePool> {
    let db_path = index_db_path(storage_dir);

    if create {
        std::fs::create_dir_all(storage_dir).with_context(|| {
            format!("Failed to create storage directory: {}", storage_dir.display())
        })?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open index database: {}", db_path.display()))?;

    Ok(pool)
}
