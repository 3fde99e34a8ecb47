//! Database module
//!
//! SQLite persistence for the key/value store: connection setup,
//! versioned migrations, the stored record types and the repository.

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::Repository;
pub use schema::{initialize_database, schema_version};

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// Connections held by the application pool
const POOL_SIZE: u32 = 4;

fn connect_options(db_path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
}

/// Open the database at `db_path`, creating and migrating it as needed.
///
/// Migrations run on a single connection that is closed before the
/// application pool opens.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Opening database at {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let migrator = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(db_path))
        .await?;
    initialize_database(&migrator).await?;
    migrator.close().await;

    let pool = SqlitePoolOptions::new()
        .max_connections(POOL_SIZE)
        .connect_with(connect_options(db_path))
        .await?;

    tracing::debug!("Database pool ready ({} connections)", POOL_SIZE);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_makes_parent_dirs_and_migrates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("a").join("b").join("nuveen.db");

        let pool = create_pool(&db_path).await.unwrap();

        assert!(db_path.exists());
        assert_eq!(schema_version(&pool).await.unwrap(), 1);
    }
}
