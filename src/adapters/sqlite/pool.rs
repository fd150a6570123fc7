use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::PathBuf;
use tracing::debug;

use crate::types::error::MessagingError;

// Shorthand for the r2d2 pool of SQLite connections
pub type DbPool = Pool<SqliteConnectionManager>;

/// Where the message store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    /// Private in-memory database. Contents are lost when the store closes.
    Memory,
}

/// Default database file path
/// On mobile (iOS/Android), the CWD is read-only so we must use data_dir()
pub fn default_db_path() -> PathBuf {
    #[cfg(any(target_os = "ios", target_os = "android"))]
    let base = dirs::data_dir();

    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    let base = dirs::data_local_dir();

    base.unwrap_or_else(|| PathBuf::from("."))
        .join("arc-messaging")
        .join("messages.db")
}

pub fn create_pool(location: &StoreLocation) -> Result<DbPool, MessagingError> {
    match location {
        StoreLocation::File(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(|e| {
                    MessagingError::Database(format!("Failed to create database dir: {e}"))
                })?;
            }
            debug!("Opening message store at {:?}", path);

            let manager = SqliteConnectionManager::file(path).with_init(|conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA temp_store = MEMORY;
                     PRAGMA busy_timeout = 5000;",
                )
            });

            let pool = Pool::builder().max_size(4).build(manager)?;
            Ok(pool)
        }
        StoreLocation::Memory => {
            // Every in-memory connection is its own database, so the pool
            // must never hand out a second one nor retire the first.
            let manager = SqliteConnectionManager::memory();
            let pool = memory_pool_builder().build(manager)?;
            Ok(pool)
        }
    }
}

fn memory_pool_builder() -> r2d2::Builder<SqliteConnectionManager> {
    Pool::builder()
        .max_size(1)
        .max_lifetime(None)
        .idle_timeout(None)
}
