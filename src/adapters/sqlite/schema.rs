//! Collection layout of the message store
//!
//! Every collection is a table of JSON documents keyed by a text key.
//! Secondary indexes are expression indexes over a top-level document field,
//! so an indexed lookup must use the exact expression from
//! [`IndexSpec::expression`] for SQLite to pick the index.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use crate::types::error::MessagingError;

/// Current schema version, stored in `PRAGMA user_version`
pub const DB_VERSION: i64 = 1;

pub const MESSAGES: &str = "messages";
pub const META: &str = "meta";

/// A secondary index over one document field
#[derive(Debug)]
pub struct IndexSpec {
    pub name: &'static str,
    pub field: &'static str,
    pub unique: bool,
}

impl IndexSpec {
    pub fn expression(&self) -> String {
        format!("json_extract(value, '$.{}')", self.field)
    }

    pub fn sql_name(&self, collection: &str) -> String {
        format!("idx_{}_{}", collection, self.name)
    }
}

/// A named collection and its indexes
#[derive(Debug)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub indexes: &'static [IndexSpec],
}

impl CollectionSpec {
    pub fn index(&self, name: &str) -> Result<&IndexSpec, MessagingError> {
        self.indexes
            .iter()
            .find(|index| index.name == name)
            .ok_or_else(|| MessagingError::UnknownIndex(format!("{}.{}", self.name, name)))
    }
}

pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec {
        name: MESSAGES,
        indexes: &[
            IndexSpec {
                name: "time",
                field: "time",
                unique: true,
            },
            IndexSpec {
                name: "read",
                field: "read",
                unique: false,
            },
        ],
    },
    CollectionSpec {
        name: META,
        indexes: &[],
    },
];

/// Look up a collection by name
pub fn collection(name: &str) -> Result<&'static CollectionSpec, MessagingError> {
    COLLECTIONS
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| MessagingError::UnknownCollection(name.to_string()))
}

type Migration = fn(&Transaction) -> rusqlite::Result<()>;

/// Migration `i` upgrades the schema from version `i` to `i + 1`.
const MIGRATIONS: &[Migration] = &[migrate_v1];

fn migrate_v1(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            key     TEXT PRIMARY KEY,   -- message id
            value   TEXT NOT NULL       -- JSON document
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_time ON messages (json_extract(value, '$.time'));
        CREATE INDEX IF NOT EXISTS idx_messages_read ON messages (json_extract(value, '$.read'));

        CREATE TABLE IF NOT EXISTS meta (
            key     TEXT PRIMARY KEY,
            value   TEXT NOT NULL       -- JSON scalar
        );
        ",
    )
}

/// Bring the schema up to [`DB_VERSION`]. Runs pending migrations in one
/// immediate transaction so two processes cannot migrate at the same time.
pub fn initialize_schema(conn: &mut Connection) -> Result<(), MessagingError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current: i64 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current >= DB_VERSION {
        return Ok(());
    }

    for version in current..DB_VERSION {
        let migration = MIGRATIONS.get(version as usize).ok_or_else(|| {
            MessagingError::Database(format!("No migration from schema version {}", version))
        })?;
        migration(&tx)?;
        info!("Migrated message store schema to version {}", version + 1);
    }

    tx.pragma_update(None, "user_version", DB_VERSION)?;
    tx.commit()?;
    Ok(())
}
