#![forbid(unsafe_code)]

mod cache;
mod categories;
mod error;
mod mutations;
mod options;
mod requests;
mod support;
mod tree;

pub use cache::*;
pub use categories::ClosureMismatch;
pub use error::StoreError;
pub use options::*;
pub use requests::*;
pub use tree::CategoryTree;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use support::migrate_sqlite_schema;

/// SQLite-backed category store and closure index.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    options: StoreOptions,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(StoreOptions::new(storage_dir))
    }

    pub fn open_with(options: StoreOptions) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&options.storage_dir)?;

        let conn = Connection::open(options.db_path())?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        migrate_sqlite_schema(&conn)?;

        Ok(Self { conn, options })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.options.storage_dir
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // IMMEDIATE takes the write lock at BEGIN, so validation reads and the
    // closure rewrite of concurrent writers never interleave.
    fn begin_write(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
