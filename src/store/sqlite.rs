//! `SQLite` document store.
//!
//! All collections share one `documents` table. Bodies are JSON text and
//! filters compile to `json_extract` predicates. Uniqueness is enforced by
//! `UNIQUE(collection, guard_key)`; `SQLite` treats NULL keys as distinct, so
//! documents without a guard key never collide.

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior,
};
use serde_json::Value;
use tracing::debug;

use super::collection::{Collections, DocumentStore};
use super::document::{DocId, RawDocument};
use super::error::{Result, StoreError};
use super::filter::Filter;

/// `SQLite`-based document store.
///
/// Thread-safe wrapper around a `SQLite` connection. Every operation holds
/// the connection lock, and [`DocumentStore::atomically`] additionally wraps
/// its work in an immediate transaction so other processes sharing the file
/// are serialized as well.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Creates an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Sets how long a write waits on a database locked by another process.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or the pragma fails.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.lock()?.busy_timeout(timeout)?;
        Ok(())
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                body TEXT NOT NULL,
                guard_key TEXT,
                created_at INTEGER NOT NULL,
                UNIQUE (collection, guard_key)
            );

            CREATE INDEX IF NOT EXISTS documents_by_collection
                ON documents (collection, id);
            ",
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(format!("Failed to acquire database lock: {e}")))
    }
}

impl Collections for SqliteStore {
    fn create_one(
        &self,
        collection: &str,
        body: &Value,
        guard_key: Option<&str>,
    ) -> Result<RawDocument> {
        let conn = self.lock()?;
        Session { conn: &conn }.create_one(collection, body, guard_key)
    }

    fn read_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        let conn = self.lock()?;
        Session { conn: &conn }.read_one(collection, filter)
    }

    fn read_many(&self, collection: &str, filter: &Filter) -> Result<Vec<RawDocument>> {
        let conn = self.lock()?;
        Session { conn: &conn }.read_many(collection, filter)
    }

    fn pop_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        let conn = self.lock()?;
        Session { conn: &conn }.pop_one(collection, filter)
    }
}

impl DocumentStore for SqliteStore {
    fn atomically<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn Collections) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;

        let outcome = work(&Session { conn: &tx });

        match outcome {
            Ok(value) => {
                tx.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(err) => {
                debug!("rolling back document transaction");
                // Dropping the transaction rolls it back.
                drop(tx);
                Err(err)
            }
        }
    }
}

/// Collection operations against a borrowed connection or transaction.
struct Session<'c> {
    conn: &'c Connection,
}

impl Session<'_> {
    fn select(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<RawDocument>> {
        let mut bound = vec![SqlValue::Text(collection.to_string())];
        let predicate = filter.to_sql(&mut bound);
        let mut sql = format!(
            "SELECT id, created_at, body FROM documents WHERE collection = ? AND {predicate} ORDER BY id"
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bound), read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(parse_row).collect()
    }
}

impl Collections for Session<'_> {
    fn create_one(
        &self,
        collection: &str,
        body: &Value,
        guard_key: Option<&str>,
    ) -> Result<RawDocument> {
        let created_at = chrono::Utc::now().timestamp();
        let text = serde_json::to_string(body)?;

        let inserted = self.conn.execute(
            r"
            INSERT INTO documents (collection, body, guard_key, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![collection, &text, guard_key, created_at],
        );

        match inserted {
            Ok(_) => Ok(RawDocument {
                id: DocId(self.conn.last_insert_rowid()),
                created_at,
                body: body.clone(),
            }),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Duplicate {
                    collection: collection.to_string(),
                    key: guard_key.unwrap_or_default().to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        Ok(self.select(collection, filter, Some(1))?.into_iter().next())
    }

    fn read_many(&self, collection: &str, filter: &Filter) -> Result<Vec<RawDocument>> {
        self.select(collection, filter, None)
    }

    fn pop_one(&self, collection: &str, filter: &Filter) -> Result<Option<RawDocument>> {
        let mut bound = vec![SqlValue::Text(collection.to_string())];
        let predicate = filter.to_sql(&mut bound);
        let sql = format!(
            r"
            DELETE FROM documents
            WHERE id = (
                SELECT id FROM documents
                WHERE collection = ? AND {predicate}
                ORDER BY id
                LIMIT 1
            )
            RETURNING id, created_at, body
            "
        );

        let row = self
            .conn
            .query_row(&sql, params_from_iter(bound), read_row)
            .optional()?;

        row.map(parse_row).transpose()
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(i64, i64, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn parse_row((id, created_at, body): (i64, i64, String)) -> Result<RawDocument> {
    let body = serde_json::from_str(&body)
        .map_err(|e| StoreError::InvalidData(format!("Invalid body for document {id}: {e}")))?;
    Ok(RawDocument {
        id: DocId(id),
        created_at,
        body,
    })
}
