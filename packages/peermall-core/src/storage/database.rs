//! # Database
//!
//! Versioned SQLite database handle.
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │ Domain services │  Content / PeerSpace / Forum / User               │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   RecordStore   │  add / get / put / query / increment ...          │
//! │  └────────┬────────┘                                                   │
//! │           │  closure over a StoreTxn                                    │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    Database     │  - Schema upgrade on open                         │
//! │  │   (this file)   │  - One transaction per call                       │
//! │  │                 │  - spawn_blocking + timeout                       │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  Storage                                          │
//! │  │   (file or      │  - In-memory for tests                            │
//! │  │    memory)      │  - File for production                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection is held for the life of the `Database` and guarded by a
//! mutex. Each call takes the lock for exactly one transaction, so calls
//! against one database are serialized and a failed call never leaves a
//! transaction open behind it. A call that times out while still queued
//! for the lock is dropped once it gets there and never commits.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::catalog::Catalog;
use super::schema::{self, IndexDef, SchemaStep};
use super::transaction::{StoreTxn, TxnMode};
use crate::error::{is_busy, Error, Result};

/// Called when a schema upgrade cannot get the write lock, with the
/// version found on disk (0 for a fresh file) and the target version.
pub type BlockedCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Path to the database file, `None` for an in-memory database
    pub path: Option<PathBuf>,
    /// Upper bound on every store operation
    pub operation_timeout: Duration,
    /// How long SQLite waits on a locked database before giving up
    pub busy_timeout: Duration,
    /// Notified when a schema upgrade is blocked by another connection
    pub on_blocked: Option<BlockedCallback>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            operation_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(2),
            on_blocked: None,
        }
    }
}

impl DatabaseConfig {
    /// An on-disk database at `path` with default timeouts.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("path", &self.path)
            .field("operation_timeout", &self.operation_timeout)
            .field("busy_timeout", &self.busy_timeout)
            .field("on_blocked", &self.on_blocked.is_some())
            .finish()
    }
}

/// The main database handle
///
/// Wraps one SQLite connection and the store catalogue read from it.
pub struct Database {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
    catalog: Arc<Catalog>,
    version: u32,
    path: Option<PathBuf>,
    operation_timeout: Duration,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("version", &self.version)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open or create the database and bring its schema up to
    /// [`DATABASE_VERSION`](schema::DATABASE_VERSION).
    pub async fn open(config: DatabaseConfig) -> Result<Self> {
        Self::open_with_version(config, schema::DATABASE_VERSION).await
    }

    /// Open at an explicit schema version. Used to build older databases in
    /// upgrade tests.
    pub(crate) async fn open_with_version(config: DatabaseConfig, target: u32) -> Result<Self> {
        let task = tokio::task::spawn_blocking(move || -> Result<(Connection, Catalog, u32, DatabaseConfig)> {
            let mut conn = match &config.path {
                Some(p) => Connection::open(p).map_err(|e| {
                    Error::StorageUnavailable(format!("Failed to open {}: {}", p.display(), e))
                })?,
                None => Connection::open_in_memory().map_err(|e| {
                    Error::StorageUnavailable(format!("Failed to create in-memory database: {}", e))
                })?,
            };
            conn.busy_timeout(config.busy_timeout).map_err(|e| {
                Error::StorageUnavailable(format!("Failed to configure database: {}", e))
            })?;

            let version = init_schema(&mut conn, target, config.on_blocked.as_ref())?;
            let catalog = Catalog::load(&conn)?;
            Ok((conn, catalog, version, config))
        });
        let (conn, catalog, version, config) = task
            .await
            .map_err(|e| Error::Internal(format!("open task failed: {e}")))??;

        tracing::debug!(
            name = schema::DATABASE_NAME,
            version,
            stores = catalog.store_names().len(),
            "Database opened"
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            catalog: Arc::new(catalog),
            version,
            path: config.path,
            operation_timeout: config.operation_timeout,
        })
    }

    /// Schema version of the open database.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// File backing the database, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Names of every object store, sorted.
    pub fn store_names(&self) -> Vec<String> {
        self.catalog.store_names()
    }

    /// Index names of one store, sorted.
    pub fn index_names(&self, store: &str) -> Result<Vec<String>> {
        self.catalog.index_names(store)
    }

    /// Run `f` in a read-only transaction.
    pub async fn read<T, F>(&self, label: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreTxn<'_>) -> Result<T> + Send + 'static,
    {
        self.run(label, TxnMode::ReadOnly, f).await
    }

    /// Run `f` in a read-write transaction. Everything `f` writes commits
    /// together, or not at all if it returns an error.
    pub async fn write<T, F>(&self, label: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreTxn<'_>) -> Result<T> + Send + 'static,
    {
        self.run(label, TxnMode::ReadWrite, f).await
    }

    async fn run<T, F>(&self, label: &str, mode: TxnMode, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreTxn<'_>) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let catalog = Arc::clone(&self.catalog);
        let abandoned = Arc::new(AtomicBool::new(false));
        let abandoned_in_task = Arc::clone(&abandoned);
        let task_label = label.to_string();

        let task = tokio::task::spawn_blocking(move || -> Result<T> {
            let mut conn = conn.lock();
            // Already reported to the caller as timed out
            if abandoned_in_task.load(Ordering::SeqCst) {
                return Err(Error::Timeout(format!(
                    "{task_label} abandoned before it started"
                )));
            }
            let behavior = match mode {
                TxnMode::ReadOnly => TransactionBehavior::Deferred,
                TxnMode::ReadWrite => TransactionBehavior::Immediate,
            };
            let tx = conn.transaction_with_behavior(behavior)?;
            let out = f(&StoreTxn::new(&tx, &catalog, mode))?;
            tx.commit()?;
            Ok(out)
        });

        match tokio::time::timeout(self.operation_timeout, task).await {
            Ok(Ok(result)) => {
                #[cfg(feature = "verbose-logging")]
                tracing::trace!(label, ?mode, ok = result.is_ok(), "Store transaction finished");
                result
            }
            Ok(Err(e)) => Err(Error::Internal(format!("{label}: store task failed: {e}"))),
            Err(_) => {
                abandoned.store(true, Ordering::SeqCst);
                tracing::warn!(
                    label,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Store operation timed out"
                );
                Err(Error::Timeout(format!(
                    "{label} exceeded {} ms",
                    self.operation_timeout.as_millis()
                )))
            }
        }
    }
}

// ============================================================================
// SCHEMA UPGRADE
// ============================================================================

/// Version recorded on disk, `None` for a fresh database.
fn stored_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let has_table: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(None);
    }
    conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })
    .optional()
}

/// Bring the schema up to `target` and return the resulting version.
fn init_schema(
    conn: &mut Connection,
    target: u32,
    on_blocked: Option<&BlockedCallback>,
) -> Result<u32> {
    let blocked = |found: u32| {
        tracing::warn!(
            found,
            target,
            "Database upgrade blocked by another connection; close other sessions and retry"
        );
        if let Some(callback) = on_blocked {
            callback(found, target);
        }
        Error::Blocked { version: target }
    };

    let stored = match stored_version(conn) {
        Ok(stored) => stored,
        Err(e) if is_busy(&e) => return Err(blocked(0)),
        Err(e) => {
            return Err(Error::DatabaseError(format!(
                "Failed to read schema version: {}",
                e
            )))
        }
    };
    match stored {
        Some(v) if v > target => {
            return Err(Error::VersionMismatch {
                found: v,
                supported: target,
            })
        }
        Some(v) if v == target => {
            tracing::debug!("Database schema version: {}", v);
            return Ok(v);
        }
        _ => {}
    }

    let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
        Ok(tx) => tx,
        Err(e) if is_busy(&e) => return Err(blocked(stored.unwrap_or(0))),
        Err(e) => return Err(e.into()),
    };

    tx.execute_batch(schema::CREATE_TABLES)
        .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

    // Another connection may have upgraded while we waited for the lock
    let current: Option<u32> = tx
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    let from = current.unwrap_or(0);
    if from > target {
        return Err(Error::VersionMismatch {
            found: from,
            supported: target,
        });
    }

    if from < target {
        match current {
            None => tracing::info!("Creating database schema (version {})", target),
            Some(v) => tracing::info!(
                "Database schema version {} is older than current {}, running upgrades",
                v,
                target
            ),
        }

        for step in schema::steps_between(from, target) {
            apply_step(&tx, step)?;
        }

        tx.execute("DELETE FROM schema_version", [])?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![target],
        )?;
    }

    match tx.commit() {
        Ok(()) => {}
        Err(e) if is_busy(&e) => return Err(blocked(from)),
        Err(e) => return Err(e.into()),
    }

    if from < target {
        tracing::info!("Database schema ready (now at version {})", target);
    }
    Ok(target)
}

fn apply_step(tx: &Connection, step: &SchemaStep) -> Result<()> {
    tracing::info!("Running upgrade to v{}", step.version);
    let now = crate::time::to_iso(&crate::time::now());

    for store in step.stores {
        let created = tx.execute(
            "INSERT OR IGNORE INTO object_stores (name, key_path, created_at) VALUES (?1, ?2, ?3)",
            params![store.name, store.key_path, now],
        )?;
        if created > 0 {
            tracing::debug!(store = store.name, "Object store created");
        }
        for index in store.indexes {
            create_index(tx, store.name, index)?;
        }
    }
    for (store, index) in step.indexes {
        create_index(tx, store, index)?;
    }
    Ok(())
}

/// Declare an index and back-fill it from the records already in the store.
fn create_index(tx: &Connection, store: &str, index: &IndexDef) -> Result<()> {
    let created = tx.execute(
        "INSERT OR IGNORE INTO store_indexes (store, name, key_path, multi_entry)
         VALUES (?1, ?2, ?3, ?4)",
        params![store, index.name, index.key_path, index.multi_entry],
    )?;
    if created == 0 {
        return Ok(());
    }

    let meta = super::catalog::IndexMeta {
        name: index.name.to_string(),
        key_path: index.key_path.to_string(),
        multi_entry: index.multi_entry,
    };

    let mut select = tx.prepare("SELECT key, value FROM records WHERE store = ?1")?;
    let rows = select.query_map(params![store], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut insert = tx.prepare(
        "INSERT OR IGNORE INTO index_entries (store, index_name, value, key) VALUES (?1, ?2, ?3, ?4)",
    )?;

    let mut backfilled = 0usize;
    for row in rows {
        let (key, raw) = row?;
        let record: serde_json::Value = serde_json::from_str(&raw)?;
        for value in meta.values_for(&record) {
            insert.execute(params![store, index.name, value, key])?;
        }
        backfilled += 1;
    }

    tracing::debug!(store, index = index.name, backfilled, "Index created");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
