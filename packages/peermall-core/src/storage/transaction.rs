//! # Store Transactions
//!
//! [`StoreTxn`] is a view over one SQLite transaction that speaks in
//! object-store terms: records are JSON documents addressed by store name
//! and primary key, and every write keeps `index_entries` in step with
//! the record it belongs to.
//!
//! ```text
//! put("contents", {id: "c1", tags: ["a","b"], type: "post", ...})
//!
//!   records        (contents, c1) ─► {"id":"c1","tags":["a","b"],...}
//!   index_entries  (contents, by_tags,      "a",    c1)
//!                  (contents, by_tags,      "b",    c1)
//!                  (contents, by_type,      "post", c1)
//!                  (contents, by_createdAt, "2024-…", c1)
//! ```
//!
//! A transaction may touch any number of stores. It is committed by the
//! caller once the closure that received it returns `Ok`; an `Err` rolls
//! every write back.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::catalog::{Catalog, StoreMeta};
use super::key::{Direction, IndexKey, KeyRange, QueryOptions};
use crate::error::{is_constraint_violation, Error, Result};

/// Whether a transaction may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnMode {
    /// Deferred transaction, writes are rejected with [`Error::ReadOnly`]
    ReadOnly,
    /// Immediate transaction holding the write lock
    ReadWrite,
}

/// Object-store operations inside one SQLite transaction.
pub struct StoreTxn<'a> {
    tx: &'a Transaction<'a>,
    catalog: &'a Catalog,
    mode: TxnMode,
}

impl<'a> StoreTxn<'a> {
    pub(crate) fn new(tx: &'a Transaction<'a>, catalog: &'a Catalog, mode: TxnMode) -> Self {
        Self { tx, catalog, mode }
    }

    /// The transaction mode.
    pub fn mode(&self) -> TxnMode {
        self.mode
    }

    fn writable(&self, store: &str) -> Result<&'a StoreMeta> {
        let meta = self.catalog.store(store)?;
        if self.mode == TxnMode::ReadOnly {
            return Err(Error::ReadOnly(store.to_string()));
        }
        Ok(meta)
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Fetch one record. A missing key is `Ok(None)`.
    pub fn get(&self, store: &str, key: &str) -> Result<Option<Value>> {
        self.catalog.store(store)?;
        let raw: Option<String> = self
            .tx
            .query_row(
                "SELECT value FROM records WHERE store = ?1 AND key = ?2",
                params![store, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
    }

    /// Every record in the store, in key order.
    pub fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        self.query(store, &QueryOptions::new())
    }

    /// Records whose indexed field equals `value`. On a multi-entry index
    /// this matches records whose array field contains `value`.
    pub fn get_by_index(
        &self,
        store: &str,
        index: &str,
        value: impl Into<IndexKey>,
    ) -> Result<Vec<Value>> {
        self.query(
            store,
            &QueryOptions::new().index(index).range(KeyRange::only(value)),
        )
    }

    /// Cursor-style iteration over the primary key or an index.
    pub fn query(&self, store: &str, options: &QueryOptions) -> Result<Vec<Value>> {
        let meta = self.catalog.store(store)?;
        match &options.index {
            Some(index) => {
                meta.index(index)?;
                self.query_index(store, index, options)
            }
            None => self.query_primary(store, options),
        }
    }

    fn query_primary(&self, store: &str, options: &QueryOptions) -> Result<Vec<Value>> {
        let mut clauses = vec!["store = ?".to_string()];
        let mut bounds = Vec::new();
        if let Some(range) = &options.range {
            range.push_sql("key", &mut clauses, &mut bounds);
        }

        // Primary keys are unique, so the *Unique directions change nothing
        let order = if options.direction.is_reverse() {
            "DESC"
        } else {
            "ASC"
        };
        let mut sql = format!(
            "SELECT value FROM records WHERE {} ORDER BY key {order}",
            clauses.join(" AND ")
        );
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let params = std::iter::once(IndexKey::from(store)).chain(bounds);
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for raw in rows {
            records.push(serde_json::from_str(&raw?)?);
        }
        Ok(records)
    }

    fn query_index(&self, store: &str, index: &str, options: &QueryOptions) -> Result<Vec<Value>> {
        let mut clauses = vec!["e.store = ?".to_string(), "e.index_name = ?".to_string()];
        let mut bounds = Vec::new();
        if let Some(range) = &options.range {
            range.push_sql("e.value", &mut clauses, &mut bounds);
        }

        // Within one index value, records are visited in primary key order.
        // PrevUnique keeps the lowest key per value, so its keys stay ascending.
        let order = match options.direction {
            Direction::Next | Direction::NextUnique => "e.value ASC, e.key ASC",
            Direction::Prev => "e.value DESC, e.key DESC",
            Direction::PrevUnique => "e.value DESC, e.key ASC",
        };
        let unique = options.direction.is_unique();
        let mut sql = format!(
            "SELECT e.value, r.value FROM index_entries e
             JOIN records r ON r.store = e.store AND r.key = e.key
             WHERE {} ORDER BY {order}",
            clauses.join(" AND ")
        );
        if let (Some(limit), false) = (options.limit, unique) {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let params = [IndexKey::from(store), IndexKey::from(index)]
            .into_iter()
            .chain(bounds);
        let mut stmt = self.tx.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| {
            Ok((row.get::<_, SqlValue>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        let mut last_value: Option<IndexKey> = None;
        for row in rows {
            if options.limit.is_some_and(|limit| records.len() >= limit) {
                break;
            }
            let (value, raw) = row?;
            if unique {
                let value = IndexKey::from_sql(value);
                if value.is_some() && value == last_value {
                    continue;
                }
                last_value = value;
            }
            records.push(serde_json::from_str(&raw)?);
        }
        Ok(records)
    }

    /// Number of records in the store.
    pub fn count(&self, store: &str) -> Result<u64> {
        self.catalog.store(store)?;
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM records WHERE store = ?1",
            params![store],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Number of index entries equal to `value`.
    pub fn count_by_index(
        &self,
        store: &str,
        index: &str,
        value: impl Into<IndexKey>,
    ) -> Result<u64> {
        self.catalog.store(store)?.index(index)?;
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM index_entries WHERE store = ?1 AND index_name = ?2 AND value = ?3",
            params![store, index, value.into()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Insert a new record and return its key.
    ///
    /// Fails with [`Error::DuplicateKey`] if the key is taken.
    pub fn add(&self, store: &str, record: Value) -> Result<String> {
        let meta = self.writable(store)?;
        let key = meta.primary_key(&record)?;
        let raw = serde_json::to_string(&record)?;

        match self.tx.execute(
            "INSERT INTO records (store, key, value) VALUES (?1, ?2, ?3)",
            params![store, key, raw],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(Error::DuplicateKey {
                    store: store.to_string(),
                    key,
                })
            }
            Err(e) => return Err(e.into()),
        }

        self.write_index_entries(meta, &key, &record)?;
        tracing::debug!(store, key = %key, "Record added");
        Ok(key)
    }

    /// Insert or replace a record and return its key. The previous value
    /// is not merged.
    pub fn put(&self, store: &str, record: Value) -> Result<String> {
        let meta = self.writable(store)?;
        let key = meta.primary_key(&record)?;
        let raw = serde_json::to_string(&record)?;

        self.tx.execute(
            "INSERT INTO records (store, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (store, key) DO UPDATE SET value = excluded.value",
            params![store, key, raw],
        )?;
        self.tx.execute(
            "DELETE FROM index_entries WHERE store = ?1 AND key = ?2",
            params![store, key],
        )?;
        self.write_index_entries(meta, &key, &record)?;
        tracing::debug!(store, key = %key, "Record stored");
        Ok(key)
    }

    /// Delete a record. Returns `false` when there was nothing to delete.
    pub fn delete(&self, store: &str, key: &str) -> Result<bool> {
        self.writable(store)?;
        self.tx.execute(
            "DELETE FROM index_entries WHERE store = ?1 AND key = ?2",
            params![store, key],
        )?;
        let rows = self.tx.execute(
            "DELETE FROM records WHERE store = ?1 AND key = ?2",
            params![store, key],
        )?;
        Ok(rows > 0)
    }

    /// Delete every record in the store. Returns how many were removed.
    pub fn clear(&self, store: &str) -> Result<usize> {
        self.writable(store)?;
        self.tx
            .execute("DELETE FROM index_entries WHERE store = ?1", params![store])?;
        let rows = self
            .tx
            .execute("DELETE FROM records WHERE store = ?1", params![store])?;
        tracing::debug!(store, rows, "Store cleared");
        Ok(rows)
    }

    /// Add `delta` to an unsigned counter field and return the new value.
    ///
    /// A missing or non-numeric field counts as 0 and the result saturates
    /// at 0. Returns `Ok(None)` when the record does not exist.
    pub fn increment(&self, store: &str, key: &str, field: &str, delta: i64) -> Result<Option<u64>> {
        self.writable(store)?;
        let Some(mut record) = self.get(store, key)? else {
            return Ok(None);
        };

        let current = record.get(field).and_then(Value::as_u64).unwrap_or(0);
        let next = if delta >= 0 {
            current.saturating_add(delta.unsigned_abs())
        } else {
            current.saturating_sub(delta.unsigned_abs())
        };

        let Some(fields) = record.as_object_mut() else {
            return Err(Error::InvalidRecord(format!(
                "record '{key}' in store '{store}' is not an object"
            )));
        };
        fields.insert(field.to_string(), Value::from(next));
        self.put(store, record)?;
        Ok(Some(next))
    }

    fn write_index_entries(&self, meta: &StoreMeta, key: &str, record: &Value) -> Result<()> {
        if meta.indexes.is_empty() {
            return Ok(());
        }
        let mut stmt = self.tx.prepare_cached(
            "INSERT OR IGNORE INTO index_entries (store, index_name, value, key)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for index in meta.indexes.values() {
            for value in index.values_for(record) {
                stmt.execute(params![meta.name, index.name, value, key])?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // TYPED WRAPPERS
    // ========================================================================

    /// [`get`](Self::get) deserialized into `T`.
    pub fn get_typed<T: DeserializeOwned>(&self, store: &str, key: &str) -> Result<Option<T>> {
        self.get(store, key)?
            .map(|value| serde_json::from_value(value).map_err(Error::from))
            .transpose()
    }

    /// [`get_all`](Self::get_all) deserialized into `T`.
    pub fn get_all_typed<T: DeserializeOwned>(&self, store: &str) -> Result<Vec<T>> {
        decode_all(self.get_all(store)?)
    }

    /// [`get_by_index`](Self::get_by_index) deserialized into `T`.
    pub fn get_by_index_typed<T: DeserializeOwned>(
        &self,
        store: &str,
        index: &str,
        value: impl Into<IndexKey>,
    ) -> Result<Vec<T>> {
        decode_all(self.get_by_index(store, index, value)?)
    }

    /// [`query`](Self::query) deserialized into `T`.
    pub fn query_typed<T: DeserializeOwned>(
        &self,
        store: &str,
        options: &QueryOptions,
    ) -> Result<Vec<T>> {
        decode_all(self.query(store, options)?)
    }

    /// [`add`](Self::add) from any serializable record.
    pub fn add_typed<T: Serialize>(&self, store: &str, record: &T) -> Result<String> {
        self.add(store, serde_json::to_value(record)?)
    }

    /// [`put`](Self::put) from any serializable record.
    pub fn put_typed<T: Serialize>(&self, store: &str, record: &T) -> Result<String> {
        self.put(store, serde_json::to_value(record)?)
    }
}

pub(crate) fn decode_all<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(Error::from))
        .collect()
}
