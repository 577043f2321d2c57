//! # Record Store
//!
//! Async object-store API over a shared [`Database`].
//!
//! Every method is one transaction: reads run deferred, writes take the
//! write lock up front. Callers that need several operations to land
//! together use [`RecordStore::write_transaction`] and work with the
//! [`StoreTxn`] directly.
//!
//! ```ignore
//! let store = RecordStore::new(db);
//! store.add("peerSpaces", json!({ "address": "peer-1", "title": "Shop" })).await?;
//! let shop = store.get("peerSpaces", "peer-1").await?;
//! let tagged = store.get_by_index("contents", "by_tags", "handmade").await?;
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::database::Database;
use super::key::{IndexKey, QueryOptions};
use super::transaction::{decode_all, StoreTxn};
use crate::error::{Error, Result};

/// Generic async CRUD over any named store.
#[derive(Debug, Clone)]
pub struct RecordStore {
    db: Arc<Database>,
}

impl RecordStore {
    /// Create a store API over an open database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Insert a new record and return its primary key.
    pub async fn add(&self, store: &str, record: Value) -> Result<String> {
        let name = store.to_string();
        self.db
            .write(&format!("add {store}"), move |txn| txn.add(&name, record))
            .await
    }

    /// Fetch one record by primary key.
    pub async fn get(&self, store: &str, key: &str) -> Result<Option<Value>> {
        let (name, key) = (store.to_string(), key.to_string());
        self.db
            .read(&format!("get {store}"), move |txn| txn.get(&name, &key))
            .await
    }

    /// Every record in key order.
    pub async fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        let name = store.to_string();
        self.db
            .read(&format!("get_all {store}"), move |txn| txn.get_all(&name))
            .await
    }

    /// Records whose indexed field equals `value`.
    pub async fn get_by_index(
        &self,
        store: &str,
        index: &str,
        value: impl Into<IndexKey>,
    ) -> Result<Vec<Value>> {
        let (name, index_name, value) = (store.to_string(), index.to_string(), value.into());
        self.db
            .read(&format!("get_by_index {store}.{index}"), move |txn| {
                txn.get_by_index(&name, &index_name, value)
            })
            .await
    }

    /// Insert or replace a record (no merging) and return its key.
    pub async fn update(&self, store: &str, record: Value) -> Result<String> {
        let name = store.to_string();
        self.db
            .write(&format!("update {store}"), move |txn| txn.put(&name, record))
            .await
    }

    /// Delete a record. Deleting a missing key is not an error.
    pub async fn remove(&self, store: &str, key: &str) -> Result<bool> {
        let (name, key) = (store.to_string(), key.to_string());
        self.db
            .write(&format!("remove {store}"), move |txn| txn.delete(&name, &key))
            .await
    }

    /// Cursor-style query over the primary key or an index.
    pub async fn query(&self, store: &str, options: QueryOptions) -> Result<Vec<Value>> {
        let name = store.to_string();
        self.db
            .read(&format!("query {store}"), move |txn| txn.query(&name, &options))
            .await
    }

    /// Delete every record in the store.
    pub async fn clear(&self, store: &str) -> Result<usize> {
        let name = store.to_string();
        self.db
            .write(&format!("clear {store}"), move |txn| txn.clear(&name))
            .await
    }

    /// Number of records in the store.
    pub async fn count(&self, store: &str) -> Result<u64> {
        let name = store.to_string();
        self.db
            .read(&format!("count {store}"), move |txn| txn.count(&name))
            .await
    }

    /// Atomically add `delta` to an unsigned counter field, saturating at 0.
    /// Returns `None` when the record does not exist.
    pub async fn increment(
        &self,
        store: &str,
        key: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<u64>> {
        let (name, key, field_name) = (store.to_string(), key.to_string(), field.to_string());
        self.db
            .write(&format!("increment {store}.{field}"), move |txn| {
                txn.increment(&name, &key, &field_name, delta)
            })
            .await
    }

    /// Run several reads against one consistent snapshot.
    pub async fn read_transaction<T, F>(&self, label: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreTxn<'_>) -> Result<T> + Send + 'static,
    {
        self.db.read(label, f).await
    }

    /// Run several writes, across any stores, atomically.
    pub async fn write_transaction<T, F>(&self, label: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&StoreTxn<'_>) -> Result<T> + Send + 'static,
    {
        self.db.write(label, f).await
    }

    // ========================================================================
    // TYPED WRAPPERS
    // ========================================================================

    /// [`add`](Self::add) from any serializable record.
    pub async fn add_typed<T: Serialize>(&self, store: &str, record: &T) -> Result<String> {
        self.add(store, serde_json::to_value(record)?).await
    }

    /// [`get`](Self::get) deserialized into `T`.
    pub async fn get_typed<T>(&self, store: &str, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.get(store, key)
            .await?
            .map(|value| serde_json::from_value(value).map_err(Error::from))
            .transpose()
    }

    /// [`get_all`](Self::get_all) deserialized into `T`.
    pub async fn get_all_typed<T: DeserializeOwned>(&self, store: &str) -> Result<Vec<T>> {
        decode_all(self.get_all(store).await?)
    }

    /// [`get_by_index`](Self::get_by_index) deserialized into `T`.
    pub async fn get_by_index_typed<T: DeserializeOwned>(
        &self,
        store: &str,
        index: &str,
        value: impl Into<IndexKey>,
    ) -> Result<Vec<T>> {
        decode_all(self.get_by_index(store, index, value).await?)
    }

    /// [`update`](Self::update) from any serializable record.
    pub async fn update_typed<T: Serialize>(&self, store: &str, record: &T) -> Result<String> {
        self.update(store, serde_json::to_value(record)?).await
    }

    /// [`query`](Self::query) deserialized into `T`.
    pub async fn query_typed<T: DeserializeOwned>(
        &self,
        store: &str,
        options: QueryOptions,
    ) -> Result<Vec<T>> {
        decode_all(self.query(store, options).await?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
