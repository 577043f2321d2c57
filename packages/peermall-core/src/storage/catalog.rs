//! In-memory view of the persisted store/index catalogue, and the rules for
//! pulling primary keys and index values out of JSON records.

use std::collections::{BTreeMap, HashMap};

use rusqlite::Connection;
use serde_json::Value;

use super::key::IndexKey;
use crate::error::{Error, Result};

/// A secondary index on a store.
#[derive(Debug, Clone)]
pub(crate) struct IndexMeta {
    pub name: String,
    pub key_path: String,
    pub multi_entry: bool,
}

impl IndexMeta {
    /// Values this record contributes to the index.
    ///
    /// A plain index yields at most one value. A multi-entry index over an
    /// array yields each distinct indexable element; over a scalar it
    /// behaves like a plain index.
    pub fn values_for(&self, record: &Value) -> Vec<IndexKey> {
        let Some(field) = resolve_path(record, &self.key_path) else {
            return Vec::new();
        };
        match field {
            Value::Array(items) if self.multi_entry => {
                let mut keys: Vec<IndexKey> = Vec::with_capacity(items.len());
                for key in items.iter().filter_map(IndexKey::from_json) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                keys
            }
            other => IndexKey::from_json(other).into_iter().collect(),
        }
    }
}

/// An object store and its indexes.
#[derive(Debug, Clone)]
pub(crate) struct StoreMeta {
    pub name: String,
    pub key_path: String,
    pub indexes: BTreeMap<String, IndexMeta>,
}

impl StoreMeta {
    /// Extract the primary key from a record.
    pub fn primary_key(&self, record: &Value) -> Result<String> {
        match resolve_path(record, &self.key_path) {
            Some(Value::String(key)) if !key.is_empty() => Ok(key.clone()),
            Some(_) => Err(Error::InvalidRecord(format!(
                "'{}' in store '{}' must be a non-empty string",
                self.key_path, self.name
            ))),
            None => Err(Error::InvalidRecord(format!(
                "record for store '{}' is missing its key '{}'",
                self.name, self.key_path
            ))),
        }
    }

    pub fn index(&self, name: &str) -> Result<&IndexMeta> {
        self.indexes.get(name).ok_or_else(|| Error::UnknownIndex {
            store: self.name.clone(),
            index: name.to_string(),
        })
    }
}

/// Every store known to an open database.
#[derive(Debug, Clone, Default)]
pub(crate) struct Catalog {
    stores: HashMap<String, StoreMeta>,
}

impl Catalog {
    /// Read the catalogue tables.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stores = HashMap::new();

        let mut stmt = conn.prepare("SELECT name, key_path FROM object_stores")?;
        let rows = stmt.query_map([], |row| {
            Ok(StoreMeta {
                name: row.get(0)?,
                key_path: row.get(1)?,
                indexes: BTreeMap::new(),
            })
        })?;
        for store in rows {
            let store = store?;
            stores.insert(store.name.clone(), store);
        }

        let mut stmt =
            conn.prepare("SELECT store, name, key_path, multi_entry FROM store_indexes")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                IndexMeta {
                    name: row.get(1)?,
                    key_path: row.get(2)?,
                    multi_entry: row.get::<_, i64>(3)? != 0,
                },
            ))
        })?;
        for entry in rows {
            let (store, index) = entry?;
            if let Some(meta) = stores.get_mut(&store) {
                meta.indexes.insert(index.name.clone(), index);
            }
        }

        Ok(Self { stores })
    }

    pub fn store(&self, name: &str) -> Result<&StoreMeta> {
        self.stores
            .get(name)
            .ok_or_else(|| Error::UnknownStore(name.to_string()))
    }

    /// Store names, sorted.
    pub fn store_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Index names of a store, sorted.
    pub fn index_names(&self, store: &str) -> Result<Vec<String>> {
        Ok(self.store(store)?.indexes.keys().cloned().collect())
    }
}

/// Follow a dotted path (`settings.theme`) into a JSON value.
pub(crate) fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}
