//! # Storage Module
//!
//! Local object-store database for PeerMall records.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  RecordStore (async)                                            │   │
//! │  │  ───────────────────                                             │   │
//! │  │  add / get / get_all / get_by_index / update / remove          │   │
//! │  │  query / clear / count / increment                             │   │
//! │  │  read_transaction / write_transaction                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  StoreTxn (sync, one SQLite transaction, any number of stores) │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite Database                                                │   │
//! │  │  ───────────────                                                 │   │
//! │  │  • records        - JSON document per (store, key)             │   │
//! │  │  • index_entries  - (store, index, value, key)                 │   │
//! │  │  • object_stores / store_indexes - persisted catalogue         │   │
//! │  │  • schema_version                                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Indexes
//!
//! An index maps the value at a record's key path to the record's primary
//! key. Multi-entry indexes over arrays store one entry per distinct
//! element, so `get_by_index("contents", "by_tags", "a")` finds every
//! record whose `tags` contains `"a"`. Only strings and numbers are
//! indexable.

mod catalog;
mod database;
mod key;
mod record_store;
pub mod schema;
mod transaction;

pub use database::{BlockedCallback, Database, DatabaseConfig};
pub use key::{Direction, IndexKey, KeyRange, QueryOptions, RangeBound};
pub use record_store::RecordStore;
pub use schema::{DATABASE_NAME, DATABASE_VERSION};
pub use transaction::{StoreTxn, TxnMode};
