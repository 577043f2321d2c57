//! # Error Handling
//!
//! Error types for the PeerMall content store.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── StorageUnavailable    - Database cannot be opened             │
//! │  │   ├── Blocked               - Upgrade blocked by another connection │
//! │  │   ├── VersionMismatch       - On-disk schema is newer than ours     │
//! │  │   ├── DatabaseError         - Any other engine failure              │
//! │  │   ├── Timeout               - Operation exceeded its time budget    │
//! │  │   └── ReadOnly              - Write attempted in a read transaction │
//! │  │                                                                      │
//! │  ├── Store Errors                                                      │
//! │  │   ├── UnknownStore          - No such object store                  │
//! │  │   ├── UnknownIndex          - No such index on the store            │
//! │  │   ├── DuplicateKey          - Insert collided with an existing key  │
//! │  │   ├── NotFound              - A required parent record is missing   │
//! │  │   └── InvalidRecord         - Record failed boundary validation     │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── SerializationError    - JSON encode/decode failed             │
//! │      └── Internal              - Should not happen                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing record on a plain read is not an error: `get` returns `None`,
//! `update_*` returns `None` and `delete_*` returns `false`.

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the content store
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// The database could not be opened at all
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A schema upgrade could not take the write lock
    #[error("Database upgrade to version {version} is blocked by another open connection. Close other sessions and retry.")]
    Blocked {
        /// The version the upgrade was trying to reach
        version: u32,
    },

    /// The on-disk schema is newer than this build understands
    #[error("Database version {found} is newer than supported version {supported}")]
    VersionMismatch {
        /// Version stored in the database
        found: u32,
        /// Highest version this build knows
        supported: u32,
    },

    /// Database engine error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A write was attempted inside a read-only transaction
    #[error("Cannot write to store '{0}' in a read-only transaction")]
    ReadOnly(String),

    // ========================================================================
    // Store Errors (500-599)
    // ========================================================================

    /// Store name is not part of the schema
    #[error("Unknown object store: {0}")]
    UnknownStore(String),

    /// Index name is not defined on the store
    #[error("Unknown index '{index}' on store '{store}'")]
    UnknownIndex {
        /// Store that was queried
        store: String,
        /// Index that was requested
        index: String,
    },

    /// Primary key already exists in the store
    #[error("Key '{key}' already exists in store '{store}'")]
    DuplicateKey {
        /// Store that rejected the insert
        store: String,
        /// The colliding key
        key: String,
    },

    /// A record that the operation depends on does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Record failed validation at the storage boundary
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric error code, grouped by category:
    /// - 400-499: Storage
    /// - 500-599: Store
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Storage (400-499)
            Error::StorageUnavailable(_) => 400,
            Error::Blocked { .. } => 401,
            Error::VersionMismatch { .. } => 402,
            Error::DatabaseError(_) => 403,
            Error::Timeout(_) => 404,
            Error::ReadOnly(_) => 405,

            // Store (500-599)
            Error::UnknownStore(_) => 500,
            Error::UnknownIndex { .. } => 501,
            Error::DuplicateKey { .. } => 502,
            Error::NotFound(_) => 503,
            Error::InvalidRecord(_) => 504,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
            Error::Internal(_) => 901,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying
    /// or by user action (closing another session, freeing disk space).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Blocked { .. } | Error::Timeout(_) | Error::StorageUnavailable(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

/// True when a rusqlite error is a uniqueness/primary-key constraint failure.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// True when a rusqlite error means another connection holds the lock.
pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

// ============================================================================
// TESTS
// ============================================================================
