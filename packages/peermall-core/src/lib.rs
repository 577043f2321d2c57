//! # PeerMall Core
//!
//! The local content store behind the PeerMall social-commerce platform:
//! peer spaces, their content, forums and user profiles, kept in one
//! embedded database with object-store semantics.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PEERMALL CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │ PeerSpace   │  │  Content    │  │   Forum     │  │    User      │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Spaces    │  │ - Items     │  │ - Taxonomy  │  │ - Profiles   │   │
//! │  │ - Follows   │  │ - Tags      │  │ - Posts     │  │ - Email      │   │
//! │  │ - Settings  │  │ - Counters  │  │ - Comments  │  │   lookup     │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴────────┬───────┴────────────────┘           │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        Storage                                   │  │
//! │  │                                                                  │  │
//! │  │  RecordStore ──► StoreTxn ──► Database (SQLite, versioned)      │  │
//! │  │  object stores, secondary indexes, key ranges, cursors          │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`storage`] - Database handle, schema upgrades and the generic record store
//! - [`peer_space`] - Peer spaces (storefronts) and their settings
//! - [`content`] - Content items attached to peer spaces
//! - [`forum`] - Planets, channels, forums, posts and comments
//! - [`user`] - Local user profiles
//!
//! ## Usage
//!
//! ```no_run
//! use peermall_core::{PeerMall, DatabaseConfig};
//! use peermall_core::peer_space::NewPeerSpace;
//!
//! # async fn demo() -> peermall_core::Result<()> {
//! let mall = PeerMall::open(DatabaseConfig::at("peermall.db")).await?;
//! let space = mall.peer_spaces().create_peer_space(NewPeerSpace::new("peer-1", "My Shop")).await?;
//! println!("{}", space.address);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod content;
pub mod error;
pub mod forum;
pub mod id;
pub mod peer_space;
pub mod storage;
pub mod time;
pub mod user;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use content::{Content, ContentKind, ContentService, ContentType, NewContent};
pub use error::{Error, Result};
pub use forum::ForumService;
pub use peer_space::{NewPeerSpace, PeerSpace, PeerSpaceService};
pub use storage::{Database, DatabaseConfig, RecordStore, DATABASE_NAME, DATABASE_VERSION};
pub use user::UserService;

use std::sync::Arc;

// ============================================================================
// FACADE
// ============================================================================

/// One open store and the services built on it.
///
/// Every service shares the same [`Database`]; cloning a `PeerMall` is
/// cheap and yields handles onto the same store.
#[derive(Debug, Clone)]
pub struct PeerMall {
    db: Arc<Database>,
    contents: ContentService,
    peer_spaces: PeerSpaceService,
    forums: ForumService,
    users: UserService,
}

impl PeerMall {
    /// Open (and if needed upgrade) the database, then build the services.
    pub async fn open(config: DatabaseConfig) -> Result<Self> {
        let db = Arc::new(Database::open(config).await?);
        tracing::info!(
            name = DATABASE_NAME,
            version = db.version(),
            "PeerMall store ready"
        );
        Ok(Self::with_database(db))
    }

    /// Build the services over an already open database.
    pub fn with_database(db: Arc<Database>) -> Self {
        Self {
            contents: ContentService::new(db.clone()),
            peer_spaces: PeerSpaceService::new(db.clone()),
            forums: ForumService::new(db.clone()),
            users: UserService::new(db.clone()),
            db,
        }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Content items.
    pub fn contents(&self) -> &ContentService {
        &self.contents
    }

    /// Peer spaces.
    pub fn peer_spaces(&self) -> &PeerSpaceService {
        &self.peer_spaces
    }

    /// Forums, posts and comments.
    pub fn forums(&self) -> &ForumService {
        &self.forums
    }

    /// User profiles.
    pub fn users(&self) -> &UserService {
        &self.users
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of PeerMall Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        schema_version: DATABASE_VERSION,
        target: std::env::consts::OS,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Schema version this build creates and understands
    pub schema_version: u32,
    /// Target operating system
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
        assert_eq!(info.schema_version, DATABASE_VERSION);
    }

    #[tokio::test]
    async fn test_services_share_one_database() {
        let mall = PeerMall::open(DatabaseConfig::default()).await.unwrap();
        mall.peer_spaces()
            .create_peer_space(NewPeerSpace::new("peer-1", "Shop"))
            .await
            .unwrap();

        let clone = mall.clone();
        assert!(Arc::ptr_eq(mall.database(), clone.database()));
        assert!(clone
            .peer_spaces()
            .get_peer_space("peer-1")
            .await
            .unwrap()
            .is_some());
    }
}
