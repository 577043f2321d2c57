//! # Database Schema
//!
//! Object-store catalogue for the PeerMall database, plus the SQL backing it.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         OBJECT STORES                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  v1  peerSpaces (address)    contents (id)          users (id)          │
//! │      └ by_owner              ├ by_peerSpace         └ by_email          │
//! │                              └ by_type                                  │
//! │                                                                         │
//! │  v2  forums (id)             posts (id)             comments (id)       │
//! │      └ by_channel            ├ by_forum             ├ by_post           │
//! │                              ├ by_author            └ by_author         │
//! │                              └ by_createdAt                             │
//! │                                                                         │
//! │  v3  planets (id)            channels (id)          contents +          │
//! │                              └ by_planet            ├ by_tags (multi)   │
//! │                                                     └ by_createdAt      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stores are not SQL tables. Every record lives in the `records` table as a
//! JSON document, and each secondary index value is a row in
//! `index_entries`. The catalogue itself (`object_stores`, `store_indexes`)
//! is persisted so a database opened by an older build still knows which
//! stores and indexes it has.

/// Name of the local database.
pub const DATABASE_NAME: &str = "peermall-db";

/// Current schema version
pub const DATABASE_VERSION: u32 = 3;

/// Store names.
pub mod stores {
    /// Tenant storefronts, keyed by `address`.
    pub const PEER_SPACES: &str = "peerSpaces";
    /// User-authored content attached to a peer space.
    pub const CONTENTS: &str = "contents";
    /// Local user profiles.
    pub const USERS: &str = "users";
    /// Discussion boards.
    pub const FORUMS: &str = "forums";
    /// Forum posts.
    pub const POSTS: &str = "posts";
    /// Post comments.
    pub const COMMENTS: &str = "comments";
    /// Top level of the topic taxonomy.
    pub const PLANETS: &str = "planets";
    /// Middle level of the topic taxonomy.
    pub const CHANNELS: &str = "channels";
}

/// Index names.
pub mod indexes {
    /// `peerSpaces.ownerPeerId`
    pub const BY_OWNER: &str = "by_owner";
    /// `contents.peerSpaceAddress`
    pub const BY_PEER_SPACE: &str = "by_peerSpace";
    /// `contents.type`
    pub const BY_TYPE: &str = "by_type";
    /// `contents.tags` (multi-entry)
    pub const BY_TAGS: &str = "by_tags";
    /// `createdAt` on contents and posts
    pub const BY_CREATED_AT: &str = "by_createdAt";
    /// `users.email`
    pub const BY_EMAIL: &str = "by_email";
    /// `forums.channelId`
    pub const BY_CHANNEL: &str = "by_channel";
    /// `posts.forumId`
    pub const BY_FORUM: &str = "by_forum";
    /// `authorId` on posts and comments
    pub const BY_AUTHOR: &str = "by_author";
    /// `comments.postId`
    pub const BY_POST: &str = "by_post";
    /// `channels.planetId`
    pub const BY_PLANET: &str = "by_planet";
}

/// A secondary index declaration.
#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    /// Index name
    pub name: &'static str,
    /// Dotted path of the indexed field
    pub key_path: &'static str,
    /// Index every element of an array field instead of the array itself
    pub multi_entry: bool,
}

/// An object store declaration.
#[derive(Debug, Clone, Copy)]
pub struct StoreDef {
    /// Store name
    pub name: &'static str,
    /// Dotted path of the primary key field (always a string)
    pub key_path: &'static str,
    /// Indexes created together with the store
    pub indexes: &'static [IndexDef],
}

/// Everything a single version bump adds. Upgrades are additive only.
#[derive(Debug, Clone, Copy)]
pub struct SchemaStep {
    /// Version this step brings the database to
    pub version: u32,
    /// New stores (with their indexes)
    pub stores: &'static [StoreDef],
    /// New indexes on stores created by an earlier step
    pub indexes: &'static [(&'static str, IndexDef)],
}

const fn index(name: &'static str, key_path: &'static str) -> IndexDef {
    IndexDef {
        name,
        key_path,
        multi_entry: false,
    }
}

const fn multi_entry(name: &'static str, key_path: &'static str) -> IndexDef {
    IndexDef {
        name,
        key_path,
        multi_entry: true,
    }
}

/// Upgrade steps, oldest first.
pub const UPGRADES: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        stores: &[
            StoreDef {
                name: stores::PEER_SPACES,
                key_path: "address",
                indexes: &[index(indexes::BY_OWNER, "ownerPeerId")],
            },
            StoreDef {
                name: stores::CONTENTS,
                key_path: "id",
                indexes: &[
                    index(indexes::BY_PEER_SPACE, "peerSpaceAddress"),
                    index(indexes::BY_TYPE, "type"),
                ],
            },
            StoreDef {
                name: stores::USERS,
                key_path: "id",
                indexes: &[index(indexes::BY_EMAIL, "email")],
            },
        ],
        indexes: &[],
    },
    SchemaStep {
        version: 2,
        stores: &[
            StoreDef {
                name: stores::FORUMS,
                key_path: "id",
                indexes: &[index(indexes::BY_CHANNEL, "channelId")],
            },
            StoreDef {
                name: stores::POSTS,
                key_path: "id",
                indexes: &[
                    index(indexes::BY_FORUM, "forumId"),
                    index(indexes::BY_AUTHOR, "authorId"),
                    index(indexes::BY_CREATED_AT, "createdAt"),
                ],
            },
            StoreDef {
                name: stores::COMMENTS,
                key_path: "id",
                indexes: &[
                    index(indexes::BY_POST, "postId"),
                    index(indexes::BY_AUTHOR, "authorId"),
                ],
            },
        ],
        indexes: &[],
    },
    SchemaStep {
        version: 3,
        stores: &[
            StoreDef {
                name: stores::PLANETS,
                key_path: "id",
                indexes: &[],
            },
            StoreDef {
                name: stores::CHANNELS,
                key_path: "id",
                indexes: &[index(indexes::BY_PLANET, "planetId")],
            },
        ],
        indexes: &[
            (stores::CONTENTS, multi_entry(indexes::BY_TAGS, "tags")),
            (stores::CONTENTS, index(indexes::BY_CREATED_AT, "createdAt")),
        ],
    },
];

/// SQL for the catalogue and record tables.
///
/// `index_entries.value` has no declared type so SQLite keeps each value's
/// storage class: numbers sort before text, integers compare with reals.
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Declared object stores
CREATE TABLE IF NOT EXISTS object_stores (
    name TEXT PRIMARY KEY,
    -- Dotted path of the string primary key inside each record
    key_path TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Declared secondary indexes
CREATE TABLE IF NOT EXISTS store_indexes (
    store TEXT NOT NULL,
    name TEXT NOT NULL,
    key_path TEXT NOT NULL,
    multi_entry INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (store, name),
    FOREIGN KEY (store) REFERENCES object_stores(name) ON DELETE CASCADE
);

-- Record documents (JSON), one row per record
CREATE TABLE IF NOT EXISTS records (
    store TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (store, key)
);

-- Index rows: one per (index, value, record); multi-entry indexes
-- contribute one row per distinct array element
CREATE TABLE IF NOT EXISTS index_entries (
    store TEXT NOT NULL,
    index_name TEXT NOT NULL,
    value NOT NULL,
    key TEXT NOT NULL,
    PRIMARY KEY (store, index_name, value, key)
);
CREATE INDEX IF NOT EXISTS idx_index_entries_record ON index_entries(store, key);
"#;

/// Steps needed to go from `from` (exclusive) to `to` (inclusive).
pub fn steps_between(from: u32, to: u32) -> impl Iterator<Item = &'static SchemaStep> {
    UPGRADES
        .iter()
        .filter(move |step| step.version > from && step.version <= to)
}
