//! # Content
//!
//! User-authored items attached to a peer space: products, events, posts,
//! reviews and the rest of [`ContentType`].
//!
//! ## Record Shape
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            CONTENT                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  id                 content-<epoch-ms>-<base36>                        │
//! │  peerSpaceAddress   owning peer space            (index: by_peerSpace) │
//! │  type + kind fields ContentKind, flattened       (index: by_type)      │
//! │  title / description / imageUrl                                        │
//! │  likes / comments / views / saves   u64, start at 0                    │
//! │  tags               set of strings               (index: by_tags, ME)  │
//! │  ecosystem          relation kind -> [content id]                      │
//! │  createdAt                                       (index: by_createdAt) │
//! │  updatedAt                                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod kind;
mod service;

pub use kind::{ContentKind, ContentType, MAX_RATING, MIN_RATING};
pub use service::ContentService;
pub(crate) use service::delete_peer_space_contents;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::peer_space::dedupe;
use crate::time::Timestamp;

/// Maximum length of a content title
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum number of tags on one content item
pub const MAX_TAGS: usize = 32;

/// Related content grouped by relation kind, e.g. `"bundles" -> [ids]`.
pub type Ecosystem = BTreeMap<String, Vec<String>>;

/// A stored content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Primary key
    pub id: String,
    /// Owning peer space
    pub peer_space_address: String,
    /// Kind and kind-specific fields
    #[serde(flatten)]
    pub kind: ContentKind,
    /// Headline
    pub title: String,
    /// Body text
    #[serde(default)]
    pub description: String,
    /// Cover image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Like count
    #[serde(default)]
    pub likes: u64,
    /// Comment count
    #[serde(default)]
    pub comments: u64,
    /// View count
    #[serde(default)]
    pub views: u64,
    /// Save count
    #[serde(default)]
    pub saves: u64,
    /// Tags, no duplicates
    #[serde(default)]
    pub tags: Vec<String>,
    /// Related content
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ecosystem: Ecosystem,
    /// Creation time
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
    /// Last modification time
    #[serde(with = "crate::time::iso")]
    pub updated_at: Timestamp,
}

impl Content {
    /// The content's type tag.
    pub fn content_type(&self) -> ContentType {
        self.kind.content_type()
    }

    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidRecord("content id is required".into()));
        }
        if self.peer_space_address.trim().is_empty() {
            return Err(Error::InvalidRecord(
                "content must belong to a peer space".into(),
            ));
        }
        if self.title.trim().is_empty() {
            return Err(Error::InvalidRecord("content title is required".into()));
        }
        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::InvalidRecord(format!(
                "content title too long: max {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(Error::InvalidRecord(format!(
                "too many tags: max {}",
                MAX_TAGS
            )));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::InvalidRecord("tags must not be empty".into()));
        }
        if dedupe(self.tags.clone()).len() != self.tags.len() {
            return Err(Error::InvalidRecord("tags must not repeat".into()));
        }
        if self.ecosystem.keys().any(|k| k.trim().is_empty()) {
            return Err(Error::InvalidRecord(
                "ecosystem relation kinds must not be empty".into(),
            ));
        }
        self.kind.validate()
    }
}

/// Input for [`ContentService::create_content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    /// Explicit id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Owning peer space
    pub peer_space_address: String,
    /// Kind and kind-specific fields
    #[serde(flatten)]
    pub kind: ContentKind,
    /// Headline
    pub title: String,
    /// Body text
    #[serde(default)]
    pub description: String,
    /// Cover image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Tags (duplicates are dropped)
    #[serde(default)]
    pub tags: Vec<String>,
    /// Related content
    #[serde(default)]
    pub ecosystem: Ecosystem,
    /// Starting like count
    #[serde(default)]
    pub likes: u64,
    /// Starting comment count
    #[serde(default)]
    pub comments: u64,
    /// Starting view count
    #[serde(default)]
    pub views: u64,
    /// Starting save count
    #[serde(default)]
    pub saves: u64,
}

impl NewContent {
    /// Content of the given kind in a peer space.
    pub fn new(
        peer_space_address: impl Into<String>,
        kind: ContentKind,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            peer_space_address: peer_space_address.into(),
            kind,
            title: title.into(),
            description: String::new(),
            image_url: None,
            tags: Vec::new(),
            ecosystem: Ecosystem::new(),
            likes: 0,
            comments: 0,
            views: 0,
            saves: 0,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn into_record(self, now: Timestamp) -> Content {
        Content {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(crate::id::content_id),
            peer_space_address: self.peer_space_address,
            kind: self.kind,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            likes: self.likes,
            comments: self.comments,
            views: self.views,
            saves: self.saves,
            tags: dedupe(self.tags),
            ecosystem: self.ecosystem,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a content item. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentUpdate {
    /// New headline
    pub title: Option<String>,
    /// New body text
    pub description: Option<String>,
    /// New cover image
    pub image_url: Option<String>,
    /// New kind (and kind fields)
    pub kind: Option<ContentKind>,
    /// Replacement tag set
    pub tags: Option<Vec<String>>,
    /// Replacement ecosystem
    pub ecosystem: Option<Ecosystem>,
}

impl ContentUpdate {
    pub(crate) fn apply(self, content: &mut Content) {
        if let Some(title) = self.title {
            content.title = title;
        }
        if let Some(description) = self.description {
            content.description = description;
        }
        if let Some(image_url) = self.image_url {
            content.image_url = Some(image_url);
        }
        if let Some(kind) = self.kind {
            content.kind = kind;
        }
        if let Some(tags) = self.tags {
            content.tags = dedupe(tags);
        }
        if let Some(ecosystem) = self.ecosystem {
            content.ecosystem = ecosystem;
        }
    }
}

/// Union `relations` into `ecosystem`, per relation kind, keeping existing
/// order and skipping ids already present.
pub fn merge_ecosystem(ecosystem: &mut Ecosystem, relations: Ecosystem) {
    for (relation, ids) in relations {
        let entry = ecosystem.entry(relation).or_default();
        for id in ids {
            if !entry.contains(&id) {
                entry.push(id);
            }
        }
    }
}
