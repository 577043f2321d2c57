//! Forum records: the planet/channel taxonomy, forums, posts and comments.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::Timestamp;

/// Maximum length of a planet, channel or forum name
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a post title
pub const MAX_POST_TITLE_LENGTH: usize = 300;

/// Maximum length of a post body
pub const MAX_POST_BODY_LENGTH: usize = 40_000;

/// Maximum length of a comment body
pub const MAX_COMMENT_LENGTH: usize = 10_000;

fn check_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidRecord(format!("{what} name is required")));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(Error::InvalidRecord(format!(
            "{what} name too long: max {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn check_text(what: &str, text: &str, max: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidRecord(format!("{what} must not be empty")));
    }
    if text.chars().count() > max {
        return Err(Error::InvalidRecord(format!(
            "{what} too long: max {max} characters"
        )));
    }
    Ok(())
}

fn check_ref(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidRecord(format!("{what} is required")));
    }
    Ok(())
}

fn id_or_uuid(id: Option<String>) -> String {
    id.filter(|id| !id.trim().is_empty())
        .unwrap_or_else(crate::id::uuid)
}

// ============================================================================
// TAXONOMY
// ============================================================================

/// Top level of the topic taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    /// Primary key
    pub id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Creation time
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
}

impl Planet {
    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        check_name("planet", &self.name)
    }
}

/// Input for creating a planet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPlanet {
    /// Explicit id; a UUID is generated when absent
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
}

impl NewPlanet {
    /// A planet with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_record(self, now: Timestamp) -> Planet {
        Planet {
            id: id_or_uuid(self.id),
            name: self.name,
            description: self.description,
            created_at: now,
        }
    }
}

/// Middle level of the topic taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Primary key
    pub id: String,
    /// Parent planet (indexed)
    pub planet_id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Creation time
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
}

impl Channel {
    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        check_ref("channel planet", &self.planet_id)?;
        check_name("channel", &self.name)
    }
}

/// Input for creating a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewChannel {
    /// Explicit id; a UUID is generated when absent
    pub id: Option<String>,
    /// Parent planet
    pub planet_id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
}

impl NewChannel {
    /// A channel under a planet.
    pub fn new(planet_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            planet_id: planet_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_record(self, now: Timestamp) -> Channel {
        Channel {
            id: id_or_uuid(self.id),
            planet_id: self.planet_id,
            name: self.name,
            description: self.description,
            created_at: now,
        }
    }
}

// ============================================================================
// FORUMS
// ============================================================================

/// A discussion board inside a channel.
///
/// `postCount` and `lastPostAt` are derived from the forum's posts and are
/// maintained by the post lifecycle, never set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forum {
    /// Primary key
    pub id: String,
    /// Parent channel (indexed)
    pub channel_id: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Number of posts
    #[serde(default)]
    pub post_count: u64,
    /// `createdAt` of the newest post
    #[serde(
        default,
        with = "crate::time::iso_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_post_at: Option<Timestamp>,
    /// Creation time
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
    /// Last modification time
    #[serde(with = "crate::time::iso")]
    pub updated_at: Timestamp,
}

impl Forum {
    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        check_ref("forum channel", &self.channel_id)?;
        check_name("forum", &self.name)
    }
}

/// Input for creating a forum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewForum {
    /// Explicit id; a UUID is generated when absent
    pub id: Option<String>,
    /// Parent channel
    pub channel_id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
}

impl NewForum {
    /// A forum in a channel.
    pub fn new(channel_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_record(self, now: Timestamp) -> Forum {
        Forum {
            id: id_or_uuid(self.id),
            channel_id: self.channel_id,
            name: self.name,
            description: self.description,
            post_count: 0,
            last_post_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a forum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForumUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
}

impl ForumUpdate {
    pub(crate) fn apply(self, forum: &mut Forum) {
        if let Some(name) = self.name {
            forum.name = name;
        }
        if let Some(description) = self.description {
            forum.description = description;
        }
    }
}

// ============================================================================
// POSTS
// ============================================================================

/// A post in a forum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPost {
    /// Primary key (UUID v4)
    pub id: String,
    /// Parent forum (indexed)
    pub forum_id: String,
    /// Author (indexed)
    pub author_id: String,
    /// Title
    pub title: String,
    /// Body text
    pub body: String,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// View count
    #[serde(default)]
    pub views: u64,
    /// Like count
    #[serde(default)]
    pub likes: u64,
    /// Number of comments
    #[serde(default)]
    pub comment_count: u64,
    /// Pinned posts sort before the rest
    #[serde(default)]
    pub is_pinned: bool,
    /// Creation time (indexed)
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
    /// Last modification time
    #[serde(with = "crate::time::iso")]
    pub updated_at: Timestamp,
}

impl ForumPost {
    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        check_ref("post forum", &self.forum_id)?;
        check_ref("post author", &self.author_id)?;
        check_text("post title", &self.title, MAX_POST_TITLE_LENGTH)?;
        check_text("post body", &self.body, MAX_POST_BODY_LENGTH)
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPost {
    /// Parent forum
    pub forum_id: String,
    /// Author
    pub author_id: String,
    /// Title
    pub title: String,
    /// Body text
    pub body: String,
    /// Tags
    pub tags: Vec<String>,
    /// Pin on creation
    pub is_pinned: bool,
}

impl NewPost {
    /// A post by `author_id` in `forum_id`.
    pub fn new(
        forum_id: impl Into<String>,
        author_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            forum_id: forum_id.into(),
            author_id: author_id.into(),
            title: title.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_record(self, now: Timestamp) -> ForumPost {
        ForumPost {
            id: crate::id::uuid(),
            forum_id: self.forum_id,
            author_id: self.author_id,
            title: self.title,
            body: self.body,
            tags: crate::peer_space::dedupe(self.tags),
            views: 0,
            likes: 0,
            comment_count: 0,
            is_pinned: self.is_pinned,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostUpdate {
    /// New title
    pub title: Option<String>,
    /// New body
    pub body: Option<String>,
    /// Replacement tags
    pub tags: Option<Vec<String>>,
}

impl PostUpdate {
    pub(crate) fn apply(self, post: &mut ForumPost) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(body) = self.body {
            post.body = body;
        }
        if let Some(tags) = self.tags {
            post.tags = crate::peer_space::dedupe(tags);
        }
    }
}

// ============================================================================
// COMMENTS
// ============================================================================

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumComment {
    /// Primary key (UUID v4)
    pub id: String,
    /// Parent post (indexed)
    pub post_id: String,
    /// Author (indexed)
    pub author_id: String,
    /// Comment text
    pub body: String,
    /// Like count
    #[serde(default)]
    pub likes: u64,
    /// Creation time
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
    /// Last modification time
    #[serde(with = "crate::time::iso")]
    pub updated_at: Timestamp,
}

impl ForumComment {
    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        check_ref("comment post", &self.post_id)?;
        check_ref("comment author", &self.author_id)?;
        check_text("comment", &self.body, MAX_COMMENT_LENGTH)
    }
}

/// Input for creating a comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewComment {
    /// Parent post
    pub post_id: String,
    /// Author
    pub author_id: String,
    /// Comment text
    pub body: String,
}

impl NewComment {
    /// A comment by `author_id` on `post_id`.
    pub fn new(
        post_id: impl Into<String>,
        author_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            author_id: author_id.into(),
            body: body.into(),
        }
    }

    pub(crate) fn into_record(self, now: Timestamp) -> ForumComment {
        ForumComment {
            id: crate::id::uuid(),
            post_id: self.post_id,
            author_id: self.author_id,
            body: self.body,
            likes: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentUpdate {
    /// New text
    pub body: Option<String>,
}

impl CommentUpdate {
    pub(crate) fn apply(self, comment: &mut ForumComment) {
        if let Some(body) = self.body {
            comment.body = body;
        }
    }
}
