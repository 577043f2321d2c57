//! # Forums
//!
//! Discussion boards organised in a three-level taxonomy, with posts and
//! comments underneath.
//!
//! ## Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           FORUM HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Planet ──< Channel ──< Forum ──< ForumPost ──< ForumComment            │
//! │                          │            │                                 │
//! │                          │            └ commentCount = #comments        │
//! │                          ├ postCount  = #posts                          │
//! │                          └ lastPostAt = max(post.createdAt)             │
//! │                                                                         │
//! │  Children reference parents by id. A child cannot be created under a   │
//! │  missing parent. Deleting a parent removes everything beneath it.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Derived counters change in the same transaction as the records they
//! count, so a crash or error never leaves them out of step.
//! [`ForumService::reconcile_counters`] repairs stores written by clients
//! that did not follow this rule.

mod comments;
mod model;
mod posts;
mod reconcile;
mod service;
mod taxonomy;

pub use model::{
    Channel, CommentUpdate, Forum, ForumComment, ForumPost, ForumUpdate, NewChannel, NewComment,
    NewForum, NewPlanet, NewPost, Planet, PostUpdate, MAX_COMMENT_LENGTH, MAX_NAME_LENGTH,
    MAX_POST_BODY_LENGTH, MAX_POST_TITLE_LENGTH,
};
pub use reconcile::ReconcileReport;
pub use service::ForumService;
