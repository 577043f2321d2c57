//! # Forum Service
//!
//! Core service struct and forum CRUD. Taxonomy, posts, comments and
//! counter reconciliation live in sibling modules as further `impl` blocks.

use std::sync::Arc;

use super::model::{Forum, ForumComment, ForumPost, ForumUpdate, NewForum};
use crate::error::{Error, Result};
use crate::storage::schema::{indexes, stores};
use crate::storage::{Database, RecordStore, StoreTxn};

/// The forum service: planets, channels, forums, posts and comments.
///
/// Every operation that touches a derived field (`postCount`,
/// `lastPostAt`, `commentCount`) runs in one write transaction together
/// with the change that caused it.
#[derive(Debug, Clone)]
pub struct ForumService {
    store: RecordStore,
}

impl ForumService {
    /// Create a new forum service backed by the given database.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            store: RecordStore::new(db),
        }
    }

    pub(crate) fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Create a forum in an existing channel.
    pub async fn create_forum(&self, new: NewForum) -> Result<Forum> {
        let forum = new.into_record(crate::time::now());
        forum.validate()?;

        let record = forum.clone();
        self.store
            .write_transaction("create_forum", move |txn| {
                if txn.get(stores::CHANNELS, &record.channel_id)?.is_none() {
                    return Err(Error::NotFound(format!("Channel '{}'", record.channel_id)));
                }
                txn.add_typed(stores::FORUMS, &record)
            })
            .await?;

        tracing::info!(id = %forum.id, channel = %forum.channel_id, "Forum created");
        Ok(forum)
    }

    /// Get a forum by id.
    pub async fn get_forum(&self, id: &str) -> Result<Option<Forum>> {
        self.store.get_typed(stores::FORUMS, id).await
    }

    /// Forums in a channel, by name.
    pub async fn get_forums_by_channel(&self, channel_id: &str) -> Result<Vec<Forum>> {
        let mut forums: Vec<Forum> = self
            .store
            .get_by_index_typed(stores::FORUMS, indexes::BY_CHANNEL, channel_id)
            .await?;
        forums.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(forums)
    }

    /// Rename or re-describe a forum. Returns `None` if it does not exist.
    pub async fn update_forum(&self, id: &str, update: ForumUpdate) -> Result<Option<Forum>> {
        let id = id.to_string();
        self.store
            .write_transaction("update_forum", move |txn| {
                let Some(mut forum) = txn.get_typed::<Forum>(stores::FORUMS, &id)? else {
                    return Ok(None);
                };
                update.apply(&mut forum);
                forum.updated_at = crate::time::advance(forum.updated_at);
                forum.validate()?;
                txn.put_typed(stores::FORUMS, &forum)?;
                Ok(Some(forum))
            })
            .await
    }

    /// Delete a forum with all of its posts and their comments.
    ///
    /// Returns `false` if the forum did not exist.
    pub async fn delete_forum(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        let removed = self
            .store
            .write_transaction("delete_forum", move |txn| {
                if txn.get(stores::FORUMS, &id)?.is_none() {
                    return Ok(None);
                }
                let posts: Vec<ForumPost> =
                    txn.get_by_index_typed(stores::POSTS, indexes::BY_FORUM, id.as_str())?;
                let mut comments = 0;
                for post in &posts {
                    comments += delete_comments_of(txn, &post.id)?;
                    txn.delete(stores::POSTS, &post.id)?;
                }
                txn.delete(stores::FORUMS, &id)?;
                Ok(Some((id, posts.len(), comments)))
            })
            .await?;

        match removed {
            Some((id, posts, comments)) => {
                tracing::info!(id = %id, posts, comments, "Forum deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Delete every comment on a post, returning how many were removed.
pub(super) fn delete_comments_of(txn: &StoreTxn<'_>, post_id: &str) -> Result<usize> {
    let comments: Vec<ForumComment> =
        txn.get_by_index_typed(stores::COMMENTS, indexes::BY_POST, post_id)?;
    for comment in &comments {
        txn.delete(stores::COMMENTS, &comment.id)?;
    }
    Ok(comments.len())
}

/// Newest `createdAt` among a forum's remaining posts.
pub(super) fn latest_post_at(
    txn: &StoreTxn<'_>,
    forum_id: &str,
) -> Result<Option<crate::time::Timestamp>> {
    let posts: Vec<ForumPost> = txn.get_by_index_typed(stores::POSTS, indexes::BY_FORUM, forum_id)?;
    Ok(posts.iter().map(|p| p.created_at).max())
}

#[cfg(test)]
pub(super) mod test_support {
    use super::*;
    use crate::forum::{NewChannel, NewPlanet};
    use crate::storage::DatabaseConfig;

    /// A forum service with one planet, one channel and one forum.
    pub async fn service_with_forum() -> (ForumService, Forum) {
        let db = Database::open(DatabaseConfig::default()).await.unwrap();
        let svc = ForumService::new(Arc::new(db));
        let planet = svc.create_planet(NewPlanet::new("Makers")).await.unwrap();
        let channel = svc
            .create_channel(NewChannel::new(&planet.id, "Woodwork"))
            .await
            .unwrap();
        let forum = svc
            .create_forum(NewForum::new(&channel.id, "General"))
            .await
            .unwrap();
        (svc, forum)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::service_with_forum;
    use super::*;
    use crate::forum::{NewComment, NewPost};

    #[tokio::test]
    async fn test_create_forum_requires_channel() {
        let (svc, _) = service_with_forum().await;
        let err = svc
            .create_forum(NewForum::new("channel-404", "Lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_and_update_forum() {
        let (svc, forum) = service_with_forum().await;
        assert_eq!(svc.get_forum(&forum.id).await.unwrap(), Some(forum.clone()));
        assert_eq!(svc.get_forums_by_channel(&forum.channel_id).await.unwrap().len(), 1);

        let updated = svc
            .update_forum(
                &forum.id,
                ForumUpdate {
                    name: Some("Announcements".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Announcements");
        assert_eq!(updated.post_count, 0);
        assert!(updated.updated_at > forum.updated_at);
        assert!(svc
            .update_forum("ghost", ForumUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_forum_cascades() {
        let (svc, forum) = service_with_forum().await;
        let post = svc
            .create_post(NewPost::new(&forum.id, "u1", "Hello", "World"))
            .await
            .unwrap();
        svc.create_comment(NewComment::new(&post.id, "u2", "Hi"))
            .await
            .unwrap();

        assert!(svc.delete_forum(&forum.id).await.unwrap());
        assert!(!svc.delete_forum(&forum.id).await.unwrap());
        assert!(svc.get_post(&post.id).await.unwrap().is_none());
        assert_eq!(svc.store().count(stores::COMMENTS).await.unwrap(), 0);
        assert_eq!(svc.store().count(stores::POSTS).await.unwrap(), 0);
    }
}
