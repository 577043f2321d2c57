//! Post lifecycle.
//!
//! Creating or deleting a post also maintains the parent forum's
//! `postCount` and `lastPostAt` within the same transaction.

use super::model::{Forum, ForumPost, NewPost, PostUpdate};
use super::service::{delete_comments_of, latest_post_at};
use crate::error::{Error, Result};
use crate::storage::schema::{indexes, stores};

impl super::ForumService {
    /// Create a post in an existing forum.
    pub async fn create_post(&self, new: NewPost) -> Result<ForumPost> {
        let post = new.into_record(crate::time::now());
        post.validate()?;

        let record = post.clone();
        let post_count = self
            .store()
            .write_transaction("create_post", move |txn| {
                let Some(mut forum) = txn.get_typed::<Forum>(stores::FORUMS, &record.forum_id)?
                else {
                    return Err(Error::NotFound(format!("Forum '{}'", record.forum_id)));
                };
                txn.add_typed(stores::POSTS, &record)?;

                forum.post_count += 1;
                forum.last_post_at = Some(record.created_at);
                txn.put_typed(stores::FORUMS, &forum)?;
                Ok(forum.post_count)
            })
            .await?;

        tracing::info!(id = %post.id, forum = %post.forum_id, post_count, "Post created");
        Ok(post)
    }

    /// Get a post by id.
    pub async fn get_post(&self, id: &str) -> Result<Option<ForumPost>> {
        self.store().get_typed(stores::POSTS, id).await
    }

    /// Posts in a forum: pinned first, then newest first.
    pub async fn get_posts_by_forum(&self, forum_id: &str) -> Result<Vec<ForumPost>> {
        let mut posts: Vec<ForumPost> = self
            .store()
            .get_by_index_typed(stores::POSTS, indexes::BY_FORUM, forum_id)
            .await?;
        posts.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(posts)
    }

    /// Edit a post. Returns `None` if it does not exist.
    pub async fn update_post(&self, id: &str, update: PostUpdate) -> Result<Option<ForumPost>> {
        self.modify_post("update_post", id, move |post| update.apply(post))
            .await
    }

    /// Pin or unpin a post. Returns `None` if it does not exist.
    pub async fn set_post_pinned(&self, id: &str, pinned: bool) -> Result<Option<ForumPost>> {
        self.modify_post("set_post_pinned", id, move |post| post.is_pinned = pinned)
            .await
    }

    /// Delete a post and its comments, then bring the forum's counters in
    /// line with what is left. Returns `false` if the post did not exist.
    pub async fn delete_post(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        let removed = self
            .store()
            .write_transaction("delete_post", move |txn| {
                let Some(post) = txn.get_typed::<ForumPost>(stores::POSTS, &id)? else {
                    return Ok(None);
                };
                let comments = delete_comments_of(txn, &post.id)?;
                txn.delete(stores::POSTS, &post.id)?;

                if let Some(mut forum) = txn.get_typed::<Forum>(stores::FORUMS, &post.forum_id)? {
                    forum.post_count = forum.post_count.saturating_sub(1);
                    forum.last_post_at = latest_post_at(txn, &forum.id)?;
                    txn.put_typed(stores::FORUMS, &forum)?;
                }
                Ok(Some((post, comments)))
            })
            .await?;

        match removed {
            Some((post, comments)) => {
                tracing::info!(id = %post.id, forum = %post.forum_id, comments, "Post deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Count a view. Returns the new count, or `None` if the post is missing.
    pub async fn increment_post_views(&self, id: &str) -> Result<Option<u64>> {
        self.store().increment(stores::POSTS, id, "views", 1).await
    }

    /// Like a post. Returns the new count, or `None` if the post is missing.
    pub async fn like_post(&self, id: &str) -> Result<Option<u64>> {
        self.store().increment(stores::POSTS, id, "likes", 1).await
    }

    async fn modify_post<F>(&self, label: &str, id: &str, f: F) -> Result<Option<ForumPost>>
    where
        F: FnOnce(&mut ForumPost) + Send + 'static,
    {
        let id = id.to_string();
        self.store()
            .write_transaction(label, move |txn| {
                let Some(mut post) = txn.get_typed::<ForumPost>(stores::POSTS, &id)? else {
                    return Ok(None);
                };
                f(&mut post);
                post.updated_at = crate::time::advance(post.updated_at);
                post.validate()?;
                txn.put_typed(stores::POSTS, &post)?;
                Ok(Some(post))
            })
            .await
    }
}
