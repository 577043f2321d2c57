//! Comment lifecycle. Keeps the parent post's `commentCount` in step.

use super::model::{CommentUpdate, ForumComment, NewComment};
use crate::error::{Error, Result};
use crate::storage::schema::{indexes, stores};

impl super::ForumService {
    /// Comment on an existing post.
    pub async fn create_comment(&self, new: NewComment) -> Result<ForumComment> {
        let comment = new.into_record(crate::time::now());
        comment.validate()?;

        let record = comment.clone();
        self.store()
            .write_transaction("create_comment", move |txn| {
                if txn.get(stores::POSTS, &record.post_id)?.is_none() {
                    return Err(Error::NotFound(format!("Post '{}'", record.post_id)));
                }
                txn.add_typed(stores::COMMENTS, &record)?;
                txn.increment(stores::POSTS, &record.post_id, "commentCount", 1)
            })
            .await?;

        tracing::debug!(id = %comment.id, post = %comment.post_id, "Comment created");
        Ok(comment)
    }

    /// Comments on a post, oldest first.
    pub async fn get_comments_by_post(&self, post_id: &str) -> Result<Vec<ForumComment>> {
        let mut comments: Vec<ForumComment> = self
            .store()
            .get_by_index_typed(stores::COMMENTS, indexes::BY_POST, post_id)
            .await?;
        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(comments)
    }

    /// Edit a comment. Returns `None` if it does not exist.
    pub async fn update_comment(
        &self,
        id: &str,
        update: CommentUpdate,
    ) -> Result<Option<ForumComment>> {
        let id = id.to_string();
        self.store()
            .write_transaction("update_comment", move |txn| {
                let Some(mut comment) = txn.get_typed::<ForumComment>(stores::COMMENTS, &id)? else {
                    return Ok(None);
                };
                update.apply(&mut comment);
                comment.updated_at = crate::time::advance(comment.updated_at);
                comment.validate()?;
                txn.put_typed(stores::COMMENTS, &comment)?;
                Ok(Some(comment))
            })
            .await
    }

    /// Delete a comment. Returns `false` if it did not exist.
    pub async fn delete_comment(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.store()
            .write_transaction("delete_comment", move |txn| {
                let Some(comment) = txn.get_typed::<ForumComment>(stores::COMMENTS, &id)? else {
                    return Ok(false);
                };
                txn.delete(stores::COMMENTS, &id)?;
                txn.increment(stores::POSTS, &comment.post_id, "commentCount", -1)?;
                Ok(true)
            })
            .await
    }

    /// Like a comment. Returns the new count, or `None` if it is missing.
    pub async fn like_comment(&self, id: &str) -> Result<Option<u64>> {
        self.store().increment(stores::COMMENTS, id, "likes", 1).await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::forum::service::test_support::service_with_forum;
    use crate::forum::{CommentUpdate, NewComment, NewPost};

    #[tokio::test]
    async fn test_comment_count_follows_comments() {
        let (svc, forum) = service_with_forum().await;
        let post = svc
            .create_post(NewPost::new(&forum.id, "u1", "Hello", "World"))
            .await
            .unwrap();

        let first = svc
            .create_comment(NewComment::new(&post.id, "u2", "one"))
            .await
            .unwrap();
        svc.create_comment(NewComment::new(&post.id, "u3", "two"))
            .await
            .unwrap();
        assert_eq!(svc.get_post(&post.id).await.unwrap().unwrap().comment_count, 2);

        assert!(svc.delete_comment(&first.id).await.unwrap());
        assert!(!svc.delete_comment(&first.id).await.unwrap());
        assert_eq!(svc.get_post(&post.id).await.unwrap().unwrap().comment_count, 1);
    }

    #[tokio::test]
    async fn test_comment_requires_post() {
        let (svc, _) = service_with_forum().await;
        let err = svc
            .create_comment(NewComment::new("post-404", "u1", "hello?"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(svc.get_comments_by_post("post-404").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_oldest_first() {
        let (svc, forum) = service_with_forum().await;
        let post = svc
            .create_post(NewPost::new(&forum.id, "u1", "Hello", "World"))
            .await
            .unwrap();
        for body in ["a", "b", "c"] {
            svc.create_comment(NewComment::new(&post.id, "u2", body))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(3)).await;
        }

        let bodies: Vec<_> = svc
            .get_comments_by_post(&post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_update_and_like_comment() {
        let (svc, forum) = service_with_forum().await;
        let post = svc
            .create_post(NewPost::new(&forum.id, "u1", "Hello", "World"))
            .await
            .unwrap();
        let comment = svc
            .create_comment(NewComment::new(&post.id, "u2", "typo"))
            .await
            .unwrap();

        let edited = svc
            .update_comment(
                &comment.id,
                CommentUpdate {
                    body: Some("fixed".into()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.body, "fixed");
        assert!(edited.updated_at > comment.updated_at);
        assert!(svc
            .update_comment("ghost", CommentUpdate::default())
            .await
            .unwrap()
            .is_none());

        assert_eq!(svc.like_comment(&comment.id).await.unwrap(), Some(1));
        assert_eq!(svc.like_comment("ghost").await.unwrap(), None);
    }
}
