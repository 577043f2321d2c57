//! Counter reconciliation.
//!
//! Recomputes every derived forum field from the child records. Stores
//! written by clients that updated counters outside a transaction can hold
//! counts that drifted from the posts and comments actually present.

use serde::Serialize;

use super::model::{Forum, ForumPost};
use super::service::latest_post_at;
use crate::error::Result;
use crate::storage::schema::{indexes, stores};

/// What [`ForumService::reconcile_counters`](super::ForumService::reconcile_counters) found and fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Forums inspected
    pub forums_checked: usize,
    /// Posts inspected
    pub posts_checked: usize,
    /// Forums whose `postCount` or `lastPostAt` was rewritten
    pub forums_repaired: Vec<String>,
    /// Posts whose `commentCount` was rewritten
    pub posts_repaired: Vec<String>,
}

impl ReconcileReport {
    /// Whether anything had to be repaired.
    pub fn is_clean(&self) -> bool {
        self.forums_repaired.is_empty() && self.posts_repaired.is_empty()
    }
}

impl super::ForumService {
    /// Recompute `postCount`/`lastPostAt` for every forum and
    /// `commentCount` for every post, in one write transaction.
    pub async fn reconcile_counters(&self) -> Result<ReconcileReport> {
        let report = self
            .store()
            .write_transaction("reconcile_counters", |txn| {
                let mut report = ReconcileReport::default();

                let posts: Vec<ForumPost> = txn.get_all_typed(stores::POSTS)?;
                report.posts_checked = posts.len();
                for mut post in posts {
                    let actual =
                        txn.count_by_index(stores::COMMENTS, indexes::BY_POST, post.id.as_str())?;
                    if post.comment_count != actual {
                        tracing::warn!(
                            post = %post.id,
                            stored = post.comment_count,
                            actual,
                            "Repairing comment count"
                        );
                        post.comment_count = actual;
                        txn.put_typed(stores::POSTS, &post)?;
                        report.posts_repaired.push(post.id);
                    }
                }

                let forums: Vec<Forum> = txn.get_all_typed(stores::FORUMS)?;
                report.forums_checked = forums.len();
                for mut forum in forums {
                    let actual =
                        txn.count_by_index(stores::POSTS, indexes::BY_FORUM, forum.id.as_str())?;
                    let last = latest_post_at(txn, &forum.id)?;
                    if forum.post_count != actual || forum.last_post_at != last {
                        tracing::warn!(
                            forum = %forum.id,
                            stored = forum.post_count,
                            actual,
                            "Repairing forum post counters"
                        );
                        forum.post_count = actual;
                        forum.last_post_at = last;
                        txn.put_typed(stores::FORUMS, &forum)?;
                        report.forums_repaired.push(forum.id);
                    }
                }

                Ok(report)
            })
            .await?;

        tracing::info!(
            forums = report.forums_checked,
            posts = report.posts_checked,
            repaired = report.forums_repaired.len() + report.posts_repaired.len(),
            "Forum counters reconciled"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::forum::service::test_support::service_with_forum;
    use crate::forum::{NewComment, NewPost};
    use crate::storage::schema::stores;

    #[tokio::test]
    async fn test_consistent_store_is_clean() {
        let (svc, forum) = service_with_forum().await;
        let post = svc
            .create_post(NewPost::new(&forum.id, "u1", "Hello", "World"))
            .await
            .unwrap();
        svc.create_comment(NewComment::new(&post.id, "u2", "hi"))
            .await
            .unwrap();

        let report = svc.reconcile_counters().await.unwrap();
        assert!(report.is_clean());
        assert_eq!((report.forums_checked, report.posts_checked), (1, 1));
    }

    #[tokio::test]
    async fn test_drifted_counters_are_repaired() {
        let (svc, forum) = service_with_forum().await;
        let post = svc
            .create_post(NewPost::new(&forum.id, "u1", "Hello", "World"))
            .await
            .unwrap();
        svc.create_comment(NewComment::new(&post.id, "u2", "hi"))
            .await
            .unwrap();

        // Simulate a client that wrote counters without the cascade.
        let mut raw_forum = svc.store().get(stores::FORUMS, &forum.id).await.unwrap().unwrap();
        raw_forum["postCount"] = json!(7);
        raw_forum.as_object_mut().unwrap().remove("lastPostAt");
        svc.store().update(stores::FORUMS, raw_forum).await.unwrap();

        let mut raw_post = svc.store().get(stores::POSTS, &post.id).await.unwrap().unwrap();
        raw_post["commentCount"] = json!(0);
        svc.store().update(stores::POSTS, raw_post).await.unwrap();

        let report = svc.reconcile_counters().await.unwrap();
        assert_eq!(report.forums_repaired, vec![forum.id.clone()]);
        assert_eq!(report.posts_repaired, vec![post.id.clone()]);

        let forum = svc.get_forum(&forum.id).await.unwrap().unwrap();
        assert_eq!(forum.post_count, 1);
        assert_eq!(forum.last_post_at, Some(post.created_at));
        assert_eq!(svc.get_post(&post.id).await.unwrap().unwrap().comment_count, 1);

        assert!(svc.reconcile_counters().await.unwrap().is_clean());
    }
}
