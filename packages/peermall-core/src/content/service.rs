//! # Content Service
//!
//! The only writer of the `contents` store. Peer space deletion reaches it
//! through [`delete_peer_space_contents`], inside its own transaction.
//!
//! Counters (`likes`, `views`, `saves`) are bumped inside a single write
//! transaction, so concurrent increments never overwrite each other.

use std::sync::Arc;

use super::{merge_ecosystem, Content, ContentType, ContentUpdate, Ecosystem, NewContent};
use crate::error::{Error, Result};
use crate::storage::schema::{indexes, stores};
use crate::storage::{Database, Direction, QueryOptions, RecordStore, StoreTxn};

/// Content CRUD, search and engagement counters.
#[derive(Debug, Clone)]
pub struct ContentService {
    store: RecordStore,
}

impl ContentService {
    /// Create a new content service backed by the given database.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            store: RecordStore::new(db),
        }
    }

    /// Create a content item.
    ///
    /// Generates the id when none is given, starts counters at 0 unless
    /// supplied, and stamps `createdAt = updatedAt = now`. The peer space
    /// must exist (`NotFound` otherwise).
    pub async fn create_content(&self, new: NewContent) -> Result<Content> {
        let content = new.into_record(crate::time::now());
        content.validate()?;

        let record = content.clone();
        self.store
            .write_transaction("create_content", move |txn| {
                if txn
                    .get(stores::PEER_SPACES, &record.peer_space_address)?
                    .is_none()
                {
                    return Err(Error::NotFound(format!(
                        "Peer space '{}'",
                        record.peer_space_address
                    )));
                }
                txn.add_typed(stores::CONTENTS, &record)
            })
            .await?;

        tracing::debug!(
            id = %content.id,
            kind = %content.content_type(),
            peer_space = %content.peer_space_address,
            "Content created"
        );
        Ok(content)
    }

    /// Get a content item by id.
    pub async fn get_content(&self, id: &str) -> Result<Option<Content>> {
        self.store.get_typed(stores::CONTENTS, id).await
    }

    /// Every content item, in id order.
    pub async fn get_all_contents(&self) -> Result<Vec<Content>> {
        self.store.get_all_typed(stores::CONTENTS).await
    }

    /// Content of one peer space, newest first.
    pub async fn get_peer_space_contents(&self, address: &str) -> Result<Vec<Content>> {
        let mut contents: Vec<Content> = self
            .store
            .get_by_index_typed(stores::CONTENTS, indexes::BY_PEER_SPACE, address)
            .await?;
        newest_first(&mut contents);
        Ok(contents)
    }

    /// Content of one type within a peer space, newest first.
    pub async fn get_contents_by_type(
        &self,
        address: &str,
        content_type: ContentType,
    ) -> Result<Vec<Content>> {
        let mut contents = self.get_peer_space_contents(address).await?;
        contents.retain(|c| c.content_type() == content_type);
        Ok(contents)
    }

    /// Every content item carrying `tag`.
    pub async fn search_contents_by_tag(&self, tag: &str) -> Result<Vec<Content>> {
        let mut contents: Vec<Content> = self
            .store
            .get_by_index_typed(stores::CONTENTS, indexes::BY_TAGS, tag)
            .await?;
        newest_first(&mut contents);
        Ok(contents)
    }

    /// The most recently created content across all peer spaces.
    pub async fn get_recent_contents(&self, limit: usize) -> Result<Vec<Content>> {
        self.store
            .query_typed(
                stores::CONTENTS,
                QueryOptions::new()
                    .index(indexes::BY_CREATED_AT)
                    .direction(Direction::Prev)
                    .limit(limit),
            )
            .await
    }

    /// Apply a partial update. Returns `None` if the content does not exist.
    pub async fn update_content(&self, id: &str, update: ContentUpdate) -> Result<Option<Content>> {
        self.modify("update_content", id, move |content| update.apply(content))
            .await
    }

    /// Union relations into the content's ecosystem.
    pub async fn merge_ecosystem(&self, id: &str, relations: Ecosystem) -> Result<Option<Content>> {
        self.modify("merge_ecosystem", id, move |content| {
            merge_ecosystem(&mut content.ecosystem, relations)
        })
        .await
    }

    /// Delete a content item. Returns `false` if it did not exist.
    pub async fn delete_content(&self, id: &str) -> Result<bool> {
        let removed = self.store.remove(stores::CONTENTS, id).await?;
        if removed {
            tracing::debug!(id, "Content deleted");
        }
        Ok(removed)
    }

    /// Add a like. Returns the new count, `None` if the content is missing.
    pub async fn increment_content_likes(&self, id: &str) -> Result<Option<u64>> {
        self.store.increment(stores::CONTENTS, id, "likes", 1).await
    }

    /// Add a view.
    pub async fn increment_content_views(&self, id: &str) -> Result<Option<u64>> {
        self.store.increment(stores::CONTENTS, id, "views", 1).await
    }

    /// Add a save.
    pub async fn increment_content_saves(&self, id: &str) -> Result<Option<u64>> {
        self.store.increment(stores::CONTENTS, id, "saves", 1).await
    }

    async fn modify<F>(&self, label: &str, id: &str, change: F) -> Result<Option<Content>>
    where
        F: FnOnce(&mut Content) + Send + 'static,
    {
        let id = id.to_string();
        self.store
            .write_transaction(label, move |txn| {
                let Some(mut content) = txn.get_typed::<Content>(stores::CONTENTS, &id)? else {
                    return Ok(None);
                };
                let created_at = content.created_at;
                change(&mut content);
                content.id = id;
                content.created_at = created_at;
                content.updated_at = crate::time::advance(content.updated_at);
                content.validate()?;
                txn.put_typed(stores::CONTENTS, &content)?;
                Ok(Some(content))
            })
            .await
    }
}

/// Delete every content record attached to a peer space, within the
/// caller's transaction. Returns how many were removed.
pub(crate) fn delete_peer_space_contents(txn: &StoreTxn<'_>, address: &str) -> Result<usize> {
    let contents = txn.get_by_index(stores::CONTENTS, indexes::BY_PEER_SPACE, address)?;
    let mut removed = 0;
    for content in contents {
        if let Some(id) = content.get("id").and_then(|v| v.as_str()) {
            if txn.delete(stores::CONTENTS, id)? {
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// Sort by `createdAt` descending, id as tie-breaker.
fn newest_first(contents: &mut [Content]) {
    contents.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::peer_space::{NewPeerSpace, PeerSpaceService};
    use crate::storage::DatabaseConfig;

    async fn services() -> (ContentService, PeerSpaceService) {
        let db = Arc::new(Database::open(DatabaseConfig::default()).await.unwrap());
        let spaces = PeerSpaceService::new(Arc::clone(&db));
        spaces
            .create_peer_space(NewPeerSpace::new("peer-1", "Shop"))
            .await
            .unwrap();
        (ContentService::new(db), spaces)
    }

    fn product(title: &str) -> NewContent {
        NewContent::new(
            "peer-1",
            ContentKind::Product {
                price: 5.0,
                currency: None,
            },
            title,
        )
    }

    #[tokio::test]
    async fn test_create_requires_peer_space() {
        let (svc, _) = services().await;
        let mut orphan = product("Orphan");
        orphan.peer_space_address = "peer-404".into();
        let err = svc.create_content(orphan).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(svc.get_all_contents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_content_is_not_written() {
        let (svc, _) = services().await;
        let bad = NewContent::new("peer-1", ContentKind::Review { rating: 0, target_id: None }, "Meh");
        assert!(matches!(
            svc.create_content(bad).await.unwrap_err(),
            Error::InvalidRecord(_)
        ));
        assert!(svc.get_all_contents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_id_is_kept() {
        let (svc, _) = services().await;
        let mut new = product("Widget");
        new.id = Some("content-fixed".into());
        let created = svc.create_content(new).await.unwrap();
        assert_eq!(created.id, "content-fixed");

        let mut dup = product("Widget again");
        dup.id = Some("content-fixed".into());
        assert!(matches!(
            svc.create_content(dup).await.unwrap_err(),
            Error::DuplicateKey { .. }
        ));
    }

    #[tokio::test]
    async fn test_type_filter_and_tag_search() {
        let (svc, _) = services().await;
        svc.create_content(product("Widget").with_tags(["a", "b"]))
            .await
            .unwrap();
        svc.create_content(NewContent::new("peer-1", ContentKind::Post, "Hello").with_tags(["b"]))
            .await
            .unwrap();

        let products = svc
            .get_contents_by_type("peer-1", ContentType::Product)
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Widget");

        assert_eq!(svc.search_contents_by_tag("a").await.unwrap().len(), 1);
        assert_eq!(svc.search_contents_by_tag("b").await.unwrap().len(), 2);
        assert!(svc.search_contents_by_tag("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_identity_and_advances_updated_at() {
        let (svc, _) = services().await;
        let created = svc.create_content(product("Widget")).await.unwrap();

        let first = svc
            .update_content(
                &created.id,
                ContentUpdate {
                    description: Some("Shiny".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        let second = svc
            .update_content(&created.id, ContentUpdate::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.id, created.id);
        assert_eq!(first.created_at, created.created_at);
        assert_eq!(first.description, "Shiny");
        assert!(first.updated_at > created.updated_at);
        assert!(second.updated_at > first.updated_at);

        let missing = svc
            .update_content("nonexistent-id", ContentUpdate::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_record_untouched() {
        let (svc, _) = services().await;
        let created = svc.create_content(product("Widget")).await.unwrap();
        let err = svc
            .update_content(
                &created.id,
                ContentUpdate {
                    kind: Some(ContentKind::Product {
                        price: -3.0,
                        currency: None,
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
        assert_eq!(svc.get_content(&created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_counters() {
        let (svc, _) = services().await;
        let created = svc.create_content(product("Widget")).await.unwrap();

        for expected in 1..=3 {
            assert_eq!(
                svc.increment_content_likes(&created.id).await.unwrap(),
                Some(expected)
            );
        }
        assert_eq!(svc.increment_content_views(&created.id).await.unwrap(), Some(1));
        assert_eq!(svc.increment_content_saves(&created.id).await.unwrap(), Some(1));
        assert_eq!(svc.increment_content_likes("ghost").await.unwrap(), None);

        let loaded = svc.get_content(&created.id).await.unwrap().unwrap();
        assert_eq!((loaded.likes, loaded.views, loaded.saves), (3, 1, 1));
    }

    #[tokio::test]
    async fn test_merge_ecosystem() {
        let (svc, _) = services().await;
        let created = svc.create_content(product("Widget")).await.unwrap();

        let mut relations = Ecosystem::new();
        relations.insert("bundles".into(), vec!["c-2".into(), "c-3".into()]);
        svc.merge_ecosystem(&created.id, relations.clone())
            .await
            .unwrap();
        let merged = svc
            .merge_ecosystem(&created.id, relations)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.ecosystem["bundles"], vec!["c-2", "c-3"]);
    }

    #[tokio::test]
    async fn test_recent_contents_and_delete() {
        let (svc, _) = services().await;
        let a = svc.create_content(product("A")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = svc.create_content(product("B")).await.unwrap();

        let recent = svc.get_recent_contents(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, b.id);

        let listed = svc.get_peer_space_contents("peer-1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);

        assert!(svc.delete_content(&a.id).await.unwrap());
        assert!(!svc.delete_content(&a.id).await.unwrap());
        assert_eq!(svc.get_peer_space_contents("peer-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_peer_space_contents_removed_only_when_caller_commits() {
        let (svc, spaces) = services().await;
        spaces
            .create_peer_space(NewPeerSpace::new("peer-2", "Other"))
            .await
            .unwrap();
        svc.create_content(product("A")).await.unwrap();
        svc.create_content(product("B")).await.unwrap();
        let mut other = product("Elsewhere");
        other.peer_space_address = "peer-2".into();
        let kept = svc.create_content(other).await.unwrap();

        let err = svc
            .store
            .write_transaction("abort", |txn| {
                assert_eq!(delete_peer_space_contents(txn, "peer-1")?, 2);
                Err::<(), _>(Error::Internal("abort".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(svc.get_peer_space_contents("peer-1").await.unwrap().len(), 2);

        let removed = svc
            .store
            .write_transaction("cascade", |txn| delete_peer_space_contents(txn, "peer-1"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(svc.get_peer_space_contents("peer-1").await.unwrap().is_empty());
        assert_eq!(svc.get_content(&kept.id).await.unwrap(), Some(kept));
    }
}
