//! # Peer Space Service
//!
//! The only writer of the `peerSpaces` store. Deleting a peer space also
//! has the content module remove its contents in the same transaction, so
//! no content is left pointing at a missing space.

use std::sync::Arc;

use super::{NewPeerSpace, PeerSpace, PeerSpaceUpdate, SettingsUpdate};
use crate::error::Result;
use crate::storage::schema::{indexes, stores};
use crate::storage::{Database, RecordStore};

/// Peer space CRUD, counters, badges and settings.
#[derive(Debug, Clone)]
pub struct PeerSpaceService {
    store: RecordStore,
}

impl PeerSpaceService {
    /// Create a new peer space service backed by the given database.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            store: RecordStore::new(db),
        }
    }

    /// Create a peer space. Fails with `DuplicateKey` if the address is
    /// taken and `InvalidRecord` if the address is empty.
    pub async fn create_peer_space(&self, new: NewPeerSpace) -> Result<PeerSpace> {
        let space = new.into_record(crate::time::now());
        space.validate()?;

        let record = space.clone();
        self.store
            .write_transaction("create_peer_space", move |txn| {
                txn.add_typed(stores::PEER_SPACES, &record)
            })
            .await?;

        tracing::info!(address = %space.address, "Peer space created");
        Ok(space)
    }

    /// Get a peer space by address.
    pub async fn get_peer_space(&self, address: &str) -> Result<Option<PeerSpace>> {
        self.store.get_typed(stores::PEER_SPACES, address).await
    }

    /// Every peer space, in address order.
    pub async fn get_all_peer_spaces(&self) -> Result<Vec<PeerSpace>> {
        self.store.get_all_typed(stores::PEER_SPACES).await
    }

    /// Peer spaces owned by a peer.
    pub async fn get_peer_spaces_by_owner(&self, owner_peer_id: &str) -> Result<Vec<PeerSpace>> {
        self.store
            .get_by_index_typed(stores::PEER_SPACES, indexes::BY_OWNER, owner_peer_id)
            .await
    }

    /// Apply a partial update. Returns `None` if the peer space does not exist.
    pub async fn update_peer_space(
        &self,
        address: &str,
        update: PeerSpaceUpdate,
    ) -> Result<Option<PeerSpace>> {
        self.modify("update_peer_space", address, move |space| {
            update.apply(space);
            Ok(())
        })
        .await
    }

    /// Delete a peer space and all of its contents.
    ///
    /// Returns `false` if there was no such peer space.
    pub async fn delete_peer_space(&self, address: &str) -> Result<bool> {
        let address = address.to_string();
        let removed = self
            .store
            .write_transaction("delete_peer_space", move |txn| {
                if txn.get(stores::PEER_SPACES, &address)?.is_none() {
                    return Ok(None);
                }
                let contents = crate::content::delete_peer_space_contents(txn, &address)?;
                txn.delete(stores::PEER_SPACES, &address)?;
                Ok(Some((address, contents)))
            })
            .await?;

        match removed {
            Some((address, contents)) => {
                tracing::info!(address = %address, contents, "Peer space deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Add a follower. Returns the new count, or `None` if the peer space
    /// does not exist.
    pub async fn follow(&self, address: &str) -> Result<Option<u64>> {
        self.store
            .increment(stores::PEER_SPACES, address, "followers", 1)
            .await
    }

    /// Remove a follower. The count never drops below zero.
    pub async fn unfollow(&self, address: &str) -> Result<Option<u64>> {
        self.store
            .increment(stores::PEER_SPACES, address, "followers", -1)
            .await
    }

    /// Add a recommendation.
    pub async fn recommend(&self, address: &str) -> Result<Option<u64>> {
        self.store
            .increment(stores::PEER_SPACES, address, "recommendations", 1)
            .await
    }

    /// Award a badge. Awarding a badge twice changes nothing.
    pub async fn add_badge(&self, address: &str, badge: &str) -> Result<Option<PeerSpace>> {
        let badge = badge.to_string();
        self.modify("add_badge", address, move |space| {
            if !space.badges.contains(&badge) {
                space.badges.push(badge);
            }
            Ok(())
        })
        .await
    }

    /// Take a badge away.
    pub async fn remove_badge(&self, address: &str, badge: &str) -> Result<Option<PeerSpace>> {
        let badge = badge.to_string();
        self.modify("remove_badge", address, move |space| {
            space.badges.retain(|b| *b != badge);
            Ok(())
        })
        .await
    }

    /// Change hidden sections, section order, theme or visibility.
    pub async fn update_settings(
        &self,
        address: &str,
        update: SettingsUpdate,
    ) -> Result<Option<PeerSpace>> {
        self.modify("update_settings", address, move |space| {
            update.apply(&mut space.settings);
            Ok(())
        })
        .await
    }

    /// Load, change, validate and store a peer space in one transaction.
    async fn modify<F>(&self, label: &str, address: &str, change: F) -> Result<Option<PeerSpace>>
    where
        F: FnOnce(&mut PeerSpace) -> Result<()> + Send + 'static,
    {
        let address = address.to_string();
        self.store
            .write_transaction(label, move |txn| {
                let Some(mut space) = txn.get_typed::<PeerSpace>(stores::PEER_SPACES, &address)?
                else {
                    return Ok(None);
                };
                change(&mut space)?;
                space.updated_at = crate::time::advance(space.updated_at);
                space.validate()?;
                txn.put_typed(stores::PEER_SPACES, &space)?;
                Ok(Some(space))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::peer_space::{SectionType, Visibility};
    use crate::storage::DatabaseConfig;

    async fn service() -> PeerSpaceService {
        let db = Database::open(DatabaseConfig::default()).await.unwrap();
        PeerSpaceService::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let svc = service().await;
        let created = svc
            .create_peer_space(NewPeerSpace::new("peer-1", "Corner Shop").owned_by("12D3Koo", "Ada"))
            .await
            .unwrap();
        assert_eq!(created.followers, 0);

        let loaded = svc.get_peer_space("peer-1").await.unwrap().unwrap();
        assert_eq!(loaded, created);

        let owned = svc.get_peer_spaces_by_owner("12D3Koo").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert!(svc.get_peer_space("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_and_empty_address() {
        let svc = service().await;
        svc.create_peer_space(NewPeerSpace::new("peer-1", "A"))
            .await
            .unwrap();
        let err = svc
            .create_peer_space(NewPeerSpace::new("peer-1", "B"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));

        let err = svc
            .create_peer_space(NewPeerSpace::new("", "Nameless"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn test_update_preserves_identity() {
        let svc = service().await;
        let created = svc
            .create_peer_space(NewPeerSpace::new("peer-1", "Old"))
            .await
            .unwrap();

        let updated = svc
            .update_peer_space(
                "peer-1",
                PeerSpaceUpdate {
                    title: Some("New".into()),
                    sections: Some(vec![SectionType::Hero, SectionType::Reviews]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.address, created.address);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let missing = svc
            .update_peer_space("ghost", PeerSpaceUpdate::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_follow_unfollow_never_negative() {
        let svc = service().await;
        svc.create_peer_space(NewPeerSpace::new("peer-1", "Shop"))
            .await
            .unwrap();

        assert_eq!(svc.follow("peer-1").await.unwrap(), Some(1));
        assert_eq!(svc.unfollow("peer-1").await.unwrap(), Some(0));
        assert_eq!(svc.unfollow("peer-1").await.unwrap(), Some(0));
        assert_eq!(svc.recommend("peer-1").await.unwrap(), Some(1));
        assert_eq!(svc.follow("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_badges_and_settings() {
        let svc = service().await;
        svc.create_peer_space(NewPeerSpace::new("peer-1", "Shop"))
            .await
            .unwrap();

        svc.add_badge("peer-1", "verified").await.unwrap();
        let space = svc.add_badge("peer-1", "verified").await.unwrap().unwrap();
        assert_eq!(space.badges, vec!["verified".to_string()]);

        let space = svc.remove_badge("peer-1", "verified").await.unwrap().unwrap();
        assert!(space.badges.is_empty());

        let space = svc
            .update_settings(
                "peer-1",
                SettingsUpdate {
                    theme: Some("midnight".into()),
                    visibility: Some(Visibility::Unlisted),
                    hidden_sections: Some(vec![SectionType::Contact]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(space.settings.theme, "midnight");
        assert_eq!(space.settings.visibility, Visibility::Unlisted);
        assert!(!space.visible_sections().contains(&SectionType::Contact));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_contents() {
        let svc = service().await;
        svc.create_peer_space(NewPeerSpace::new("peer-1", "Shop"))
            .await
            .unwrap();
        let store = svc.store.clone();
        for id in ["c1", "c2"] {
            store
                .add(
                    stores::CONTENTS,
                    serde_json::json!({ "id": id, "peerSpaceAddress": "peer-1" }),
                )
                .await
                .unwrap();
        }
        store
            .add(
                stores::CONTENTS,
                serde_json::json!({ "id": "c3", "peerSpaceAddress": "peer-2" }),
            )
            .await
            .unwrap();

        assert!(svc.delete_peer_space("peer-1").await.unwrap());
        assert!(!svc.delete_peer_space("peer-1").await.unwrap());
        assert_eq!(store.count(stores::CONTENTS).await.unwrap(), 1);
        assert!(store.get(stores::CONTENTS, "c3").await.unwrap().is_some());
    }
}
