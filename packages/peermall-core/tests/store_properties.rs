//! End-to-end behaviour of the store through the public API.

use std::collections::BTreeSet;

use peermall_core::content::{ContentUpdate, NewContent};
use peermall_core::forum::{NewChannel, NewComment, NewForum, NewPlanet, NewPost};
use peermall_core::peer_space::NewPeerSpace;
use peermall_core::storage::schema::{indexes, stores};
use peermall_core::{ContentKind, DatabaseConfig, PeerMall};
use serde_json::json;

async fn mall() -> PeerMall {
    PeerMall::open(DatabaseConfig::default()).await.unwrap()
}

async fn mall_with_space(address: &str) -> PeerMall {
    let mall = mall().await;
    mall.peer_spaces()
        .create_peer_space(NewPeerSpace::new(address, "Shop"))
        .await
        .unwrap();
    mall
}

fn product(address: &str, title: &str) -> NewContent {
    NewContent::new(
        address,
        ContentKind::Product {
            price: 10.0,
            currency: None,
        },
        title,
    )
}

#[tokio::test]
async fn add_then_get_round_trips() {
    let mall = mall().await;
    let store = peermall_core::RecordStore::new(mall.database().clone());

    let record = json!({
        "id": "content-1",
        "peerSpaceAddress": "peer-1",
        "type": "event",
        "title": "Launch",
        "nested": { "a": [1, 2, { "b": null }] },
        "ratio": 0.25,
        "flag": true,
    });
    let key = store.add(stores::CONTENTS, record.clone()).await.unwrap();
    assert_eq!(key, "content-1");
    assert_eq!(store.get(stores::CONTENTS, &key).await.unwrap(), Some(record));

    let content = mall
        .peer_spaces()
        .create_peer_space(NewPeerSpace::new("peer-2", "Other"))
        .await
        .unwrap();
    let created = mall
        .contents()
        .create_content(product(&content.address, "Lamp").with_tags(["home"]))
        .await
        .unwrap();
    assert_eq!(
        mall.contents().get_content(&created.id).await.unwrap(),
        Some(created)
    );
}

#[tokio::test]
async fn update_twice_equals_update_once() {
    let mall = mall().await;
    let store = peermall_core::RecordStore::new(mall.database().clone());

    let record = json!({ "address": "peer-9", "title": "Twice", "ownerPeerId": "p9" });
    store.update(stores::PEER_SPACES, record.clone()).await.unwrap();
    let once = store.get(stores::PEER_SPACES, "peer-9").await.unwrap();
    store.update(stores::PEER_SPACES, record.clone()).await.unwrap();
    let twice = store.get(stores::PEER_SPACES, "peer-9").await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(store.count(stores::PEER_SPACES).await.unwrap(), 1);
    assert_eq!(
        store
            .get_by_index(stores::PEER_SPACES, indexes::BY_OWNER, "p9")
            .await
            .unwrap()
            .len(),
        1
    );

    let mall = mall_with_space("peer-1").await;
    let item = mall
        .contents()
        .create_content(product("peer-1", "Widget"))
        .await
        .unwrap();
    let update = ContentUpdate {
        title: Some("Widget v2".into()),
        ..Default::default()
    };
    let first = mall
        .contents()
        .update_content(&item.id, update.clone())
        .await
        .unwrap()
        .unwrap();
    let second = mall
        .contents()
        .update_content(&item.id, update)
        .await
        .unwrap()
        .unwrap();

    assert!(second.updated_at > first.updated_at);
    assert!(first.updated_at > item.updated_at);
    let mut normalized = second.clone();
    normalized.updated_at = first.updated_at;
    assert_eq!(normalized, first);
    assert_eq!(second.created_at, item.created_at);
}

#[tokio::test]
async fn peer_space_index_matches_exactly() {
    let mall = mall().await;
    for address in ["peer-a", "peer-b"] {
        mall.peer_spaces()
            .create_peer_space(NewPeerSpace::new(address, "Shop"))
            .await
            .unwrap();
    }

    let mut expected = BTreeSet::new();
    for (i, address) in ["peer-b", "peer-a", "peer-a", "peer-b", "peer-a"]
        .iter()
        .enumerate()
    {
        let item = mall
            .contents()
            .create_content(product(address, &format!("item {i}")))
            .await
            .unwrap();
        if *address == "peer-a" {
            expected.insert(item.id);
        }
    }

    let found: BTreeSet<String> = mall
        .contents()
        .get_peer_space_contents("peer-a")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn every_tag_finds_the_item() {
    let mall = mall_with_space("peer-1").await;
    let item = mall
        .contents()
        .create_content(product("peer-1", "Widget").with_tags(["a", "b"]))
        .await
        .unwrap();

    for tag in ["a", "b"] {
        let hits = mall.contents().search_contents_by_tag(tag).await.unwrap();
        assert_eq!(hits.len(), 1, "tag {tag}");
        assert_eq!(hits[0].id, item.id);
    }
    assert!(mall.contents().search_contents_by_tag("c").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_post_cascades() {
    let mall = mall().await;
    let forums = mall.forums();
    let planet = forums.create_planet(NewPlanet::new("Makers")).await.unwrap();
    let channel = forums
        .create_channel(NewChannel::new(&planet.id, "Woodwork"))
        .await
        .unwrap();
    let forum = forums
        .create_forum(NewForum::new(&channel.id, "General"))
        .await
        .unwrap();
    forums
        .create_post(NewPost::new(&forum.id, "u1", "Keep me", "..."))
        .await
        .unwrap();
    let post = forums
        .create_post(NewPost::new(&forum.id, "u1", "Delete me", "..."))
        .await
        .unwrap();
    let c1 = forums
        .create_comment(NewComment::new(&post.id, "u2", "one"))
        .await
        .unwrap();
    let c2 = forums
        .create_comment(NewComment::new(&post.id, "u3", "two"))
        .await
        .unwrap();

    let before = forums.get_forum(&forum.id).await.unwrap().unwrap().post_count;
    assert!(forums.delete_post(&post.id).await.unwrap());

    let store = peermall_core::RecordStore::new(mall.database().clone());
    assert!(store.get(stores::COMMENTS, &c1.id).await.unwrap().is_none());
    assert!(store.get(stores::COMMENTS, &c2.id).await.unwrap().is_none());
    let after = forums.get_forum(&forum.id).await.unwrap().unwrap().post_count;
    assert_eq!(after, before - 1);
}

#[tokio::test]
async fn likes_only_go_up_by_one() {
    let mall = mall_with_space("peer-1").await;
    let item = mall
        .contents()
        .create_content(product("peer-1", "Widget"))
        .await
        .unwrap();

    let mut previous = item.likes;
    for _ in 0..5 {
        let next = mall
            .contents()
            .increment_content_likes(&item.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next, previous + 1);
        previous = next;
    }

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let contents = mall.contents().clone();
            let id = item.id.clone();
            tokio::spawn(async move { contents.increment_content_likes(&id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    let stored = mall.contents().get_content(&item.id).await.unwrap().unwrap();
    assert_eq!(stored.likes, 15);
}

#[tokio::test]
async fn updating_a_missing_item_is_not_an_error() {
    let mall = mall().await;
    let result = mall
        .contents()
        .update_content(
            "nonexistent-id",
            ContentUpdate {
                title: Some("x".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Ok(None)));
    assert!(!mall.contents().delete_content("nonexistent-id").await.unwrap());
}

#[tokio::test]
async fn widget_scenario() {
    let mall = mall().await;
    let space = mall
        .peer_spaces()
        .create_peer_space(NewPeerSpace::new("peer-1", "Peer One"))
        .await
        .unwrap();
    assert_eq!(space.followers, 0);

    mall.contents()
        .create_content(product("peer-1", "Widget"))
        .await
        .unwrap();

    let contents = mall.contents().get_peer_space_contents("peer-1").await.unwrap();
    assert_eq!(contents.len(), 1);
    let widget = &contents[0];
    assert_eq!(widget.title, "Widget");
    assert_eq!(widget.peer_space_address, "peer-1");
    assert_eq!(
        (widget.likes, widget.comments, widget.views, widget.saves),
        (0, 0, 0, 0)
    );
    assert!(!widget.id.is_empty());

    let raw = serde_json::to_value(widget).unwrap();
    assert_eq!(raw["type"], "product");
    assert!(!raw["createdAt"].as_str().unwrap().is_empty());
    assert!(!raw["updatedAt"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mall.sqlite");

    {
        let mall = PeerMall::open(DatabaseConfig::at(&path)).await.unwrap();
        mall.peer_spaces()
            .create_peer_space(NewPeerSpace::new("peer-1", "Shop"))
            .await
            .unwrap();
        mall.contents()
            .create_content(product("peer-1", "Widget").with_tags(["tools"]))
            .await
            .unwrap();
    }

    let mall = PeerMall::open(DatabaseConfig::at(&path)).await.unwrap();
    assert_eq!(mall.database().version(), peermall_core::DATABASE_VERSION);
    assert_eq!(
        mall.contents().search_contents_by_tag("tools").await.unwrap().len(),
        1
    );
}
