// tests/test_collection_service.rs
mod common;

use common::{build_stack, MockRemoteApi};
use linkstash::application::error::ApplicationError;
use linkstash::application::services::sync_service::DrainPolicy;
use linkstash::domain::bookmark::Bookmark;
use linkstash::domain::collection::AccessLevel;
use linkstash::domain::error::DomainError;
use linkstash::domain::repositories::bookmark_repository::BookmarkRepository;
use linkstash::domain::repositories::collection_repository::CollectionRepository;
use linkstash::domain::tag::Tag;

#[tokio::test]
async fn create_rejects_empty_name_and_duplicate_name() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);

    let err = stack
        .collections
        .create_collection("   ", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Validation { field: "name", .. }));

    stack
        .collections
        .create_collection("Reading", None, None, None)
        .await
        .unwrap();

    let err = stack
        .collections
        .create_collection("Reading", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::DuplicateName(_))
    ));
}

#[tokio::test]
async fn confirmed_create_relabels_to_server_id() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);

    let collection = stack
        .collections
        .create_collection("Reading", Some("long reads"), None, None)
        .await
        .unwrap();
    let provisional = collection.id;

    stack.sync.flush().await;

    let repo = stack.db.collections();
    assert!(repo.get_by_id(provisional).unwrap().is_none());
    let synced = repo.get_by_id(1000).unwrap().unwrap();
    assert!(synced.is_synced);
    assert!(!synced.is_local_id);
    assert_eq!(synced.name, "Reading");
}

#[tokio::test]
async fn set_default_clears_the_previous_default() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    // keep ids provisional for the duration of the test
    stack.mock.fail_all(503);

    let first = stack
        .collections
        .create_collection("First", None, None, None)
        .await
        .unwrap();
    let second = stack
        .collections
        .create_collection("Second", None, None, None)
        .await
        .unwrap();

    stack.collections.set_default_collection(first.id).await.unwrap();
    stack.collections.set_default_collection(second.id).await.unwrap();

    let default = stack.collections.get_default_collection().await.unwrap().unwrap();
    assert_eq!(default.id, second.id);

    let first_reloaded = stack.collections.get_collection(first.id).await.unwrap().unwrap();
    assert!(!first_reloaded.is_default);
}

#[tokio::test]
async fn share_flow_stores_the_server_assigned_url() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);

    stack
        .collections
        .create_collection("Shared Reads", None, None, None)
        .await
        .unwrap();
    stack.sync.flush().await;
    let server_id = 1000;

    let shared = stack
        .collections
        .share_collection(server_id, AccessLevel::Edit, Some(7))
        .await
        .unwrap();
    assert!(shared.is_shared);
    // the URL is server-assigned and not known yet
    assert!(shared.share_url.is_none());

    stack.sync.flush().await;

    let reloaded = stack
        .collections
        .get_collection(server_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        reloaded.share_url.as_deref(),
        Some("https://share.example.com/c1000")
    );
    assert_eq!(reloaded.access_level, AccessLevel::Edit);
    assert!(reloaded.is_synced);
}

#[tokio::test]
async fn unshare_clears_the_share_state() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);

    stack
        .collections
        .create_collection("Shared Reads", None, None, None)
        .await
        .unwrap();
    stack.sync.flush().await;
    let server_id = 1000;

    stack
        .collections
        .share_collection(server_id, AccessLevel::View, None)
        .await
        .unwrap();
    stack.sync.flush().await;

    stack.collections.unshare_collection(server_id).await.unwrap();
    stack.sync.flush().await;

    let reloaded = stack
        .collections
        .get_collection(server_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!reloaded.is_shared);
    assert!(reloaded.share_url.is_none());
}

#[tokio::test]
async fn delete_cascades_to_bookmarks_after_the_confirmed_remote_delete() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);

    stack
        .collections
        .create_collection("Doomed", None, None, None)
        .await
        .unwrap();
    stack.sync.flush().await;
    let server_id = 1000;

    let mut bookmark = Bookmark::new(
        server_id,
        "https://example.com/in-doomed",
        "In Doomed",
        None,
        Tag::parse_tags("t").unwrap(),
    );
    let bookmark_repo = stack.db.bookmarks();
    bookmark_repo.add(&mut bookmark).unwrap();
    bookmark_repo
        .mark_synced(bookmark.id, Some(false), Some(false))
        .unwrap();

    assert!(stack.collections.delete_collection(server_id).await.unwrap());

    // immediately hidden from reads
    assert!(stack
        .collections
        .get_collection(server_id)
        .await
        .unwrap()
        .is_none());
    assert!(bookmark_repo.get_by_id(bookmark.id).unwrap().is_none());

    stack.sync.flush().await;

    // the confirmed remote delete purges the collection; the FK cascade
    // takes the bookmark rows with it
    let collection_repo = stack.db.collections();
    assert!(collection_repo.get_by_id_any(server_id).unwrap().is_none());
    assert!(bookmark_repo.get_by_id_any(bookmark.id).unwrap().is_none());
}

#[tokio::test]
async fn follow_shared_writes_the_collection_into_the_store() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);

    let followed = stack
        .collections
        .follow_shared("https://share.example.com/abc")
        .await
        .unwrap();

    let stored = stack
        .db
        .collections()
        .get_by_id(followed.id)
        .unwrap()
        .unwrap();
    assert!(stored.is_shared);
    assert!(stored.is_synced);
    assert_eq!(
        stored.share_url.as_deref(),
        Some("https://share.example.com/abc")
    );

    stack.collections.unfollow_shared(followed.id).await.unwrap();
    assert!(stack
        .db
        .collections()
        .get_by_id_any(followed.id)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn refresh_reconciles_server_collections() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let repo = stack.db.collections();

    // unpushed local collection survives the refresh
    stack.mock.fail_all(503);
    let local = stack
        .collections
        .create_collection("Local Only", None, None, None)
        .await
        .unwrap();
    stack.sync.flush().await;
    stack.mock.succeed();

    stack
        .mock
        .set_remote_collections(vec![MockRemoteApi::collection_dto(
            4000, "user-1", "Server Side",
        )]);

    let fetched = stack.collections.refresh_collections().await.unwrap();
    assert_eq!(fetched, 1);

    let server_side = repo.get_by_id(4000).unwrap().unwrap();
    assert!(server_side.is_synced);
    assert!(repo.get_by_id(local.id).unwrap().is_some());
}

/// The startup sweep re-derives every kind of pending work from the store's
/// sync flags and the worker clears the backlog.
#[tokio::test]
async fn requeue_pending_drains_the_whole_backlog() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_repo = stack.db.collections();
    let bookmark_repo = stack.db.bookmarks();

    // an unsynced collection
    let mut pending_collection =
        linkstash::domain::collection::Collection::new("user-1", "Pending", None, None, None);
    collection_repo.add(&mut pending_collection).unwrap();

    // a synced collection holding the bookmarks below
    let mut home = linkstash::domain::collection::Collection::new("user-1", "Home", None, None, None);
    collection_repo.add(&mut home).unwrap();
    collection_repo.relabel_id(home.id, 3000).unwrap();
    collection_repo.mark_synced(3000).unwrap();

    // a synced bookmark whose flags drifted
    let mut drifted = Bookmark::new(
        3000,
        "https://example.com/drifted",
        "Drifted",
        None,
        Tag::parse_tags("t").unwrap(),
    );
    bookmark_repo.add(&mut drifted).unwrap();
    let drifted_id = drifted.id;
    bookmark_repo.mark_synced(drifted_id, Some(false), Some(false)).unwrap();
    bookmark_repo.set_favorite(drifted_id, true).unwrap();

    // a soft-deleted bookmark whose delete was never confirmed
    let mut doomed = Bookmark::new(
        3000,
        "https://example.com/doomed",
        "Doomed",
        None,
        Tag::parse_tags("t").unwrap(),
    );
    bookmark_repo.add(&mut doomed).unwrap();
    let doomed_id = doomed.id;
    bookmark_repo.mark_synced(doomed_id, Some(false), Some(false)).unwrap();
    bookmark_repo.soft_delete(doomed_id).unwrap();

    assert_eq!(stack.sync.pending_count().await.unwrap(), 3);

    let queued = stack.sync.requeue_pending().await.unwrap();
    assert_eq!(queued, 3);
    stack.sync.flush().await;

    assert_eq!(stack.sync.pending_count().await.unwrap(), 0);

    // drift pushed and shadow state updated
    let settled = bookmark_repo.get_by_id(drifted_id).unwrap().unwrap();
    assert!(settled.server_is_favorite);
    assert!(!settled.needs_flag_push());

    // tombstone purged after the confirmed delete
    assert!(bookmark_repo.get_by_id_any(doomed_id).unwrap().is_none());
}
