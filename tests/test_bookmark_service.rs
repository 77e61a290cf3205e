// tests/test_bookmark_service.rs
mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{build_stack, MockRemoteApi};
use linkstash::application::error::ApplicationError;
use linkstash::application::services::sync_service::DrainPolicy;
use linkstash::domain::collection::Collection;
use linkstash::domain::error::DomainError;
use linkstash::domain::repositories::bookmark_repository::BookmarkRepository;
use linkstash::domain::repositories::collection_repository::CollectionRepository;
use linkstash::domain::tag::Tag;

fn no_tags() -> HashSet<Tag> {
    HashSet::new()
}

async fn add_collection(stack: &common::TestStack) -> i64 {
    let mut collection = Collection::new("user-1", "Inbox", None, None, None);
    let repo = stack.db.collections();
    repo.add(&mut collection).unwrap();
    // fixtures start out synced so only bookmark traffic is pending
    repo.mark_synced(collection.id).unwrap();
    collection.id
}

#[tokio::test]
async fn create_rejects_invalid_input_before_the_store() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;

    let err = stack
        .bookmarks
        .create_bookmark(collection_id, "not a url", "Title", None, no_tags())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Validation { field: "url", .. }));

    let err = stack
        .bookmarks
        .create_bookmark(collection_id, "ftp://example.com", "Title", None, no_tags())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Validation { field: "url", .. }));

    let err = stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "  ", None, no_tags())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Validation { field: "title", .. }));

    // nothing reached the store or the backend
    assert!(stack.db.bookmarks().list_all().unwrap().is_empty());
    assert!(stack.mock.call_log().is_empty());
}

#[tokio::test]
async fn duplicate_url_surfaces_as_typed_store_error() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;

    stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "First", None, no_tags())
        .await
        .unwrap();

    let err = stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "Second", None, no_tags())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::DuplicateUrl(_))
    ));
}

#[tokio::test]
async fn sync_failure_never_rolls_back_the_local_write() {
    let stack = build_stack(DrainPolicy::IsolateItems, 1);
    let collection_id = add_collection(&stack).await;
    stack.mock.fail_all(503);

    let bookmark = stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "Kept", None, no_tags())
        .await
        .unwrap();

    stack.sync.flush().await;

    // the write stuck locally and is still pending a push
    let kept = stack.db.bookmarks().get_by_id(bookmark.id).unwrap().unwrap();
    assert!(!kept.is_synced);
    assert!(stack.sync.pending_count().await.unwrap() >= 1);
}

#[tokio::test]
async fn confirmed_create_relabels_and_recounts() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;

    let bookmark = stack
        .bookmarks
        .create_bookmark(
            collection_id,
            "https://example.com",
            "Synced",
            None,
            Tag::parse_tags("rust").unwrap(),
        )
        .await
        .unwrap();
    let provisional = bookmark.id;

    stack.sync.flush().await;

    let repo = stack.db.bookmarks();
    assert!(repo.get_by_id(provisional).unwrap().is_none());
    let synced = repo.get_by_id(1000).unwrap().unwrap();
    assert!(synced.is_synced);
    assert!(!synced.is_local_id);

    let collection = stack.db.collections().get_by_id(collection_id).unwrap().unwrap();
    assert_eq!(collection.item_count, 1);

    assert_eq!(stack.sync.pending_count().await.unwrap(), 0);
}

/// Two concurrent toggles on the same id serialize at the store: the final
/// state matches one of the two orderings, here both end at the original
/// value.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_do_not_lose_updates() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;
    // keep the id provisional so the toggles race only against each other
    stack.mock.fail_all(503);

    let bookmark = stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "Toggled", None, no_tags())
        .await
        .unwrap();

    let service_a = Arc::clone(&stack.bookmarks);
    let service_b = Arc::clone(&stack.bookmarks);
    let id = bookmark.id;

    let task_a = tokio::spawn(async move { service_a.toggle_favorite(id).await });
    let task_b = tokio::spawn(async move { service_b.toggle_favorite(id).await });

    task_a.await.unwrap().unwrap();
    task_b.await.unwrap().unwrap();

    let settled = stack.db.bookmarks().get_by_id(id).unwrap().unwrap();
    assert!(!settled.is_favorite);
}

#[tokio::test]
async fn delete_of_local_only_bookmark_skips_the_backend() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;
    // keep the create unconfirmed so the id stays provisional
    stack.mock.fail_all(503);

    let bookmark = stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "Gone", None, no_tags())
        .await
        .unwrap();
    stack.sync.flush().await;

    assert!(stack.bookmarks.delete_bookmark(bookmark.id).await.unwrap());
    stack.sync.flush().await;

    // purged outright, no tombstone was queued
    assert!(stack.db.bookmarks().get_by_id_any(bookmark.id).unwrap().is_none());
    assert!(stack
        .mock
        .call_log()
        .iter()
        .all(|call| !call.starts_with("delete_bookmark")));
}

#[tokio::test]
async fn delete_of_synced_bookmark_waits_for_the_confirmed_remote_delete() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;

    stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "Synced", None, no_tags())
        .await
        .unwrap();
    stack.sync.flush().await;
    let server_id = 1000;

    // backend down: the row is soft-deleted but stays as a tombstone
    stack.mock.fail_all(503);
    assert!(stack.bookmarks.delete_bookmark(server_id).await.unwrap());
    stack.sync.flush().await;

    let repo = stack.db.bookmarks();
    let tombstone = repo.get_by_id_any(server_id).unwrap().unwrap();
    assert!(tombstone.is_deleted);

    // backend back up: the startup sweep re-derives the delete and the
    // confirmed push purges the row
    stack.mock.succeed();
    stack.sync.requeue_pending().await.unwrap();
    stack.sync.flush().await;

    assert!(repo.get_by_id_any(server_id).unwrap().is_none());
}

#[tokio::test]
async fn refresh_reconciles_server_rows_with_local_state() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;
    let repo = stack.db.bookmarks();

    // a local row with unpushed edits (the backend is down while it is
    // created, so it stays unsynced)
    stack.mock.fail_all(503);
    let kept_local = stack
        .bookmarks
        .create_bookmark(
            collection_id,
            "https://example.com/local-edit",
            "Local Edit",
            None,
            no_tags(),
        )
        .await
        .unwrap();
    stack.sync.flush().await;
    stack.mock.succeed();

    // a synced row the server no longer has
    let mut orphan = linkstash::domain::bookmark::Bookmark::new(
        collection_id,
        "https://example.com/orphan",
        "Orphan",
        None,
        no_tags(),
    );
    repo.add(&mut orphan).unwrap();
    let orphan_id = orphan.id;
    repo.relabel_id(orphan_id, 900).unwrap();
    repo.mark_synced(900, Some(false), Some(false)).unwrap();

    stack.mock.set_remote_bookmarks(vec![MockRemoteApi::bookmark_dto(
        3000,
        collection_id,
        "Server Row",
        "https://example.com/server",
    )]);

    let fetched = stack.bookmarks.refresh_collection(collection_id).await.unwrap();
    assert_eq!(fetched, 1);

    // server row landed with shadow state set
    let server_row = repo.get_by_id(3000).unwrap().unwrap();
    assert!(server_row.is_synced);
    assert!(!server_row.is_local_id);

    // unpushed local edit kept, orphaned synced row dropped
    assert!(repo.get_by_id(kept_local.id).unwrap().is_some());
    assert!(repo.get_by_id_any(900).unwrap().is_none());
}

#[tokio::test]
async fn refresh_failure_is_a_retryable_network_error() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;
    stack.mock.fail_all(503);

    let err = stack
        .bookmarks
        .refresh_collection(collection_id)
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn observe_bookmarks_re_yields_after_writes() {
    let stack = build_stack(DrainPolicy::IsolateItems, 5);
    let collection_id = add_collection(&stack).await;
    // keep ids stable while the stream is observed
    stack.mock.fail_all(503);

    let mut live = stack.bookmarks.observe_bookmarks();
    assert!(live.next().await.unwrap().unwrap().is_empty());

    stack
        .bookmarks
        .create_bookmark(collection_id, "https://example.com", "Watched", None, no_tags())
        .await
        .unwrap();

    let current = live.next().await.unwrap().unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].title, "Watched");
}
