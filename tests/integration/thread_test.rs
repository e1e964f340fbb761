//! Integration tests for the thread hierarchy: depth cap, restricted
//! cascade, system threads and conference threads.

mod helpers;

use std::sync::Arc;

use async_trait::async_trait;
use helpers::{TestApp, ctx, user};
use uuid::Uuid;

use huddle_core::error::ErrorKind;
use huddle_core::result::AppResult;
use huddle_core::types::pagination::PageRequest;
use huddle_entity::chat::{ChatRole, ChatType};
use huddle_entity::thread::{
    CONFERENCE_THREAD_TITLE, MAX_THREAD_DEPTH, SYSTEM_THREAD_TITLE, Thread, ThreadType,
};
use huddle_service::{
    ConferenceDirectory, ConferenceState, CreateSubthreadRequest, CreateThreadRequest,
};

fn top_level(chat_id: Uuid, restricted: bool) -> CreateThreadRequest {
    CreateThreadRequest {
        chat_id,
        parent_message_id: None,
        thread_type: ThreadType::User,
        title: Some("planning".to_string()),
        restricted,
    }
}

fn nested(restricted: bool) -> CreateSubthreadRequest {
    CreateSubthreadRequest {
        title: None,
        thread_type: ThreadType::User,
        restricted,
    }
}

async fn activity_thread(app: &TestApp, chat_id: Uuid) -> Thread {
    let mut tx = app.services.store.begin().await.unwrap();
    tx.find_system_thread(chat_id, SYSTEM_THREAD_TITLE)
        .await
        .unwrap()
        .expect("activity thread")
}

#[tokio::test]
async fn test_depth_cap() {
    let app = TestApp::new().await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let threads = &app.services.threads;

    let mut current = threads.create_thread(&ctx(owner), top_level(chat.id, false)).await.unwrap();
    assert_eq!(current.depth, 0);
    for depth in 1..=MAX_THREAD_DEPTH {
        current = threads
            .create_subthread(&ctx(owner), current.id, nested(false))
            .await
            .unwrap();
        assert_eq!(current.depth, depth);
    }

    let err = threads
        .create_subthread(&ctx(owner), current.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MaxDepthExceeded);
}

#[tokio::test]
async fn test_restricted_ancestor_blocks_descendants() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let threads = &app.services.threads;

    let root = threads.create_thread(&ctx(owner), top_level(chat.id, true)).await.unwrap();
    let child = threads
        .create_subthread(&ctx(owner), root.id, nested(false))
        .await
        .unwrap();
    let grandchild = threads
        .create_subthread(&ctx(owner), child.id, nested(true))
        .await
        .unwrap();

    for id in [root.id, child.id, grandchild.id] {
        assert!(threads.check_thread_access(id, owner).await.unwrap());
        assert!(!threads.check_thread_access(id, member).await.unwrap());
    }

    // Membership of a deeper thread never compensates for a restricted ancestor.
    threads
        .add_thread_participant(&ctx(owner), grandchild.id, member)
        .await
        .unwrap();
    assert!(!threads.check_thread_access(grandchild.id, member).await.unwrap());

    threads
        .add_thread_participant(&ctx(owner), root.id, member)
        .await
        .unwrap();
    assert!(threads.check_thread_access(root.id, member).await.unwrap());
    assert!(threads.check_thread_access(child.id, member).await.unwrap());
    assert!(threads.check_thread_access(grandchild.id, member).await.unwrap());

    assert!(threads.remove_thread_participant(&ctx(member), root.id, member).await.unwrap());
    assert!(!threads.check_thread_access(grandchild.id, member).await.unwrap());

    let err = threads
        .create_subthread(&ctx(member), child.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    assert!(!threads.check_thread_access(Uuid::new_v4(), owner).await.unwrap());
}

#[tokio::test]
async fn test_leaving_chat_drops_thread_membership() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let threads = &app.services.threads;
    let secret = threads.create_thread(&ctx(owner), top_level(chat.id, true)).await.unwrap();
    threads
        .add_thread_participant(&ctx(owner), secret.id, member)
        .await
        .unwrap();

    app.services
        .membership
        .remove_participant(&ctx(owner), chat.id, member)
        .await
        .unwrap();
    app.add_member(owner, chat.id, member, ChatRole::Member).await;

    assert!(!threads.check_thread_access(secret.id, member).await.unwrap());
    let allow_list = threads.list_thread_participants(&ctx(owner), secret.id).await.unwrap();
    assert_eq!(allow_list.len(), 1);
    assert_eq!(allow_list[0].user_id, owner);
}

#[tokio::test]
async fn test_thread_participant_rules() {
    let app = TestApp::new().await;
    let owner = user();
    let creator = user();
    let bystander = user();
    let chat = app.create_chat(owner, ChatType::Group, &[creator, bystander]).await;
    let threads = &app.services.threads;
    let thread = threads.create_thread(&ctx(creator), top_level(chat.id, true)).await.unwrap();
    assert_eq!(thread.created_by, Some(creator));

    let err = threads
        .add_thread_participant(&ctx(creator), thread.id, user())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);

    let err = threads
        .add_thread_participant(&ctx(bystander), thread.id, bystander)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    assert!(threads.add_thread_participant(&ctx(creator), thread.id, bystander).await.unwrap());
    assert!(!threads.add_thread_participant(&ctx(creator), thread.id, bystander).await.unwrap());

    let err = threads
        .list_thread_participants(&ctx(user()), thread.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);
}

#[tokio::test]
async fn test_list_threads_filters_by_access() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let threads = &app.services.threads;
    let open = threads.create_thread(&ctx(owner), top_level(chat.id, false)).await.unwrap();
    threads.create_thread(&ctx(owner), top_level(chat.id, true)).await.unwrap();
    threads
        .create_subthread(&ctx(owner), open.id, nested(true))
        .await
        .unwrap();
    threads
        .create_subthread(&ctx(member), open.id, nested(false))
        .await
        .unwrap();

    let page = PageRequest::default();
    // The activity thread is visible to every participant.
    assert_eq!(threads.list_threads(&ctx(owner), chat.id, &page).await.unwrap().total_items, 3);
    assert_eq!(threads.list_threads(&ctx(member), chat.id, &page).await.unwrap().total_items, 2);
    assert_eq!(
        threads.list_subthreads(&ctx(member), open.id, &page).await.unwrap().total_items,
        1
    );

    let err = threads
        .list_threads(&ctx(user()), chat.id, &page)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);
}

#[tokio::test]
async fn test_system_threads_are_read_only() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let threads = &app.services.threads;
    let activity = activity_thread(&app, chat.id).await;
    assert!(activity.created_by.is_none());
    assert!(threads.check_thread_access(activity.id, member).await.unwrap());

    let err = threads
        .create_subthread(&ctx(owner), activity.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadOnlyThread);

    let err = threads.archive_thread(&ctx(owner), activity.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadOnlyThread);

    let mut req = top_level(chat.id, false);
    req.thread_type = ThreadType::System;
    let err = threads.create_thread(&ctx(member), req.clone()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    let system = threads.create_thread(&ctx(owner), req).await.unwrap();
    assert!(system.is_system());
    assert!(system.created_by.is_none());
}

#[tokio::test]
async fn test_readonly_cannot_start_threads() {
    let app = TestApp::new().await;
    let owner = user();
    let reader = user();
    let chat = app.create_chat(owner, ChatType::Channel, &[]).await;
    app.add_member(owner, chat.id, reader, ChatRole::Readonly).await;

    let err = app
        .services
        .threads
        .create_thread(&ctx(reader), top_level(chat.id, false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
}

#[tokio::test]
async fn test_archive_blocks_new_subthreads() {
    let app = TestApp::new().await;
    let owner = user();
    let creator = user();
    let other = user();
    let chat = app.create_chat(owner, ChatType::Group, &[creator, other]).await;
    let threads = &app.services.threads;
    let thread = threads.create_thread(&ctx(creator), top_level(chat.id, false)).await.unwrap();

    let err = threads.archive_thread(&ctx(other), thread.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let archived = threads.archive_thread(&ctx(creator), thread.id).await.unwrap();
    assert!(archived.is_archived);
    let again = threads.archive_thread(&ctx(owner), thread.id).await.unwrap();
    assert!(again.is_archived);

    let err = threads
        .create_subthread(&ctx(creator), thread.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_outsider_sees_access_error_before_thread_state() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let outsider = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let threads = &app.services.threads;

    let mut deepest = threads.create_thread(&ctx(owner), top_level(chat.id, false)).await.unwrap();
    for _ in 0..MAX_THREAD_DEPTH {
        deepest = threads
            .create_subthread(&ctx(owner), deepest.id, nested(false))
            .await
            .unwrap();
    }
    let err = threads
        .create_subthread(&ctx(outsider), deepest.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);

    let hidden = threads.create_thread(&ctx(owner), top_level(chat.id, true)).await.unwrap();
    threads.archive_thread(&ctx(owner), hidden.id).await.unwrap();
    let err = threads
        .create_subthread(&ctx(member), hidden.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    let err = threads
        .create_subthread(&ctx(outsider), hidden.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);

    let activity = activity_thread(&app, chat.id).await;
    let err = threads
        .create_subthread(&ctx(outsider), activity.id, nested(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);
    let err = threads.archive_thread(&ctx(outsider), activity.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);
}

#[tokio::test]
async fn test_thread_on_foreign_message_rejected() {
    let app = TestApp::new().await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let mut req = top_level(chat.id, false);
    req.parent_message_id = Some(Uuid::new_v4());

    let err = app.services.threads.create_thread(&ctx(owner), req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[derive(Debug)]
struct ActiveConference;

#[async_trait]
impl ConferenceDirectory for ActiveConference {
    async fn conference_state(&self, _chat_id: Uuid) -> AppResult<ConferenceState> {
        Ok(ConferenceState {
            active: true,
            scheduled: false,
            participant_ids: Vec::new(),
        })
    }
}

#[tokio::test]
async fn test_conference_thread_sync() {
    let app = TestApp::new().await;
    let chat = app.create_chat(user(), ChatType::Group, &[]).await;
    assert!(app.services.conferences.sync_conference_thread(chat.id).await.unwrap().is_none());

    let app = TestApp::with_directory(Arc::new(ActiveConference)).await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let first = app
        .services
        .conferences
        .sync_conference_thread(chat.id)
        .await
        .unwrap()
        .expect("conference thread");
    assert!(first.is_system());
    let second = app
        .services
        .conferences
        .sync_conference_thread(chat.id)
        .await
        .unwrap()
        .expect("conference thread");
    assert_eq!(first.id, second.id);

    let err = app
        .services
        .conferences
        .sync_conference_thread(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_concurrent_conference_syncs_create_one_thread() {
    let app = TestApp::with_directory(Arc::new(ActiveConference)).await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let conferences = &app.services.conferences;

    let (first, second) = tokio::join!(
        conferences.sync_conference_thread(chat.id),
        conferences.sync_conference_thread(chat.id),
    );
    let first = first.unwrap().expect("conference thread");
    let second = second.unwrap().expect("conference thread");
    assert_eq!(first.id, second.id);

    let page = PageRequest::default();
    let listed = app.services.threads.list_threads(&ctx(owner), chat.id, &page).await.unwrap();
    let conference_threads = listed
        .items
        .iter()
        .filter(|t| t.is_system() && t.title.as_deref() == Some(CONFERENCE_THREAD_TITLE))
        .count();
    assert_eq!(conference_threads, 1);
}
