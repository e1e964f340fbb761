//! Integration tests for messages, attachments and the activity log.

mod helpers;

use helpers::{TestApp, ctx, user};
use uuid::Uuid;

use huddle_core::error::ErrorKind;
use huddle_core::events::{EventPayload, MessageEvent};
use huddle_core::AccessLevel;
use huddle_entity::chat::{ChatRole, ChatType};
use huddle_entity::thread::{SYSTEM_THREAD_TITLE, ThreadType};
use huddle_service::{CreateThreadRequest, SendMessageRequest};

fn text(chat_id: Uuid, content: &str) -> SendMessageRequest {
    SendMessageRequest {
        chat_id,
        thread_id: None,
        parent_id: None,
        content: content.to_string(),
        file_link_ids: Vec::new(),
    }
}

async fn activity_thread_id(app: &TestApp, chat_id: Uuid) -> Uuid {
    let mut tx = app.services.store.begin().await.unwrap();
    tx.find_system_thread(chat_id, SYSTEM_THREAD_TITLE)
        .await
        .unwrap()
        .expect("activity thread")
        .id
}

#[tokio::test]
async fn test_send_and_sync_in_order() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let messages = &app.services.messages;

    let first = messages.send_message(&ctx(owner), text(chat.id, "hello")).await.unwrap();
    let second = messages.send_message(&ctx(member), text(chat.id, "hi")).await.unwrap();
    assert!(second.seq_num > first.seq_num);

    let all = messages
        .list_messages(&ctx(member), chat.id, None, 0, 50)
        .await
        .unwrap();
    assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![first.id, second.id]);

    let newer = messages
        .list_messages(&ctx(member), chat.id, None, first.seq_num, 50)
        .await
        .unwrap();
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].id, second.id);

    let err = messages
        .list_messages(&ctx(user()), chat.id, None, 0, 50)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);
}

#[tokio::test]
async fn test_send_rejections() {
    let app = TestApp::new().await;
    let owner = user();
    let reader = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    app.add_member(owner, chat.id, reader, ChatRole::Readonly).await;
    let messages = &app.services.messages;

    let err = messages.send_message(&ctx(owner), text(chat.id, "  ")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = messages.send_message(&ctx(reader), text(chat.id, "hey")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let err = messages.send_message(&ctx(user()), text(chat.id, "hey")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);

    let mut req = text(chat.id, "reply");
    req.parent_id = Some(Uuid::new_v4());
    let err = messages.send_message(&ctx(owner), req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let mut req = text(chat.id, "into the log");
    req.thread_id = Some(activity_thread_id(&app, chat.id).await);
    let err = messages.send_message(&ctx(owner), req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadOnlyThread);
}

#[tokio::test]
async fn test_thread_messages_respect_restrictions() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let other_chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let thread = app
        .services
        .threads
        .create_thread(
            &ctx(owner),
            CreateThreadRequest {
                chat_id: chat.id,
                parent_message_id: None,
                thread_type: ThreadType::User,
                title: None,
                restricted: true,
            },
        )
        .await
        .unwrap();
    let messages = &app.services.messages;

    let mut req = text(chat.id, "secret");
    req.thread_id = Some(thread.id);
    let err = messages.send_message(&ctx(member), req.clone()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let sent = messages.send_message(&ctx(owner), req.clone()).await.unwrap();
    assert_eq!(sent.thread_id, Some(thread.id));

    let mut wrong_chat = req;
    wrong_chat.chat_id = other_chat.id;
    let err = messages.send_message(&ctx(owner), wrong_chat).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = messages
        .list_messages(&ctx(member), chat.id, Some(thread.id), 0, 50)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let in_thread = messages
        .list_messages(&ctx(owner), chat.id, Some(thread.id), 0, 50)
        .await
        .unwrap();
    assert_eq!(in_thread.len(), 1);
    let main = messages.list_messages(&ctx(owner), chat.id, None, 0, 50).await.unwrap();
    assert!(main.is_empty());

    let mut tx = app.services.store.begin().await.unwrap();
    let stored = tx.find_thread(thread.id).await.unwrap().unwrap();
    assert_eq!(stored.message_count, 1);
    assert_eq!(stored.last_message_at, Some(sent.sent_at));
}

#[tokio::test]
async fn test_attachments_need_view_access() {
    let app = TestApp::new().await;
    let owner = user();
    let late = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let old = app.upload_to_chat(owner, chat.id, b"old").await;
    app.add_member(owner, chat.id, late, ChatRole::Member).await;
    let fresh = app.upload_to_chat(owner, chat.id, b"fresh").await;
    let messages = &app.services.messages;

    let mut req = text(chat.id, "");
    req.file_link_ids = vec![old.link.id];
    let err = messages.send_message(&ctx(late), req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    assert_eq!(err.access_level, Some(AccessLevel::None));

    let mut req = text(chat.id, "");
    req.file_link_ids = vec![Uuid::new_v4()];
    let err = messages.send_message(&ctx(late), req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let mut req = text(chat.id, "");
    req.file_link_ids = vec![fresh.link.id, fresh.link.id];
    let sent = messages.send_message(&ctx(late), req).await.unwrap();
    assert_eq!(sent.file_link_ids, vec![fresh.link.id]);
}

#[tokio::test]
async fn test_edit_delete_restore() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let other = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member, other]).await;
    let messages = &app.services.messages;
    let sent = messages.send_message(&ctx(member), text(chat.id, "typo")).await.unwrap();

    let err = messages
        .edit_message(&ctx(owner), sent.id, "fixed".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    let edited = messages
        .edit_message(&ctx(member), sent.id, "fixed".to_string())
        .await
        .unwrap();
    assert_eq!(edited.content, "fixed");
    assert!(edited.updated_at.is_some());

    let err = messages.delete_message(&ctx(other), sent.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let deleted = messages.delete_message(&ctx(owner), sent.id).await.unwrap();
    assert!(deleted.is_deleted);
    assert!(deleted.content.is_empty());

    let err = messages
        .edit_message(&ctx(member), sent.id, "again".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let listed = messages.list_messages(&ctx(other), chat.id, None, 0, 50).await.unwrap();
    assert!(listed[0].is_deleted);
    assert!(listed[0].content.is_empty());

    let restored = messages.restore_message(&ctx(member), sent.id).await.unwrap();
    assert!(!restored.is_deleted);
    assert_eq!(restored.content, "fixed");
}

#[tokio::test]
async fn test_activity_log_records_moderation() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let leaver = user();
    let chat = app.create_chat(owner, ChatType::Group, &[leaver]).await;
    app.add_member(owner, chat.id, member, ChatRole::Member).await;
    app.services
        .membership
        .update_role(&ctx(owner), chat.id, member, ChatRole::Admin)
        .await
        .unwrap();
    app.services
        .membership
        .remove_participant(&ctx(leaver), chat.id, leaver)
        .await
        .unwrap();

    let activity = activity_thread_id(&app, chat.id).await;
    let entries = app
        .services
        .messages
        .list_messages(&ctx(member), chat.id, Some(activity), 0, 50)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|m| m.sender_id == owner));
    assert!(entries[0].content.contains("added"));

    let err = app
        .services
        .messages
        .delete_message(&ctx(owner), entries[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadOnlyThread);
}

#[tokio::test]
async fn test_sent_event_carries_sequence() {
    let app = TestApp::new().await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let mut events = app.services.events.subscribe();

    let sent = app
        .services
        .messages
        .send_message(&ctx(owner), text(chat.id, "ping"))
        .await
        .unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.chat_id(), Some(chat.id));
    match event.payload {
        EventPayload::Message(MessageEvent::Sent { message_id, seq_num, .. }) => {
            assert_eq!(message_id, sent.id);
            assert_eq!(seq_num, sent.seq_num);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
