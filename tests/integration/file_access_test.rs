//! Integration tests for file placement, the permission resolver and its
//! join-time watermark.

mod helpers;

use helpers::{TestApp, ctx, read_all, upload_request, user};

use huddle_core::error::ErrorKind;
use huddle_core::types::pagination::PageRequest;
use huddle_core::AccessLevel;
use huddle_entity::chat::{ChatRole, ChatType};
use huddle_service::UploadRequest;

#[tokio::test]
async fn test_watermark_scenario() {
    let app = TestApp::new().await;
    let files = &app.services.files;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;

    let before = app.upload_to_chat(owner, chat.id, b"f1").await;
    app.add_member(owner, chat.id, member, ChatRole::Member).await;
    let after = app.upload_to_chat(owner, chat.id, b"f2").await;

    assert_eq!(files.check_access(before.link.id, member).await.unwrap(), AccessLevel::None);
    assert_eq!(files.check_access(after.link.id, member).await.unwrap(), AccessLevel::Download);

    app.services
        .membership
        .update_role(&ctx(owner), chat.id, member, ChatRole::Admin)
        .await
        .unwrap();
    assert_eq!(files.check_access(before.link.id, member).await.unwrap(), AccessLevel::Delete);
    assert_eq!(files.check_access(after.link.id, member).await.unwrap(), AccessLevel::Delete);

    // Demotion reapplies the original join time.
    app.services
        .membership
        .update_role(&ctx(owner), chat.id, member, ChatRole::Member)
        .await
        .unwrap();
    assert_eq!(files.check_access(before.link.id, member).await.unwrap(), AccessLevel::None);
    assert_eq!(files.check_access(after.link.id, member).await.unwrap(), AccessLevel::Download);
}

#[tokio::test]
async fn test_readonly_members_still_download() {
    let app = TestApp::new().await;
    let owner = user();
    let reader = user();
    let chat = app.create_chat(owner, ChatType::Channel, &[]).await;
    app.add_member(owner, chat.id, reader, ChatRole::Readonly).await;
    let file = app.upload_to_chat(owner, chat.id, b"bulletin").await;

    assert_eq!(
        app.services.files.check_access(file.link.id, reader).await.unwrap(),
        AccessLevel::Download
    );

    let err = app
        .services
        .uploads
        .upload_into_chat(&ctx(reader), chat.id, upload_request("reply.txt", b"no"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
}

#[tokio::test]
async fn test_denial_outcomes_are_distinct() {
    let app = TestApp::new().await;
    let owner = user();
    let late = user();
    let outsider = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let file = app.upload_to_chat(owner, chat.id, b"plan").await;
    app.add_member(owner, chat.id, late, ChatRole::Member).await;

    let err = app
        .services
        .files
        .get_info(&ctx(outsider), file.link.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);

    let err = app
        .services
        .files
        .get_info(&ctx(late), file.link.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    assert_eq!(err.access_level, Some(AccessLevel::None));

    let err = app
        .services
        .files
        .get_info(&ctx(owner), uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    // A member with view-only rights asking to delete learns what they hold.
    app.services
        .files
        .grant_link_permission(&ctx(owner), file.link.id, late, AccessLevel::View)
        .await
        .unwrap();
    let err = app
        .services
        .files
        .delete(&ctx(late), file.link.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    assert_eq!(err.access_level, Some(AccessLevel::View));
}

#[tokio::test]
async fn test_uploader_keeps_delete_after_leaving() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let file = app.upload_to_chat(member, chat.id, b"draft").await;

    app.services
        .membership
        .remove_participant(&ctx(member), chat.id, member)
        .await
        .unwrap();

    let info = app.services.files.get_info(&ctx(member), file.link.id).await.unwrap();
    assert_eq!(info.access_level, AccessLevel::Delete);
    assert_eq!(
        app.services.files.check_access(file.link.id, owner).await.unwrap(),
        AccessLevel::Delete
    );
}

#[tokio::test]
async fn test_deletion_dominates_every_grant() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let other_chat = app.create_chat(member, ChatType::Group, &[]).await;
    let file = app.upload_to_chat(owner, chat.id, b"contract").await;
    let forwarded = app
        .services
        .files
        .forward_into_chat(&ctx(member), file.link.id, other_chat.id)
        .await
        .unwrap();
    assert_eq!(forwarded.file.id, file.file.id);
    app.services
        .files
        .grant_link_permission(&ctx(owner), file.link.id, member, AccessLevel::Delete)
        .await
        .unwrap();

    app.services.files.delete(&ctx(owner), file.link.id).await.unwrap();

    let files = &app.services.files;
    for (link, who) in [
        (file.link.id, owner),
        (file.link.id, member),
        (forwarded.link.id, member),
    ] {
        assert_eq!(files.check_access(link, who).await.unwrap(), AccessLevel::None);
    }
    let err = files.get_info(&ctx(member), forwarded.link.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_moderator_delete_only_removes_placement() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let file = app.upload_to_chat(member, chat.id, b"meme").await;
    let links = {
        let mut tx = app.services.store.begin().await.unwrap();
        tx.list_links_for_file(file.file.id).await.unwrap()
    };
    assert_eq!(links.len(), 1);

    app.services.files.delete(&ctx(owner), file.link.id).await.unwrap();

    let mut tx = app.services.store.begin().await.unwrap();
    let stored = tx.find_file(file.file.id).await.unwrap().unwrap();
    assert!(!stored.is_deleted());
    let link = tx.find_link(file.link.id).await.unwrap().unwrap();
    assert!(link.is_deleted);
}

#[tokio::test]
async fn test_standalone_links_use_individual_grants() {
    let app = TestApp::new().await;
    let owner = user();
    let friend = user();
    let file = app.upload_standalone(owner, b"private bytes").await;
    assert!(file.link.chat_id.is_none());

    let files = &app.services.files;
    assert_eq!(files.check_access(file.link.id, friend).await.unwrap(), AccessLevel::None);
    let err = files.get_info(&ctx(friend), file.link.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    files
        .grant_link_permission(&ctx(owner), file.link.id, friend, AccessLevel::Download)
        .await
        .unwrap();
    assert_eq!(files.check_access(file.link.id, friend).await.unwrap(), AccessLevel::Download);

    let download = app.services.downloads.download(&ctx(friend), file.link.id).await.unwrap();
    assert_eq!(read_all(download.stream).await, b"private bytes");

    let grants = files.list_link_permissions(&ctx(owner), file.link.id).await.unwrap();
    assert_eq!(grants.len(), 2);

    assert!(files.revoke_link_permission(&ctx(owner), file.link.id, friend).await.unwrap());
    assert_eq!(files.check_access(file.link.id, friend).await.unwrap(), AccessLevel::None);

    let err = files
        .grant_link_permission(&ctx(owner), file.link.id, friend, AccessLevel::None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_download_requires_download_level() {
    let app = TestApp::new().await;
    let owner = user();
    let late = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let file = app.upload_to_chat(owner, chat.id, b"quarterly").await;
    app.add_member(owner, chat.id, late, ChatRole::Member).await;
    app.services
        .files
        .grant_link_permission(&ctx(owner), file.link.id, late, AccessLevel::View)
        .await
        .unwrap();

    let err = app
        .services
        .downloads
        .download(&ctx(late), file.link.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    assert_eq!(err.access_level, Some(AccessLevel::View));

    let download = app.services.downloads.download(&ctx(owner), file.link.id).await.unwrap();
    assert_eq!(download.file.size, 9);
    assert_eq!(read_all(download.stream).await, b"quarterly");
}

#[tokio::test]
async fn test_list_chat_files_hides_pre_join_history() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    app.upload_to_chat(owner, chat.id, b"old").await;
    app.add_member(owner, chat.id, member, ChatRole::Member).await;
    let fresh = app.upload_to_chat(owner, chat.id, b"new").await;

    let page = app
        .services
        .files
        .list_chat_files(&ctx(member), chat.id, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].link.id, fresh.link.id);
    assert_eq!(page.items[0].access_level, AccessLevel::Download);

    let page = app
        .services
        .files
        .list_chat_files(&ctx(owner), chat.id, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 2);
}

#[tokio::test]
async fn test_outsider_cannot_upload_into_chat() {
    let app = TestApp::new().await;
    let chat = app.create_chat(user(), ChatType::Group, &[]).await;
    let err = app
        .services
        .uploads
        .upload_into_chat(&ctx(user()), chat.id, upload_request("x.txt", b"x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);
}

#[tokio::test]
async fn test_size_mismatch_rejected() {
    let app = TestApp::new().await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;

    for declared in [3_u64, 64] {
        let req = UploadRequest {
            filename: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: declared,
            stream: helpers::byte_stream(b"0123456789"),
        };
        let err = app
            .services
            .uploads
            .upload_into_chat(&ctx(owner), chat.id, req)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    let mut tx = app.services.store.begin().await.unwrap();
    assert!(tx.list_links_for_chat(chat.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let mut config = huddle_core::config::AppConfig::in_memory();
    config.storage.max_upload_size_bytes = 4;
    let app = TestApp::with_config(config).await;

    let err = app
        .services
        .uploads
        .upload(&ctx(user()), upload_request("big.bin", b"too large"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_propagation_failure_rolls_back_upload() {
    let app = TestApp::new().await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;

    {
        let mut tx = app.services.store.begin().await.unwrap();
        let binding = tx.find_binding(chat.id).await.unwrap().unwrap();
        tx.delete_group(binding.view_group_id).await.unwrap();
        tx.commit().await.unwrap();
    }

    let err = app
        .services
        .uploads
        .upload_into_chat(&ctx(owner), chat.id, upload_request("a.txt", b"abc"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PropagationFailure);

    let mut tx = app.services.store.begin().await.unwrap();
    assert!(tx.list_links_for_chat(chat.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_forward_requires_download_and_poster() {
    let app = TestApp::new().await;
    let owner = user();
    let late = user();
    let source_chat = app.create_chat(owner, ChatType::Group, &[]).await;
    let file = app.upload_to_chat(owner, source_chat.id, b"slides").await;
    app.add_member(owner, source_chat.id, late, ChatRole::Member).await;
    let target = app.create_chat(late, ChatType::Group, &[]).await;

    let err = app
        .services
        .files
        .forward_into_chat(&ctx(late), file.link.id, target.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let err = app
        .services
        .files
        .forward_into_chat(&ctx(owner), file.link.id, target.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);
}
