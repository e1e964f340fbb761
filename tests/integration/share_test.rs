//! Integration tests for public share links.

mod helpers;

use chrono::Duration;
use helpers::{TestApp, ctx, read_all, start_time, user};
use uuid::Uuid;

use huddle_core::error::ErrorKind;
use huddle_core::AccessLevel;
use huddle_entity::chat::{ChatRole, ChatType};
use huddle_service::CreateShareLinkRequest;

#[tokio::test]
async fn test_create_and_download_by_token() {
    let app = TestApp::new().await;
    let owner = user();
    let file = app.upload_standalone(owner, b"press kit").await;

    let share = app
        .services
        .shares
        .create_share_link(
            &ctx(owner),
            file.file.id,
            CreateShareLinkRequest {
                max_downloads: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(share.token.len(), 43);
    assert!(share.is_active);
    // Without an explicit expiry the configured cap applies.
    let cap = Duration::days(i64::from(app.config.share.max_expiry_days));
    assert_eq!(share.expires_at, Some(share.created_at + cap));

    let access = &app.services.share_access;
    let first = access.download_by_token(&share.token, None).await.unwrap();
    assert_eq!(read_all(first.stream).await, b"press kit");
    access.download_by_token(&share.token, None).await.unwrap();

    let err = access.download_by_token(&share.token, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShareLinkExhausted);

    let err = access.download_by_token("no-such-token", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_password_protected_link() {
    let app = TestApp::new().await;
    let owner = user();
    let file = app.upload_standalone(owner, b"payroll").await;
    let share = app
        .services
        .shares
        .create_share_link(
            &ctx(owner),
            file.file.id,
            CreateShareLinkRequest {
                password: Some("hunter22".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(share.password_hash.as_deref().is_some_and(|h| h != "hunter22"));

    let access = &app.services.share_access;
    for attempt in [None, Some("wrong")] {
        let err = access.download_by_token(&share.token, attempt).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ShareLinkBadPassword);
    }
    let download = access.download_by_token(&share.token, Some("hunter22")).await.unwrap();
    assert_eq!(read_all(download.stream).await, b"payroll");

    let err = app
        .services
        .shares
        .create_share_link(
            &ctx(owner),
            file.file.id,
            CreateShareLinkRequest {
                password: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_revoked_beats_expired_and_password() {
    let app = TestApp::new().await;
    let owner = user();
    let file = app.upload_standalone(owner, b"memo").await;
    let share = app
        .services
        .shares
        .create_share_link(
            &ctx(owner),
            file.file.id,
            CreateShareLinkRequest {
                password: Some("secret".to_string()),
                expires_at: Some(start_time() + Duration::hours(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    app.clock.advance(Duration::hours(2));
    let access = &app.services.share_access;
    let err = access.download_by_token(&share.token, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShareLinkExpired);

    app.services.shares.revoke_share_link(&ctx(owner), share.id).await.unwrap();
    let err = access.download_by_token(&share.token, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShareLinkRevoked);

    // Revoking twice is harmless.
    app.services.shares.revoke_share_link(&ctx(owner), share.id).await.unwrap();
}

#[tokio::test]
async fn test_expiry_validation() {
    let app = TestApp::new().await;
    let owner = user();
    let file = app.upload_standalone(owner, b"x").await;
    let shares = &app.services.shares;

    for expires_at in [start_time() - Duration::minutes(1), start_time() + Duration::days(365)] {
        let err = shares
            .create_share_link(
                &ctx(owner),
                file.file.id,
                CreateShareLinkRequest {
                    expires_at: Some(expires_at),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    let err = shares
        .create_share_link(
            &ctx(owner),
            file.file.id,
            CreateShareLinkRequest {
                max_downloads: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_share_rights_follow_download_access() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let late = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let file = app.upload_to_chat(owner, chat.id, b"roadmap").await;
    app.add_member(owner, chat.id, late, ChatRole::Member).await;
    let shares = &app.services.shares;

    let err = shares
        .create_share_link(&ctx(late), file.file.id, CreateShareLinkRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    assert_eq!(err.access_level, Some(AccessLevel::None));

    let by_member = shares
        .create_share_link(&ctx(member), file.file.id, CreateShareLinkRequest::default())
        .await
        .unwrap();
    let by_owner = shares
        .create_share_link(&ctx(owner), file.file.id, CreateShareLinkRequest::default())
        .await
        .unwrap();

    let seen_by_member = shares.list_share_links(&ctx(member), file.file.id).await.unwrap();
    assert_eq!(seen_by_member.len(), 1);
    assert_eq!(seen_by_member[0].id, by_member.id);
    assert_eq!(shares.list_share_links(&ctx(owner), file.file.id).await.unwrap().len(), 2);

    let err = shares.revoke_share_link(&ctx(member), by_owner.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
    shares.revoke_share_link(&ctx(owner), by_member.id).await.unwrap();

    let err = shares.revoke_share_link(&ctx(owner), Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_deleted_file_stops_sharing() {
    let app = TestApp::new().await;
    let owner = user();
    let file = app.upload_standalone(owner, b"gone soon").await;
    let share = app
        .services
        .shares
        .create_share_link(&ctx(owner), file.file.id, CreateShareLinkRequest::default())
        .await
        .unwrap();

    app.services.files.delete(&ctx(owner), file.link.id).await.unwrap();

    let err = app
        .services
        .share_access
        .download_by_token(&share.token, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .services
        .shares
        .create_share_link(&ctx(owner), file.file.id, CreateShareLinkRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_password_checks_do_not_spend_downloads() {
    let app = TestApp::new().await;
    let owner = user();
    let file = app.upload_standalone(owner, b"roadmap").await;
    let share = app
        .services
        .shares
        .create_share_link(
            &ctx(owner),
            file.file.id,
            CreateShareLinkRequest {
                password: Some("letmein1".to_string()),
                max_downloads: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let access = &app.services.share_access;
    let err = access.download_by_token(&share.token, Some("nope")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShareLinkBadPassword);
    {
        let mut tx = app.services.store.begin().await.unwrap();
        let stored = tx.find_share_link(share.id).await.unwrap().unwrap();
        assert_eq!(stored.download_count, 0);
    }

    let (first, second) = tokio::join!(
        access.download_by_token(&share.token, Some("letmein1")),
        access.download_by_token(&share.token, Some("letmein1")),
    );
    let refused = match (first, second) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        _ => panic!("exactly one download may succeed"),
    };
    assert_eq!(refused.kind, ErrorKind::ShareLinkExhausted);

    let mut tx = app.services.store.begin().await.unwrap();
    let stored = tx.find_share_link(share.id).await.unwrap().unwrap();
    assert_eq!(stored.download_count, 1);
}
