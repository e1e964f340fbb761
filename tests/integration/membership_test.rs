//! Integration tests for chat membership and access-group propagation.

mod helpers;

use helpers::{TestApp, ctx, upload_request, user};
use uuid::Uuid;

use huddle_core::error::ErrorKind;
use huddle_core::events::{EventPayload, MembershipEvent};
use huddle_core::types::pagination::PageRequest;
use huddle_core::AccessLevel;
use huddle_entity::chat::{ChatRole, ChatType};
use huddle_entity::thread::SYSTEM_THREAD_TITLE;
use huddle_service::CreateChatRequest;

/// Whether `user_id` is in the chat's (moderate, view) groups.
async fn groups_of(app: &TestApp, chat_id: Uuid, user_id: Uuid) -> (bool, bool) {
    let mut tx = app.services.store.begin().await.unwrap();
    let binding = tx.find_binding(chat_id).await.unwrap().expect("binding");
    (
        tx.is_group_member(binding.moderate_group_id, user_id).await.unwrap(),
        tx.is_group_member(binding.view_group_id, user_id).await.unwrap(),
    )
}

#[tokio::test]
async fn test_create_chat_binds_groups() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member, member, owner]).await;

    let participants = app
        .services
        .membership
        .list_participants(&ctx(owner), chat.id)
        .await
        .unwrap();
    assert_eq!(participants.len(), 2);
    let owner_row = participants.iter().find(|p| p.user_id == owner).unwrap();
    assert_eq!(owner_row.role, ChatRole::Admin);

    let mut tx = app.services.store.begin().await.unwrap();
    let binding = tx.find_binding(chat.id).await.unwrap().expect("binding");
    assert_ne!(binding.moderate_group_id, binding.view_group_id);
    assert!(tx.is_group_member(binding.moderate_group_id, owner).await.unwrap());
    assert!(!tx.is_group_member(binding.view_group_id, owner).await.unwrap());
    assert!(tx.is_group_member(binding.view_group_id, member).await.unwrap());
    assert!(!tx.is_group_member(binding.moderate_group_id, member).await.unwrap());

    let activity = tx
        .find_system_thread(chat.id, SYSTEM_THREAD_TITLE)
        .await
        .unwrap();
    assert!(activity.is_some());
}

#[tokio::test]
async fn test_create_chat_rejects_blank_name() {
    let app = TestApp::new().await;
    let err = app
        .services
        .chats
        .create_chat(
            &ctx(user()),
            CreateChatRequest {
                name: "   ".to_string(),
                chat_type: ChatType::Group,
                member_ids: Vec::new(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_private_chat_holds_two() {
    let app = TestApp::new().await;
    let owner = user();

    let err = app
        .services
        .chats
        .create_chat(
            &ctx(owner),
            CreateChatRequest {
                name: "dm".to_string(),
                chat_type: ChatType::Private,
                member_ids: vec![user(), user()],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let chat = app.create_chat(owner, ChatType::Private, &[user()]).await;
    let err = app
        .services
        .membership
        .add_participant(&ctx(owner), chat.id, user(), ChatRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_add_participant_outcomes() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;

    let err = app
        .services
        .membership
        .add_participant(&ctx(owner), chat.id, member, ChatRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyExists);

    let err = app
        .services
        .membership
        .add_participant(&ctx(member), chat.id, user(), ChatRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let err = app
        .services
        .membership
        .add_participant(&ctx(user()), chat.id, user(), ChatRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotParticipant);

    let err = app
        .services
        .membership
        .add_participant(&ctx(owner), Uuid::new_v4(), user(), ChatRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_membership_events_published_after_commit() {
    let app = TestApp::new().await;
    let mut events = app.services.events.subscribe();
    let owner = user();
    let newcomer = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    app.add_member(owner, chat.id, newcomer, ChatRole::Readonly).await;

    let created = events.recv().await.unwrap();
    assert!(matches!(
        created.payload,
        EventPayload::Membership(MembershipEvent::ChatCreated { .. })
    ));
    let added = events.recv().await.unwrap();
    assert_eq!(added.actor_id, Some(owner));
    match added.payload {
        EventPayload::Membership(MembershipEvent::ParticipantAdded { user_id, role, .. }) => {
            assert_eq!(user_id, newcomer);
            assert_eq!(role, "readonly");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // A rejected add publishes nothing.
    let _ = app
        .services
        .membership
        .add_participant(&ctx(owner), chat.id, newcomer, ChatRole::Member)
        .await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_last_admin_is_protected() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;

    let err = app
        .services
        .membership
        .remove_participant(&ctx(owner), chat.id, owner)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = app
        .services
        .membership
        .update_role(&ctx(owner), chat.id, owner, ChatRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    app.services
        .membership
        .update_role(&ctx(owner), chat.id, member, ChatRole::Admin)
        .await
        .unwrap();
    app.services
        .membership
        .remove_participant(&ctx(owner), chat.id, owner)
        .await
        .unwrap();
    assert!(!app.services.membership.is_participant(chat.id, owner).await.unwrap());
}

#[tokio::test]
async fn test_self_removal_and_moderator_removal() {
    let app = TestApp::new().await;
    let owner = user();
    let a = user();
    let b = user();
    let chat = app.create_chat(owner, ChatType::Group, &[a, b]).await;

    let err = app
        .services
        .membership
        .remove_participant(&ctx(a), chat.id, b)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    app.services
        .membership
        .remove_participant(&ctx(a), chat.id, a)
        .await
        .unwrap();
    app.services
        .membership
        .remove_participant(&ctx(owner), chat.id, b)
        .await
        .unwrap();

    let ids = app.services.membership.get_participant_ids(chat.id).await.unwrap();
    assert_eq!(ids, vec![owner]);

    let err = app
        .services
        .membership
        .remove_participant(&ctx(owner), chat.id, b)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_role_changes_keep_groups_exclusive() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;

    let exclusive = |moderate: bool, view: bool| moderate != view;

    for role in [ChatRole::Admin, ChatRole::Readonly, ChatRole::Member, ChatRole::Admin] {
        app.services
            .membership
            .update_role(&ctx(owner), chat.id, member, role)
            .await
            .unwrap();

        let mut tx = app.services.store.begin().await.unwrap();
        let binding = tx.find_binding(chat.id).await.unwrap().unwrap();
        let moderate = tx.is_group_member(binding.moderate_group_id, member).await.unwrap();
        let view = tx.is_group_member(binding.view_group_id, member).await.unwrap();
        assert!(exclusive(moderate, view), "role {role} left groups {moderate}/{view}");
        assert_eq!(moderate, role == ChatRole::Admin);
    }
}

#[tokio::test]
async fn test_failed_add_leaves_no_participant() {
    let app = TestApp::new().await;
    let owner = user();
    let newcomer = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;
    {
        let mut tx = app.services.store.begin().await.unwrap();
        let binding = tx.find_binding(chat.id).await.unwrap().unwrap();
        assert!(tx.delete_group(binding.view_group_id).await.unwrap());
        tx.commit().await.unwrap();
    }

    let err = app
        .services
        .membership
        .add_participant(&ctx(owner), chat.id, newcomer, ChatRole::Member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PropagationFailure);
    assert!(!app.services.membership.is_participant(chat.id, newcomer).await.unwrap());
}

#[tokio::test]
async fn test_failed_promotion_keeps_role_and_group() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let view_group_id = {
        let mut tx = app.services.store.begin().await.unwrap();
        let binding = tx.find_binding(chat.id).await.unwrap().unwrap();
        assert!(tx.delete_group(binding.moderate_group_id).await.unwrap());
        tx.commit().await.unwrap();
        binding.view_group_id
    };

    let err = app
        .services
        .membership
        .update_role(&ctx(owner), chat.id, member, ChatRole::Admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PropagationFailure);

    let mut tx = app.services.store.begin().await.unwrap();
    let row = tx.find_participant(chat.id, member).await.unwrap().unwrap();
    assert_eq!(row.role, ChatRole::Member);
    assert!(tx.is_group_member(view_group_id, member).await.unwrap());
}

#[tokio::test]
async fn test_failed_removal_keeps_participant() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let binding = {
        let mut tx = app.services.store.begin().await.unwrap();
        let binding = tx.delete_binding(chat.id).await.unwrap().expect("binding");
        tx.commit().await.unwrap();
        binding
    };

    let err = app
        .services
        .membership
        .remove_participant(&ctx(owner), chat.id, member)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PropagationFailure);
    assert!(app.services.membership.is_participant(chat.id, member).await.unwrap());

    let mut tx = app.services.store.begin().await.unwrap();
    assert!(tx.is_group_member(binding.view_group_id, member).await.unwrap());
}

#[tokio::test]
async fn test_removal_revokes_group_access_but_keeps_grants() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let shared = app.upload_to_chat(owner, chat.id, b"minutes").await;
    let granted = app.upload_to_chat(owner, chat.id, b"budget").await;
    app.services
        .files
        .grant_link_permission(&ctx(owner), granted.link.id, member, AccessLevel::View)
        .await
        .unwrap();

    let files = &app.services.files;
    assert_eq!(files.check_access(shared.link.id, member).await.unwrap(), AccessLevel::Download);

    app.services
        .membership
        .remove_participant(&ctx(owner), chat.id, member)
        .await
        .unwrap();

    assert_eq!(files.check_access(shared.link.id, member).await.unwrap(), AccessLevel::None);
    assert_eq!(files.check_access(granted.link.id, member).await.unwrap(), AccessLevel::View);

    let mut tx = app.services.store.begin().await.unwrap();
    let binding = tx.find_binding(chat.id).await.unwrap().unwrap();
    assert!(!tx.is_group_member(binding.view_group_id, member).await.unwrap());
}

#[tokio::test]
async fn test_rejoin_moves_watermark() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let file = app.upload_to_chat(owner, chat.id, b"history").await;
    let files = &app.services.files;
    assert_eq!(files.check_access(file.link.id, member).await.unwrap(), AccessLevel::Download);

    app.services
        .membership
        .remove_participant(&ctx(member), chat.id, member)
        .await
        .unwrap();
    app.add_member(owner, chat.id, member, ChatRole::Member).await;

    assert_eq!(files.check_access(file.link.id, member).await.unwrap(), AccessLevel::None);
}

#[tokio::test]
async fn test_list_chats_and_rename() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let first = app.create_chat(owner, ChatType::Group, &[member]).await;
    app.create_chat(owner, ChatType::Channel, &[]).await;

    let page = app
        .services
        .chats
        .list_chats(&ctx(member), &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].id, first.id);

    let err = app
        .services
        .chats
        .rename_chat(&ctx(member), first.id, "renamed")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    let renamed = app
        .services
        .chats
        .rename_chat(&ctx(owner), first.id, "renamed")
        .await
        .unwrap();
    assert_eq!(renamed.name, "renamed");
    assert!(renamed.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_delete_chat_keeps_uploader_access() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;
    let file = app.upload_to_chat(member, chat.id, b"deck").await;

    let err = app
        .services
        .chats
        .delete_chat(&ctx(member), chat.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);

    app.services.chats.delete_chat(&ctx(owner), chat.id).await.unwrap();

    let err = app.services.chats.get_chat(&ctx(owner), chat.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let files = &app.services.files;
    assert_eq!(files.check_access(file.link.id, member).await.unwrap(), AccessLevel::Delete);
    assert_eq!(files.check_access(file.link.id, owner).await.unwrap(), AccessLevel::None);
}

#[tokio::test]
async fn test_concurrent_admin_departures_keep_one_admin() {
    let app = TestApp::new().await;
    let owner = user();
    let second = user();
    let chat = app.create_chat(owner, ChatType::Group, &[second]).await;
    app.services
        .membership
        .update_role(&ctx(owner), chat.id, second, ChatRole::Admin)
        .await
        .unwrap();

    let membership = &app.services.membership;
    let (owner_ctx, second_ctx) = (ctx(owner), ctx(second));
    let (first, other) = tokio::join!(
        membership.remove_participant(&owner_ctx, chat.id, owner),
        membership.remove_participant(&second_ctx, chat.id, second),
    );
    let refused = match (first, other) {
        (Ok(()), Err(e)) | (Err(e), Ok(())) => e,
        outcome => panic!("exactly one admin may leave: {outcome:?}"),
    };
    assert_eq!(refused.kind, ErrorKind::Conflict);

    let mut tx = app.services.store.begin().await.unwrap();
    assert_eq!(tx.count_admins(chat.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_adds_respect_private_cap() {
    let app = TestApp::new().await;
    let owner = user();
    let chat = app.create_chat(owner, ChatType::Private, &[]).await;

    let membership = &app.services.membership;
    let owner_ctx = ctx(owner);
    let (first, other) = tokio::join!(
        membership.add_participant(&owner_ctx, chat.id, user(), ChatRole::Member),
        membership.add_participant(&owner_ctx, chat.id, user(), ChatRole::Member),
    );
    let refused = match (first, other) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        outcome => panic!("exactly one add may succeed: {outcome:?}"),
    };
    assert_eq!(refused.kind, ErrorKind::Conflict);
    assert_eq!(membership.get_participant_ids(chat.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_role_changes_leave_one_group() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;

    let membership = &app.services.membership;
    let owner_ctx = ctx(owner);
    let (promoted, demoted) = tokio::join!(
        membership.update_role(&owner_ctx, chat.id, member, ChatRole::Admin),
        membership.update_role(&owner_ctx, chat.id, member, ChatRole::Readonly),
    );
    promoted.unwrap();
    demoted.unwrap();

    let role = {
        let mut tx = app.services.store.begin().await.unwrap();
        tx.find_participant(chat.id, member).await.unwrap().unwrap().role
    };
    let (moderate, view) = groups_of(&app, chat.id, member).await;
    assert_ne!(moderate, view);
    assert_eq!(moderate, role.can_moderate());
}

#[tokio::test]
async fn test_concurrent_add_and_remove_agree_with_groups() {
    let app = TestApp::new().await;
    let owner = user();
    let newcomer = user();
    let chat = app.create_chat(owner, ChatType::Group, &[]).await;

    let membership = &app.services.membership;
    let owner_ctx = ctx(owner);
    let (added, removed) = tokio::join!(
        membership.add_participant(&owner_ctx, chat.id, newcomer, ChatRole::Member),
        membership.remove_participant(&owner_ctx, chat.id, newcomer),
    );
    added.unwrap();
    if let Err(e) = removed {
        assert_eq!(e.kind, ErrorKind::NotFound);
    }

    let participating = membership.is_participant(chat.id, newcomer).await.unwrap();
    let (moderate, view) = groups_of(&app, chat.id, newcomer).await;
    assert!(!moderate);
    assert_eq!(view, participating);
}

#[tokio::test]
async fn test_concurrent_upload_and_removal() {
    let app = TestApp::new().await;
    let owner = user();
    let member = user();
    let chat = app.create_chat(owner, ChatType::Group, &[member]).await;

    let (owner_ctx, member_ctx) = (ctx(owner), ctx(member));
    let (uploaded, removed) = tokio::join!(
        app.services
            .uploads
            .upload_into_chat(&member_ctx, chat.id, upload_request("race.txt", b"late")),
        app.services.membership.remove_participant(&owner_ctx, chat.id, member),
    );
    removed.unwrap();
    assert_eq!(groups_of(&app, chat.id, member).await, (false, false));

    match uploaded {
        Ok(info) => {
            let mut tx = app.services.store.begin().await.unwrap();
            assert_eq!(tx.list_group_permissions(info.link.id).await.unwrap().len(), 2);
            drop(tx);
            let files = &app.services.files;
            assert_eq!(files.check_access(info.link.id, member).await.unwrap(), AccessLevel::Delete);
        }
        Err(e) => assert_eq!(e.kind, ErrorKind::NotParticipant),
    }
}
