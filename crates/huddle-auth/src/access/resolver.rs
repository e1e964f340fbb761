//! File link permission resolver.
//!
//! Rules, first match wins:
//! 1. The file or the link is tombstoned: `none`, even for the uploader.
//! 2. The user created the link: `delete`.
//! 3. An individual grant with `can_delete`: `delete`.
//! 4. A standalone link: individual `can_download`/`can_view` only.
//! 5. Member of the chat's `moderate_all` group with a grant on the link:
//!    that grant's level (`delete`).
//! 6. Member of `view_all` with a grant on the link, and the link was
//!    uploaded at or after the user's original `joined_at`: that grant's
//!    level (`download`).
//! 7. Individual `can_download`/`can_view`, else `none`.
//!
//! Group grants with a `valid_from` in the future are ignored. Individual
//! grants never override a group rule; they are a fallback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use huddle_core::result::AppResult;
use huddle_core::traits::Clock;
use huddle_core::AccessLevel;
use huddle_database::store::StoreTx;
use huddle_entity::file::{FileLink, FileLinkPermission};
use huddle_entity::group::FileLinkGroupPermission;

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// The file or link is tombstoned.
    Deleted,
    /// The user uploaded the link.
    Uploader,
    /// An individual grant carrying `can_delete`.
    IndividualDelete,
    /// Membership in `moderate_all`.
    ModerateGroup,
    /// Membership in `view_all`, past the join watermark.
    ViewGroup,
    /// An individual view or download grant.
    Individual,
    /// Nothing applied.
    Denied,
}

/// Outcome of resolving a user's access to a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Highest level the user holds.
    pub level: AccessLevel,
    /// The rule that decided it.
    pub source: AccessSource,
}

impl AccessDecision {
    fn new(level: AccessLevel, source: AccessSource) -> Self {
        Self { level, source }
    }
}

/// Everything the decision depends on, loaded in one transaction.
#[derive(Debug, Clone)]
pub struct AccessFacts {
    /// The link being checked.
    pub link: FileLink,
    /// Whether the physical file is tombstoned (or missing).
    pub file_deleted: bool,
    /// The user's individual grant on the link.
    pub individual: Option<FileLinkPermission>,
    /// The `moderate_all` grant on the link, present only if the user is a member.
    pub moderate_grant: Option<FileLinkGroupPermission>,
    /// The `view_all` grant on the link, present only if the user is a member.
    pub view_grant: Option<FileLinkGroupPermission>,
    /// The user's original join time in the link's chat.
    pub joined_at: Option<DateTime<Utc>>,
}

impl AccessFacts {
    /// Apply the rules to these facts.
    pub fn decide(&self, user_id: Uuid, now: DateTime<Utc>) -> AccessDecision {
        if self.file_deleted || self.link.is_deleted {
            return AccessDecision::new(AccessLevel::None, AccessSource::Deleted);
        }
        if self.link.uploaded_by == user_id {
            return AccessDecision::new(AccessLevel::Delete, AccessSource::Uploader);
        }
        if self.individual.as_ref().is_some_and(|p| p.can_delete) {
            return AccessDecision::new(AccessLevel::Delete, AccessSource::IndividualDelete);
        }
        if self.link.is_standalone() {
            return self.individual_fallback();
        }

        if let Some(level) = effective_level(self.moderate_grant.as_ref(), now) {
            return AccessDecision::new(level, AccessSource::ModerateGroup);
        }

        let past_watermark = self
            .joined_at
            .is_some_and(|joined| self.link.uploaded_at >= joined);
        if past_watermark {
            if let Some(level) = effective_level(self.view_grant.as_ref(), now) {
                return AccessDecision::new(level, AccessSource::ViewGroup);
            }
        }

        self.individual_fallback()
    }

    fn individual_fallback(&self) -> AccessDecision {
        let level = self
            .individual
            .as_ref()
            .map(FileLinkPermission::fallback_level)
            .unwrap_or_default();
        if level.allows(AccessLevel::View) {
            AccessDecision::new(level, AccessSource::Individual)
        } else {
            AccessDecision::new(AccessLevel::None, AccessSource::Denied)
        }
    }
}

fn effective_level(
    grant: Option<&FileLinkGroupPermission>,
    now: DateTime<Utc>,
) -> Option<AccessLevel> {
    grant
        .filter(|g| g.is_effective(now))
        .map(FileLinkGroupPermission::level)
        .filter(|level| *level > AccessLevel::None)
}

/// Loads [`AccessFacts`] from a transaction and decides.
#[derive(Clone)]
pub struct PermissionResolver {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver").finish()
    }
}

impl PermissionResolver {
    /// Creates a new resolver.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Load the facts for `user_id` on `link`.
    pub async fn gather(
        &self,
        tx: &mut dyn StoreTx,
        link: &FileLink,
        user_id: Uuid,
    ) -> AppResult<AccessFacts> {
        let file_deleted = tx
            .find_file(link.file_id)
            .await?
            .is_none_or(|f| f.is_deleted());
        let individual = tx.find_link_permission(link.id, user_id).await?;

        let mut facts = AccessFacts {
            link: link.clone(),
            file_deleted,
            individual,
            moderate_grant: None,
            view_grant: None,
            joined_at: None,
        };

        let Some(chat_id) = link.chat_id else {
            return Ok(facts);
        };
        // A missing binding means the chat was deleted: no group grants remain.
        let Some(binding) = tx.find_binding(chat_id).await? else {
            return Ok(facts);
        };

        let grants = tx.list_group_permissions(link.id).await?;
        let grant_for = |group_id: Uuid| grants.iter().find(|g| g.group_id == group_id).cloned();

        if tx.is_group_member(binding.moderate_group_id, user_id).await? {
            facts.moderate_grant = grant_for(binding.moderate_group_id);
        }
        if tx.is_group_member(binding.view_group_id, user_id).await? {
            facts.view_grant = grant_for(binding.view_group_id);
        }
        facts.joined_at = tx
            .find_participant(chat_id, user_id)
            .await?
            .map(|p| p.joined_at);

        Ok(facts)
    }

    /// Resolve the user's access to a link.
    pub async fn resolve(
        &self,
        tx: &mut dyn StoreTx,
        link: &FileLink,
        user_id: Uuid,
    ) -> AppResult<AccessDecision> {
        let facts = self.gather(tx, link, user_id).await?;
        let decision = facts.decide(user_id, self.clock.now());
        debug!(
            link_id = %link.id,
            user_id = %user_id,
            level = %decision.level,
            source = ?decision.source,
            "Resolved file access"
        );
        Ok(decision)
    }

    /// Resolve by link id. Unknown links resolve to `none`.
    pub async fn check_access(
        &self,
        tx: &mut dyn StoreTx,
        link_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<AccessLevel> {
        match tx.find_link(link_id).await? {
            Some(link) => Ok(self.resolve(tx, &link, user_id).await?.level),
            None => Ok(AccessLevel::None),
        }
    }
}
