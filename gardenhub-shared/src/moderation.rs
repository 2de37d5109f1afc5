/// Report workflow and moderation actions
///
/// A report moves `pending → reviewed` exactly once, carrying a valid/invalid
/// verdict. Valid reports against posts and comments remove the content;
/// reports against users and gardens are followed up with an explicit action
/// (suspend, ban, hide, delete). Reversal actions never reopen a report.
///
/// # Example
///
/// ```no_run
/// use gardenhub_shared::moderation::{FileReport, ModerationService, ReportTarget};
/// use gardenhub_shared::models::report::{ReportReason, ReportTargetKind};
/// # use uuid::Uuid;
/// # async fn example(moderation: ModerationService, reporter: Uuid, post_id: Uuid, moderator: Uuid)
/// #     -> Result<(), Box<dyn std::error::Error>> {
/// let report = moderation
///     .create_report(reporter, FileReport {
///         target: ReportTarget::new(ReportTargetKind::Post, post_id),
///         reason: ReportReason::Spam,
///         description: None,
///     })
///     .await?;
///
/// moderation.review(moderator, report.id, true).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::authorization::require_moderator;
use crate::error::{DomainError, DomainResult};
use crate::models::forum::ContentState;
use crate::models::garden::Garden;
use crate::models::notification::NotificationCategory;
use crate::models::report::{CreateReport, Report, ReportReason, ReportTargetKind};
use crate::models::user::{Profile, Suspension};
use crate::notify::{NotificationDispatcher, Outgoing};
use crate::store::Store;

/// Suspension length when none is given
pub const DEFAULT_SUSPENSION_DAYS: i64 = 7;

/// Longest suspension a moderator can hand out
pub const MAX_SUSPENSION_DAYS: i64 = 3650;

/// Reported entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportTarget {
    pub kind: ReportTargetKind,
    pub id: Uuid,
}

impl ReportTarget {
    pub fn new(kind: ReportTargetKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    /// Resolves the user answerable for the target
    ///
    /// Users answer for themselves, authors for their posts and comments,
    /// and a garden's accepted manager for the garden (None if it has none).
    ///
    /// # Errors
    ///
    /// `NotFound` if the target does not exist.
    pub async fn owner(&self, store: &dyn Store) -> DomainResult<Option<Uuid>> {
        let not_found = || DomainError::NotFound(capitalized(self.kind.as_str()));
        match self.kind {
            ReportTargetKind::User => store
                .get_user(self.id)
                .await?
                .map(|u| Some(u.id))
                .ok_or_else(not_found),
            ReportTargetKind::Post => store
                .get_post(self.id)
                .await?
                .map(|p| Some(p.author_id))
                .ok_or_else(not_found),
            ReportTargetKind::Comment => store
                .get_comment(self.id)
                .await?
                .map(|c| Some(c.author_id))
                .ok_or_else(not_found),
            ReportTargetKind::Garden => {
                store.get_garden(self.id).await?.ok_or_else(not_found)?;
                Ok(store
                    .garden_memberships(self.id)
                    .await?
                    .into_iter()
                    .find(|m| m.is_active_manager())
                    .map(|m| m.user_id))
            }
        }
    }

    /// Takes the content down; returns false for kinds that need an explicit action
    pub async fn remove(&self, store: &dyn Store) -> DomainResult<bool> {
        match self.kind {
            ReportTargetKind::Post => Ok(store.set_post_state(self.id, ContentState::Removed).await?),
            ReportTargetKind::Comment => Ok(store
                .set_comment_state(self.id, ContentState::Removed)
                .await?),
            ReportTargetKind::User | ReportTargetKind::Garden => Ok(false),
        }
    }
}

fn capitalized(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Report submission
#[derive(Debug, Clone)]
pub struct FileReport {
    pub target: ReportTarget,
    pub reason: ReportReason,
    pub description: Option<String>,
}

pub struct ModerationService {
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Files a report
    ///
    /// # Errors
    ///
    /// - `Validation` when reporting yourself or your own content
    /// - `Conflict` when the reporter already reported this target
    /// - `NotFound` when the target does not exist
    pub async fn create_report(&self, reporter_id: Uuid, report: FileReport) -> DomainResult<Report> {
        let reported_user_id = report.target.owner(self.store.as_ref()).await?;
        if reported_user_id == Some(reporter_id) {
            return Err(DomainError::validation("target", "you cannot report yourself"));
        }

        let created = self
            .store
            .insert_report(CreateReport {
                reporter_id,
                reported_user_id,
                target_kind: report.target.kind,
                target_id: report.target.id,
                reason: report.reason,
                description: report.description,
            })
            .await
            .map_err(|e| DomainError::conflict_or_store(e, "you already reported this"))?;

        info!(
            report_id = %created.id,
            target_kind = report.target.kind.as_str(),
            target_id = %report.target.id,
            "Report filed"
        );
        Ok(created)
    }

    /// Records a verdict; valid post/comment reports remove the content
    pub async fn review(&self, reviewer_id: Uuid, report_id: Uuid, is_valid: bool) -> DomainResult<Report> {
        require_moderator(self.store.as_ref(), reviewer_id).await?;

        let report = self
            .store
            .get_report(report_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Report".to_string()))?;
        if report.reviewed {
            return Err(DomainError::Conflict("report already reviewed".to_string()));
        }

        let reviewed = self
            .store
            .mark_report_reviewed(report_id, is_valid, reviewer_id)
            .await?
            .ok_or_else(|| DomainError::Conflict("report already reviewed".to_string()))?;

        if is_valid {
            let target = ReportTarget::new(reviewed.target_kind, reviewed.target_id);
            if target.remove(self.store.as_ref()).await? {
                info!(%report_id, target_kind = target.kind.as_str(), "Reported content removed");
            }
        }

        let verdict = if is_valid {
            "Thanks, action was taken on the content you reported."
        } else {
            "We reviewed your report and found no violation."
        };
        self.notify(
            reviewed.reporter_id,
            Outgoing::new(NotificationCategory::Moderation, "Your report was reviewed", verdict),
        )
        .await;

        Ok(reviewed)
    }

    /// Suspends a user for `days` (default [`DEFAULT_SUSPENSION_DAYS`])
    pub async fn suspend_user(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        reason: &str,
        days: Option<i64>,
    ) -> DomainResult<Profile> {
        require_moderator(self.store.as_ref(), actor_id).await?;
        let days = days.unwrap_or(DEFAULT_SUSPENSION_DAYS);
        if !(1..=MAX_SUSPENSION_DAYS).contains(&days) {
            return Err(DomainError::validation(
                "days",
                format!("must be between 1 and {MAX_SUSPENSION_DAYS}"),
            ));
        }
        if reason.trim().is_empty() {
            return Err(DomainError::validation("reason", "must not be empty"));
        }

        let until = Utc::now() + Duration::days(days);
        let profile = self
            .store
            .set_suspension(
                user_id,
                Some(Suspension {
                    reason: reason.to_string(),
                    until,
                }),
            )
            .await?
            .ok_or_else(|| DomainError::NotFound("User".to_string()))?;

        info!(%user_id, %actor_id, %until, "User suspended");
        self.notify(
            user_id,
            Outgoing::new(
                NotificationCategory::Moderation,
                "Your account has been suspended",
                format!("Reason: {reason}. The suspension ends on {}.", until.format("%Y-%m-%d")),
            )
            .with_link("/profile/me/suspension"),
        )
        .await;

        Ok(profile)
    }

    pub async fn unsuspend_user(&self, actor_id: Uuid, user_id: Uuid) -> DomainResult<Profile> {
        require_moderator(self.store.as_ref(), actor_id).await?;
        self.store
            .set_suspension(user_id, None)
            .await?
            .ok_or_else(|| DomainError::NotFound("User".to_string()))
    }

    /// Permanently bans a user: removes their content and deactivates the account
    pub async fn ban_user(&self, actor_id: Uuid, user_id: Uuid, reason: &str) -> DomainResult<Profile> {
        require_moderator(self.store.as_ref(), actor_id).await?;
        if self.store.get_user(user_id).await?.is_none() {
            return Err(DomainError::NotFound("User".to_string()));
        }

        let (posts, comments) = self.store.remove_user_content(user_id).await?;
        self.store.set_user_active(user_id, false).await?;
        let profile = self
            .store
            .set_banned(user_id, reason)
            .await?
            .ok_or_else(|| DomainError::NotFound("User".to_string()))?;

        info!(%user_id, %actor_id, posts, comments, "User banned");
        Ok(profile)
    }

    pub async fn hide_garden(&self, actor_id: Uuid, garden_id: Uuid, reason: &str) -> DomainResult<Garden> {
        require_moderator(self.store.as_ref(), actor_id).await?;
        self.store
            .set_garden_hidden(garden_id, true, Some(reason))
            .await?
            .ok_or_else(|| DomainError::NotFound("Garden".to_string()))
    }

    pub async fn unhide_garden(&self, actor_id: Uuid, garden_id: Uuid) -> DomainResult<Garden> {
        require_moderator(self.store.as_ref(), actor_id).await?;
        self.store
            .set_garden_hidden(garden_id, false, None)
            .await?
            .ok_or_else(|| DomainError::NotFound("Garden".to_string()))
    }

    pub async fn delete_garden(&self, actor_id: Uuid, garden_id: Uuid) -> DomainResult<()> {
        require_moderator(self.store.as_ref(), actor_id).await?;
        if !self.store.delete_garden(garden_id).await? {
            return Err(DomainError::NotFound("Garden".to_string()));
        }
        info!(%garden_id, %actor_id, "Garden deleted by moderator");
        Ok(())
    }

    /// Lifts a suspension whose expiry has passed; returns the current profile
    pub async fn lift_expired_suspension(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Profile>> {
        let Some(profile) = self.store.get_profile(user_id).await? else {
            return Ok(None);
        };
        if !profile.suspension_expired(now) {
            return Ok(Some(profile));
        }

        info!(%user_id, "Suspension expired, lifting");
        Ok(self.store.set_suspension(user_id, None).await?)
    }

    async fn notify(&self, user_id: Uuid, outgoing: Outgoing) {
        if let Err(e) = self.dispatcher.send_notification(Some(user_id), outgoing).await {
            warn!(%user_id, error = %e, "Failed to send moderation notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalized() {
        assert_eq!(capitalized("comment"), "Comment");
        assert_eq!(capitalized(""), "");
    }

    #[tokio::test]
    async fn test_suspension_length_is_bounded() {
        use crate::models::user::UserRole;
        use crate::notify::NoopPushGateway;
        use crate::store::memory::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        let moderator = store.seed_user("Mod").await;
        store.set_role(moderator, UserRole::Moderator).await;
        let user = store.seed_user("Ada").await;
        let dispatcher = Arc::new(NotificationDispatcher::new(store.clone(), Arc::new(NoopPushGateway)));
        let moderation = ModerationService::new(store.clone(), dispatcher);

        for days in [0, MAX_SUSPENSION_DAYS + 1, i64::MAX] {
            let err = moderation
                .suspend_user(moderator, user, "spam", Some(days))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation { .. }));
        }

        let profile = moderation
            .suspend_user(moderator, user, "spam", Some(MAX_SUSPENSION_DAYS))
            .await
            .unwrap();
        assert!(profile.is_suspended);
    }

    #[test]
    fn test_report_target_equality() {
        let id = Uuid::new_v4();
        assert_eq!(
            ReportTarget::new(ReportTargetKind::Post, id),
            ReportTarget::new(ReportTargetKind::Post, id)
        );
        assert_ne!(
            ReportTarget::new(ReportTargetKind::Post, id),
            ReportTarget::new(ReportTargetKind::Comment, id)
        );
    }
}
