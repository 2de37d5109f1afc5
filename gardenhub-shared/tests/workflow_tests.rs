//! End-to-end workflows over the in-memory store
//!
//! Every test wires the real services (bus, badge engine, notification
//! listener) through `Services::build`.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use gardenhub_shared::badges::{Measure, Trigger};
use gardenhub_shared::error::DomainError;
use gardenhub_shared::gardens::Reconciliation;
use gardenhub_shared::models::badge::BadgeCategory;
use gardenhub_shared::models::event::{AttendanceStatus, CreateGardenEvent, EventVisibility};
use gardenhub_shared::models::forum::{ContentState, CreateComment, CreatePost};
use gardenhub_shared::models::garden::{CreateGarden, Garden};
use gardenhub_shared::models::membership::{MembershipRole, MembershipStatus};
use gardenhub_shared::models::notification::NotificationCategory;
use gardenhub_shared::models::report::{ReportReason, ReportTargetKind};
use gardenhub_shared::models::task::{CreateTask, TaskType};
use gardenhub_shared::models::user::UserRole;
use gardenhub_shared::moderation::{FileReport, ReportTarget};
use gardenhub_shared::notify::{Outgoing, RecordingPushGateway};
use gardenhub_shared::services::Services;
use gardenhub_shared::store::memory::MemoryStore;
use gardenhub_shared::store::{Counter, Store};

struct Harness {
    store: Arc<MemoryStore>,
    push: Arc<RecordingPushGateway>,
    services: Services,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::with_badge_catalog().await);
    let push = Arc::new(RecordingPushGateway::new());
    let services = Services::build(store.clone(), push.clone());
    Harness {
        store,
        push,
        services,
    }
}

async fn found_garden(h: &Harness, owner: Uuid) -> Garden {
    h.services
        .memberships
        .create_garden(
            owner,
            CreateGarden {
                name: "Community Plot".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

async fn join(h: &Harness, manager: Uuid, user: Uuid, garden_id: Uuid) {
    let request = h.services.memberships.request_join(user, garden_id).await.unwrap();
    h.services.memberships.accept(manager, request.id).await.unwrap();
}

async fn managers_of(h: &Harness, garden_id: Uuid) -> Vec<Uuid> {
    h.store
        .garden_memberships(garden_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.is_active_manager())
        .map(|m| m.user_id)
        .collect()
}

// Badges

#[tokio::test]
async fn test_retriggering_follow_never_duplicates_badges() {
    let h = harness().await;
    let ada = h.store.seed_user("Ada").await;
    let bram = h.store.seed_user("Bram").await;

    h.services.community.follow(ada, bram).await.unwrap();
    h.services.community.unfollow(ada, bram).await.unwrap();
    h.services.community.follow(ada, bram).await.unwrap();

    assert_eq!(h.store.badge_keys(ada).await, vec!["following_1"]);
    assert_eq!(h.store.badge_keys(bram).await, vec!["followers_1"]);
    assert_eq!(h.store.user_badge_rows().await, 2);
}

#[tokio::test]
async fn test_award_badge_is_idempotent_and_ignores_unknown_keys() {
    let h = harness().await;
    let ada = h.store.seed_user("Ada").await;

    assert!(h.services.badges.award_badge(ada, "welcome").await.unwrap().is_some());
    assert!(h.services.badges.award_badge(ada, "welcome").await.unwrap().is_none());
    assert!(h.services.badges.award_badge(ada, "no_such_badge").await.unwrap().is_none());
    assert_eq!(h.store.user_badge_rows().await, 1);
}

#[tokio::test]
async fn test_registration_awards_welcome_badge() {
    let h = harness().await;
    let (user, _) = h
        .services
        .community
        .register(gardenhub_shared::community::Registration {
            email: "cas@example.com".to_string(),
            password: "courgette99".to_string(),
            display_name: Some("Cas".to_string()),
            location: None,
        })
        .await
        .unwrap();

    assert_eq!(h.store.badge_keys(user.id).await, vec!["welcome"]);
    let notes = h.store.notifications_for(user.id).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].category, NotificationCategory::Badge);
    assert_eq!(notes[0].message, "You earned the Welcome Gardener badge!");
}

#[tokio::test]
async fn test_going_to_summer_event_awards_participation_and_season() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let garden = found_garden(&h, owner).await;

    let event = h
        .services
        .memberships
        .create_event(
            owner,
            CreateGardenEvent {
                garden_id: garden.id,
                created_by: owner,
                title: "Harvest party".to_string(),
                description: None,
                visibility: EventVisibility::Public,
                starts_at: Utc.with_ymd_and_hms(2024, 7, 14, 16, 0, 0).unwrap(),
            },
        )
        .await
        .unwrap();

    h.services
        .memberships
        .mark_attendance(owner, event.id, AttendanceStatus::Maybe)
        .await
        .unwrap();
    assert!(!h.store.badge_keys(owner).await.contains(&"event_goer_1".to_string()));

    h.services
        .memberships
        .mark_attendance(owner, event.id, AttendanceStatus::Going)
        .await
        .unwrap();
    let keys = h.store.badge_keys(owner).await;
    assert!(keys.contains(&"event_goer_1".to_string()));
    assert!(keys.contains(&"season_summer".to_string()));
    assert!(!keys.contains(&"season_winter".to_string()));
}

#[tokio::test]
async fn test_counter_crossing_several_thresholds_awards_every_tier() {
    let h = harness().await;
    let manager = h.store.seed_user("Ada").await;
    let garden = found_garden(&h, manager).await;

    for n in 1..=9 {
        h.store
            .insert_task(
                CreateTask {
                    garden_id: garden.id,
                    title: format!("Bed {n}"),
                    created_by: Some(manager),
                    ..Default::default()
                },
                &[],
            )
            .await
            .unwrap();
    }
    assert!(h.store.badge_keys(manager).await.iter().all(|k| !k.starts_with("task_creator")));

    h.services
        .tasks
        .create(
            manager,
            CreateTask {
                garden_id: garden.id,
                title: "Bed 10".to_string(),
                ..Default::default()
            },
            &[],
        )
        .await
        .unwrap();

    let keys = h.store.badge_keys(manager).await;
    assert!(keys.contains(&"task_creator_1".to_string()));
    assert!(keys.contains(&"task_creator_10".to_string()));
}

#[tokio::test]
async fn test_failed_badge_notice_keeps_remaining_tiers() {
    let h = harness().await;
    let manager = h.store.seed_user("Ada").await;
    let garden = found_garden(&h, manager).await;
    for n in 1..=9 {
        h.store
            .insert_task(
                CreateTask {
                    garden_id: garden.id,
                    title: format!("Row {n}"),
                    created_by: Some(manager),
                    ..Default::default()
                },
                &[],
            )
            .await
            .unwrap();
    }
    h.store.fail_notifications_for(manager).await;

    let awarded = h
        .services
        .badges
        .evaluate(Trigger {
            user_id: manager,
            category: BadgeCategory::TaskCreation,
            measure: Measure::Counter(Counter::TasksCreated(manager)),
        })
        .await
        .unwrap();

    assert_eq!(awarded.len(), 2);
    let keys = h.store.badge_keys(manager).await;
    assert!(keys.contains(&"task_creator_1".to_string()));
    assert!(keys.contains(&"task_creator_10".to_string()));
}

// Notifications

#[tokio::test]
async fn test_opted_out_user_gets_no_notifications_or_pushes() {
    let h = harness().await;
    let ada = h.store.seed_user("Ada").await;
    let bram = h.store.seed_user("Bram").await;
    h.store.add_device(bram, "device-bram").await;
    h.store
        .update_profile(bram, |p| p.receives_notifications = false)
        .await;

    let sent = h
        .services
        .dispatcher
        .send_notification(
            Some(bram),
            Outgoing::new(NotificationCategory::System, "Hello", "World"),
        )
        .await
        .unwrap();
    assert!(sent.is_none());

    h.services.community.follow(ada, bram).await.unwrap();

    assert!(h.store.notifications_for(bram).await.is_empty());
    assert!(h.push.sent().await.iter().all(|(token, _)| token != "device-bram"));
    // badges are still earned
    assert_eq!(h.store.badge_keys(bram).await, vec!["followers_1"]);
}

#[tokio::test]
async fn test_push_failure_keeps_notification() {
    let store = Arc::new(MemoryStore::new());
    let push = Arc::new(RecordingPushGateway::failing_for(&["broken"]));
    let services = Services::build(store.clone(), push.clone());
    let ada = store.seed_user("Ada").await;
    store.add_device(ada, "broken").await;
    store.add_device(ada, "working").await;

    let sent = services
        .dispatcher
        .send_notification(
            Some(ada),
            Outgoing::new(NotificationCategory::System, "Frost tonight", "Cover the seedlings")
                .with_link("/gardens"),
        )
        .await
        .unwrap();

    assert!(sent.is_some());
    assert_eq!(store.notifications_for(ada).await.len(), 1);
    let delivered = push.sent().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, "working");
    assert_eq!(delivered[0].1.link.as_deref(), Some("/gardens"));
}

#[tokio::test]
async fn test_comment_notifies_post_author_only() {
    let h = harness().await;
    let ada = h.store.seed_user("Ada").await;
    let bram = h.store.seed_user("Bram").await;

    let post = h
        .services
        .community
        .create_post(CreatePost {
            author_id: ada,
            title: "Blight on tomatoes".to_string(),
            content: "Brown spots on the lower leaves".to_string(),
            image: None,
        })
        .await
        .unwrap();

    h.services
        .community
        .create_comment(CreateComment {
            post_id: post.id,
            author_id: ada,
            content: "Update: it spread".to_string(),
            image: None,
        })
        .await
        .unwrap();
    let forum_notes = |notes: Vec<gardenhub_shared::models::notification::Notification>| {
        notes
            .into_iter()
            .filter(|n| n.category == NotificationCategory::Forum)
            .count()
    };
    assert_eq!(forum_notes(h.store.notifications_for(ada).await), 0);

    h.services
        .community
        .create_comment(CreateComment {
            post_id: post.id,
            author_id: bram,
            content: "Remove affected leaves".to_string(),
            image: None,
        })
        .await
        .unwrap();
    assert_eq!(forum_notes(h.store.notifications_for(ada).await), 1);
    assert_eq!(forum_notes(h.store.notifications_for(bram).await), 0);
}

// Membership lifecycle

#[tokio::test]
async fn test_join_request_notifies_managers() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let joiner = h.store.seed_user("Bram").await;
    let garden = found_garden(&h, owner).await;

    h.services.memberships.request_join(joiner, garden.id).await.unwrap();

    let notes = h.store.notifications_for(owner).await;
    assert!(notes
        .iter()
        .any(|n| n.category == NotificationCategory::Membership));
}

#[tokio::test]
async fn test_accepting_keeps_manager_set() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let joiner = h.store.seed_user("Bram").await;
    let garden = found_garden(&h, owner).await;

    let request = h.services.memberships.request_join(joiner, garden.id).await.unwrap();
    let accepted = h.services.memberships.accept(owner, request.id).await.unwrap();

    assert_eq!(accepted.status, MembershipStatus::Accepted);
    assert_eq!(accepted.role, MembershipRole::Worker);
    assert_eq!(managers_of(&h, garden.id).await, vec![owner]);
    assert!(h.store.badge_keys(joiner).await.contains(&"garden_joiner_1".to_string()));
    assert!(h
        .store
        .notifications_for(joiner)
        .await
        .iter()
        .any(|n| n.category == NotificationCategory::Membership));
}

#[tokio::test]
async fn test_last_manager_leaving_promotes_earliest_member() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let first = h.store.seed_user("Bram").await;
    let second = h.store.seed_user("Cas").await;
    let garden = found_garden(&h, owner).await;
    join(&h, owner, first, garden.id).await;
    join(&h, owner, second, garden.id).await;

    let outcome = h.services.memberships.leave(owner, garden.id).await.unwrap();

    assert_eq!(outcome, Reconciliation::Promoted(first));
    assert_eq!(managers_of(&h, garden.id).await, vec![first]);
    assert!(h.store.badge_keys(first).await.contains(&"garden_creator_1".to_string()));
}

#[tokio::test]
async fn test_removing_only_member_deletes_garden() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let pending = h.store.seed_user("Bram").await;
    let garden = found_garden(&h, owner).await;
    h.services.memberships.request_join(pending, garden.id).await.unwrap();

    let membership = h.store.find_membership(owner, garden.id).await.unwrap().unwrap();
    let outcome = h
        .services
        .memberships
        .remove_member(owner, membership.id)
        .await
        .unwrap();

    assert_eq!(outcome, Reconciliation::GardenDeleted);
    assert!(!h.store.garden_exists(garden.id).await);
}

#[tokio::test]
async fn test_worker_leaving_leaves_garden_unchanged() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let worker = h.store.seed_user("Bram").await;
    let garden = found_garden(&h, owner).await;
    join(&h, owner, worker, garden.id).await;

    let outcome = h.services.memberships.leave(worker, garden.id).await.unwrap();
    assert_eq!(outcome, Reconciliation::Unchanged);
    assert!(h.store.garden_exists(garden.id).await);
}

// Tasks

#[tokio::test]
async fn test_task_lifecycle_notifies_and_awards() {
    let h = harness().await;
    let manager = h.store.seed_user("Ada").await;
    let worker = h.store.seed_user("Bram").await;
    let garden = found_garden(&h, manager).await;
    join(&h, manager, worker, garden.id).await;

    let task = h
        .services
        .tasks
        .create(
            manager,
            CreateTask {
                garden_id: garden.id,
                title: "Turn the compost".to_string(),
                task_type: TaskType::Maintenance,
                ..Default::default()
            },
            &[worker],
        )
        .await
        .unwrap();

    assert!(h.store.badge_keys(manager).await.contains(&"task_creator_1".to_string()));
    let assigned: Vec<_> = h
        .store
        .notifications_for(worker)
        .await
        .into_iter()
        .filter(|n| n.category == NotificationCategory::Task)
        .collect();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].link.as_deref(), Some(format!("/tasks/{}", task.id).as_str()));

    h.services.tasks.accept(worker, task.id).await.unwrap();
    h.services.tasks.complete(worker, task.id).await.unwrap();

    assert!(h.store.badge_keys(worker).await.contains(&"task_completer_1".to_string()));
    assert!(h
        .store
        .notifications_for(manager)
        .await
        .iter()
        .any(|n| n.category == NotificationCategory::Task));
}

// Moderation

async fn moderator(h: &Harness) -> Uuid {
    let id = h.store.seed_user("Mod").await;
    h.store.set_role(id, UserRole::Moderator).await;
    id
}

#[tokio::test]
async fn test_duplicate_and_self_reports_are_rejected() {
    let h = harness().await;
    let ada = h.store.seed_user("Ada").await;
    let bram = h.store.seed_user("Bram").await;

    let report = || FileReport {
        target: ReportTarget::new(ReportTargetKind::User, bram),
        reason: ReportReason::Harassment,
        description: None,
    };
    let filed = h.services.moderation.create_report(ada, report()).await.unwrap();
    assert_eq!(filed.reported_user_id, Some(bram));

    let err = h.services.moderation.create_report(ada, report()).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let err = h.services.moderation.create_report(bram, report()).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    let err = h
        .services
        .moderation
        .create_report(
            ada,
            FileReport {
                target: ReportTarget::new(ReportTargetKind::Post, Uuid::new_v4()),
                reason: ReportReason::Spam,
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_valid_post_report_removes_post_and_notifies_reporter() {
    let h = harness().await;
    let ada = h.store.seed_user("Ada").await;
    let spammer = h.store.seed_user("Spam").await;
    let moderator = moderator(&h).await;

    let post = h
        .services
        .community
        .create_post(CreatePost {
            author_id: spammer,
            title: "Cheap seeds".to_string(),
            content: "Click here".to_string(),
            image: None,
        })
        .await
        .unwrap();
    let report = h
        .services
        .moderation
        .create_report(
            ada,
            FileReport {
                target: ReportTarget::new(ReportTargetKind::Post, post.id),
                reason: ReportReason::Spam,
                description: Some("advertising".to_string()),
            },
        )
        .await
        .unwrap();

    let err = h.services.moderation.review(ada, report.id, true).await.unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let reviewed = h.services.moderation.review(moderator, report.id, true).await.unwrap();
    assert!(reviewed.reviewed);
    assert_eq!(reviewed.is_valid, Some(true));
    assert_eq!(reviewed.reviewed_by, Some(moderator));

    let stored = h.store.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.state, ContentState::Removed);
    assert!(h
        .store
        .notifications_for(ada)
        .await
        .iter()
        .any(|n| n.category == NotificationCategory::Moderation));

    let err = h.services.moderation.review(moderator, report.id, false).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn test_garden_report_targets_its_manager() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let reporter = h.store.seed_user("Bram").await;
    let garden = found_garden(&h, owner).await;

    let report = h
        .services
        .moderation
        .create_report(
            reporter,
            FileReport {
                target: ReportTarget::new(ReportTargetKind::Garden, garden.id),
                reason: ReportReason::Inappropriate,
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(report.reported_user_id, Some(owner));
}

#[tokio::test]
async fn test_suspension_expires_and_is_lifted() {
    let h = harness().await;
    let user = h.store.seed_user("Ada").await;
    let moderator = moderator(&h).await;

    let profile = h
        .services
        .moderation
        .suspend_user(moderator, user, "spam", None)
        .await
        .unwrap();
    assert!(profile.is_suspended);
    assert!(profile.is_restricted(Utc::now()));
    assert!(h
        .store
        .notifications_for(user)
        .await
        .iter()
        .any(|n| n.category == NotificationCategory::Moderation));

    let still = h
        .services
        .moderation
        .lift_expired_suspension(user, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert!(still.is_suspended);

    let later = Utc::now() + chrono::Duration::days(8);
    let lifted = h
        .services
        .moderation
        .lift_expired_suspension(user, later)
        .await
        .unwrap()
        .unwrap();
    assert!(!lifted.is_suspended);
    assert!(lifted.suspended_until.is_none());
}

#[tokio::test]
async fn test_ban_removes_content_and_deactivates() {
    let h = harness().await;
    let troll = h.store.seed_user("Troll").await;
    let moderator = moderator(&h).await;
    let post = h
        .services
        .community
        .create_post(CreatePost {
            author_id: troll,
            title: "Flame".to_string(),
            content: "bait".to_string(),
            image: None,
        })
        .await
        .unwrap();

    let profile = h
        .services
        .moderation
        .ban_user(moderator, troll, "repeated abuse")
        .await
        .unwrap();

    assert!(profile.is_banned);
    assert!(!h.store.get_user(troll).await.unwrap().unwrap().is_active);
    assert_eq!(
        h.store.get_post(post.id).await.unwrap().unwrap().state,
        ContentState::Removed
    );
}

#[tokio::test]
async fn test_hide_and_unhide_garden() {
    let h = harness().await;
    let owner = h.store.seed_user("Ada").await;
    let moderator = moderator(&h).await;
    let garden = found_garden(&h, owner).await;

    let hidden = h
        .services
        .moderation
        .hide_garden(moderator, garden.id, "offensive name")
        .await
        .unwrap();
    assert!(hidden.is_hidden);
    assert_eq!(hidden.hidden_reason.as_deref(), Some("offensive name"));

    let visible = h.services.moderation.unhide_garden(moderator, garden.id).await.unwrap();
    assert!(!visible.is_hidden);
    assert!(visible.hidden_reason.is_none());

    h.services.moderation.delete_garden(moderator, garden.id).await.unwrap();
    assert!(!h.store.garden_exists(garden.id).await);
}
