/// Trigger table: which event re-evaluates which badge category
///
/// | Event | Measure | Category |
/// |---|---|---|
/// | task created | tasks created by creator | task creation |
/// | task completed | tasks completed, per assignee | task completion |
/// | follow added | follower's following count | people followed |
/// | follow added | followed user's follower count | followers gained |
/// | post created | author's active posts | forum posts |
/// | comment created | author's active comments | forum answers |
/// | profile created | fixed 1 | welcome |
/// | membership accepted | user's accepted memberships | garden joining |
/// | first manager membership | user's manager memberships | garden creation |
/// | attendance "going" | user's going attendances | event participation |
/// | attendance "going" | season of event start | event seasonal |

use uuid::Uuid;

use crate::events::DomainEvent;
use crate::models::badge::{BadgeCategory, BadgeRequirement, Season};
use crate::models::event::AttendanceStatus;
use crate::store::Counter;

/// What a trigger compares against badge requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// Recompute a counter with a full count query
    Counter(Counter),

    /// Constant value (onboarding badges)
    Fixed(i64),

    /// Exact season match
    Season(Season),
}

/// One badge category to evaluate for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub user_id: Uuid,
    pub category: BadgeCategory,
    pub measure: Measure,
}

impl Trigger {
    fn counter(user_id: Uuid, category: BadgeCategory, counter: Counter) -> Self {
        Self {
            user_id,
            category,
            measure: Measure::Counter(counter),
        }
    }
}

/// Lists the evaluations an event calls for
pub fn triggers_for(event: &DomainEvent) -> Vec<Trigger> {
    match event {
        DomainEvent::ProfileCreated { user_id } => vec![Trigger {
            user_id: *user_id,
            category: BadgeCategory::Welcome,
            measure: Measure::Fixed(1),
        }],

        DomainEvent::TaskCreated {
            created_by: Some(creator),
            ..
        } => vec![Trigger::counter(
            *creator,
            BadgeCategory::TaskCreation,
            Counter::TasksCreated(*creator),
        )],

        DomainEvent::TaskCompleted { assignees, .. } => assignees
            .iter()
            .map(|a| Trigger::counter(*a, BadgeCategory::TaskCompletion, Counter::TasksCompleted(*a)))
            .collect(),

        DomainEvent::FollowAdded {
            follower_id,
            followed_id,
        } => vec![
            Trigger::counter(
                *follower_id,
                BadgeCategory::PeopleFollowed,
                Counter::Following(*follower_id),
            ),
            Trigger::counter(
                *followed_id,
                BadgeCategory::FollowersGained,
                Counter::Followers(*followed_id),
            ),
        ],

        DomainEvent::PostCreated { author_id, .. } => vec![Trigger::counter(
            *author_id,
            BadgeCategory::ForumPosts,
            Counter::ActivePosts(*author_id),
        )],

        DomainEvent::CommentCreated { author_id, .. } => vec![Trigger::counter(
            *author_id,
            BadgeCategory::ForumAnswers,
            Counter::ActiveComments(*author_id),
        )],

        DomainEvent::MembershipAccepted { user_id, .. } => vec![Trigger::counter(
            *user_id,
            BadgeCategory::GardenJoining,
            Counter::AcceptedMemberships(*user_id),
        )],

        DomainEvent::ManagerMembershipCreated { user_id, .. } => vec![Trigger::counter(
            *user_id,
            BadgeCategory::GardenCreation,
            Counter::ManagerMemberships(*user_id),
        )],

        DomainEvent::AttendanceMarked {
            user_id,
            status: AttendanceStatus::Going,
            starts_at,
            ..
        } => vec![
            Trigger::counter(
                *user_id,
                BadgeCategory::EventParticipation,
                Counter::GoingAttendances(*user_id),
            ),
            Trigger {
                user_id: *user_id,
                category: BadgeCategory::EventSeasonal,
                measure: Measure::Season(Season::of(*starts_at)),
            },
        ],

        _ => Vec::new(),
    }
}

/// Whether a requirement is met by a counter value
pub fn count_met(requirement: &BadgeRequirement, value: i64) -> bool {
    requirement.count.map_or(false, |threshold| value >= threshold)
}

/// Whether a requirement is met by a season
pub fn season_met(requirement: &BadgeRequirement, season: Season) -> bool {
    requirement.season == Some(season)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_follow_triggers_both_sides() {
        let follower = Uuid::new_v4();
        let followed = Uuid::new_v4();
        let triggers = triggers_for(&DomainEvent::FollowAdded {
            follower_id: follower,
            followed_id: followed,
        });

        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].user_id, follower);
        assert_eq!(triggers[0].category, BadgeCategory::PeopleFollowed);
        assert_eq!(triggers[1].user_id, followed);
        assert_eq!(triggers[1].measure, Measure::Counter(Counter::Followers(followed)));
    }

    #[test]
    fn test_completion_triggers_every_assignee() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let triggers = triggers_for(&DomainEvent::TaskCompleted {
            task_id: Uuid::new_v4(),
            title: "Harvest".into(),
            completed_by: a,
            created_by: None,
            assignees: vec![a, b],
        });
        let users: Vec<Uuid> = triggers.iter().map(|t| t.user_id).collect();
        assert_eq!(users, vec![a, b]);
    }

    #[test]
    fn test_only_going_attendance_triggers() {
        let starts_at = Utc.with_ymd_and_hms(2024, 10, 5, 10, 0, 0).unwrap();
        let user_id = Uuid::new_v4();
        let maybe = DomainEvent::AttendanceMarked {
            event_id: Uuid::new_v4(),
            user_id,
            status: AttendanceStatus::Maybe,
            starts_at,
        };
        assert!(triggers_for(&maybe).is_empty());

        let going = DomainEvent::AttendanceMarked {
            event_id: Uuid::new_v4(),
            user_id,
            status: AttendanceStatus::Going,
            starts_at,
        };
        let triggers = triggers_for(&going);
        assert_eq!(triggers[1].measure, Measure::Season(Season::Autumn));
    }

    #[test]
    fn test_task_without_creator_triggers_nothing() {
        let event = DomainEvent::TaskCreated {
            task_id: Uuid::new_v4(),
            garden_id: Uuid::new_v4(),
            title: "Prune".into(),
            created_by: None,
            assignees: vec![],
        };
        assert!(triggers_for(&event).is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let req = BadgeRequirement::count(10);
        assert!(!count_met(&req, 9));
        assert!(count_met(&req, 10));
        assert!(count_met(&req, 11));
        assert!(!count_met(&BadgeRequirement::season(Season::Spring), 100));
    }

    #[test]
    fn test_season_requirement() {
        let req = BadgeRequirement::season(Season::Winter);
        assert!(season_met(&req, Season::Winter));
        assert!(!season_met(&req, Season::Summer));
    }
}
