/// Domain events and the synchronous listener bus
///
/// Write operations in the domain services publish a [`DomainEvent`] after
/// the primary write has succeeded. Listeners (the badge engine and the
/// notification listener) react in registration order.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use gardenhub_shared::events::{DomainEvent, EventBus};
/// use uuid::Uuid;
///
/// # async fn example(bus: Arc<EventBus>) {
/// bus.publish(&DomainEvent::ProfileCreated { user_id: Uuid::new_v4() }).await;
/// # }
/// ```

pub mod bus;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::event::AttendanceStatus;

pub use bus::{EventBus, EventListener};

/// Something that happened in the domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A user signed up; the profile row exists
    ProfileCreated { user_id: Uuid },

    /// A task (or recurring instance) was created
    TaskCreated {
        task_id: Uuid,
        garden_id: Uuid,
        title: String,
        created_by: Option<Uuid>,
        assignees: Vec<Uuid>,
    },

    /// A user was added to an existing task
    TaskAssigned {
        task_id: Uuid,
        title: String,
        assignee_id: Uuid,
        assigned_by: Uuid,
    },

    /// A task moved to completed
    TaskCompleted {
        task_id: Uuid,
        title: String,
        completed_by: Uuid,
        created_by: Option<Uuid>,
        assignees: Vec<Uuid>,
    },

    FollowAdded { follower_id: Uuid, followed_id: Uuid },

    PostCreated { post_id: Uuid, author_id: Uuid },

    CommentCreated {
        comment_id: Uuid,
        post_id: Uuid,
        post_title: String,
        author_id: Uuid,
        post_author_id: Uuid,
    },

    /// A join request is waiting for the garden's managers
    MembershipRequested {
        membership_id: Uuid,
        garden_id: Uuid,
        user_id: Uuid,
    },

    /// A membership became accepted (join approved or garden founded)
    MembershipAccepted {
        membership_id: Uuid,
        garden_id: Uuid,
        user_id: Uuid,
        /// Manager who approved the request; None for the founding manager
        approved_by: Option<Uuid>,
    },

    /// A garden got its first manager
    ManagerMembershipCreated { garden_id: Uuid, user_id: Uuid },

    /// A user voted on an event
    AttendanceMarked {
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
        starts_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::ProfileCreated { .. } => "profile_created",
            DomainEvent::TaskCreated { .. } => "task_created",
            DomainEvent::TaskAssigned { .. } => "task_assigned",
            DomainEvent::TaskCompleted { .. } => "task_completed",
            DomainEvent::FollowAdded { .. } => "follow_added",
            DomainEvent::PostCreated { .. } => "post_created",
            DomainEvent::CommentCreated { .. } => "comment_created",
            DomainEvent::MembershipRequested { .. } => "membership_requested",
            DomainEvent::MembershipAccepted { .. } => "membership_accepted",
            DomainEvent::ManagerMembershipCreated { .. } => "manager_membership_created",
            DomainEvent::AttendanceMarked { .. } => "attendance_marked",
        }
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
