/// Notification listener
///
/// Turns domain events into user-facing notifications: task assignment and
/// completion, join requests (to the garden's managers), join approval,
/// replies to a post author and new followers.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::dispatcher::{NotificationDispatcher, Outgoing};
use crate::error::DomainResult;
use crate::events::{DomainEvent, EventListener};
use crate::models::notification::NotificationCategory;
use crate::store::Store;

pub struct NotificationListener {
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl NotificationListener {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    async fn display_name(&self, user_id: Uuid) -> DomainResult<String> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .and_then(|u| u.display_name)
            .unwrap_or_else(|| "Someone".to_string()))
    }

    async fn garden_name(&self, garden_id: Uuid) -> DomainResult<String> {
        Ok(self
            .store
            .get_garden(garden_id)
            .await?
            .map(|g| g.name)
            .unwrap_or_else(|| "a garden".to_string()))
    }

    async fn notify_assignment(&self, task_id: Uuid, title: &str, assignee: Uuid) -> DomainResult<()> {
        self.dispatcher
            .send_notification(
                Some(assignee),
                Outgoing::new(
                    NotificationCategory::Task,
                    "New task assigned",
                    format!("You have been assigned to \"{title}\""),
                )
                .with_link(format!("/tasks/{task_id}")),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventListener for NotificationListener {
    fn name(&self) -> &str {
        "notifications"
    }

    async fn handle(&self, event: &DomainEvent) -> DomainResult<()> {
        match event {
            DomainEvent::TaskCreated {
                task_id,
                title,
                created_by,
                assignees,
                ..
            } => {
                for assignee in assignees.iter().filter(|a| Some(**a) != *created_by) {
                    self.notify_assignment(*task_id, title, *assignee).await?;
                }
            }

            DomainEvent::TaskAssigned {
                task_id,
                title,
                assignee_id,
                assigned_by,
            } if assignee_id != assigned_by => {
                self.notify_assignment(*task_id, title, *assignee_id).await?;
            }

            DomainEvent::TaskCompleted {
                task_id,
                title,
                completed_by,
                created_by: Some(creator),
                ..
            } if creator != completed_by => {
                let who = self.display_name(*completed_by).await?;
                self.dispatcher
                    .send_notification(
                        Some(*creator),
                        Outgoing::new(
                            NotificationCategory::Task,
                            "Task completed",
                            format!("{who} completed \"{title}\""),
                        )
                        .with_link(format!("/tasks/{task_id}")),
                    )
                    .await?;
            }

            DomainEvent::MembershipRequested {
                garden_id, user_id, ..
            } => {
                let who = self.display_name(*user_id).await?;
                let garden = self.garden_name(*garden_id).await?;
                let managers: Vec<Uuid> = self
                    .store
                    .garden_memberships(*garden_id)
                    .await?
                    .into_iter()
                    .filter(|m| m.is_active_manager())
                    .map(|m| m.user_id)
                    .collect();

                for manager in managers {
                    self.dispatcher
                        .send_notification(
                            Some(manager),
                            Outgoing::new(
                                NotificationCategory::Membership,
                                "New join request",
                                format!("{who} wants to join {garden}"),
                            )
                            .with_link(format!("/gardens/{garden_id}/memberships")),
                        )
                        .await?;
                }
            }

            DomainEvent::MembershipAccepted {
                garden_id,
                user_id,
                approved_by: Some(_),
                ..
            } => {
                let garden = self.garden_name(*garden_id).await?;
                self.dispatcher
                    .send_notification(
                        Some(*user_id),
                        Outgoing::new(
                            NotificationCategory::Membership,
                            "Join request accepted",
                            format!("You are now a member of {garden}"),
                        )
                        .with_link(format!("/gardens/{garden_id}")),
                    )
                    .await?;
            }

            DomainEvent::CommentCreated {
                post_id,
                post_title,
                author_id,
                post_author_id,
                ..
            } if author_id != post_author_id => {
                let who = self.display_name(*author_id).await?;
                self.dispatcher
                    .send_notification(
                        Some(*post_author_id),
                        Outgoing::new(
                            NotificationCategory::Forum,
                            "New reply",
                            format!("{who} replied to \"{post_title}\""),
                        )
                        .with_link(format!("/forum/posts/{post_id}")),
                    )
                    .await?;
            }

            DomainEvent::FollowAdded {
                follower_id,
                followed_id,
            } => {
                let who = self.display_name(*follower_id).await?;
                self.dispatcher
                    .send_notification(
                        Some(*followed_id),
                        Outgoing::new(
                            NotificationCategory::Follow,
                            "New follower",
                            format!("{who} started following you"),
                        )
                        .with_link(format!("/users/{follower_id}")),
                    )
                    .await?;
            }

            _ => {}
        }

        Ok(())
    }
}
