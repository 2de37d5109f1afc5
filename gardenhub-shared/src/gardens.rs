/// Garden membership lifecycle
///
/// Owns every write that changes who belongs to a garden, plus the
/// garden-scoped event calendar:
///
/// - founding a garden (creator becomes its accepted manager)
/// - join requests and their approval or rejection by managers
/// - leaving / removal, followed by [`MembershipService::reconcile_garden`]
/// - events and attendance votes
///
/// # Reconciliation
///
/// After a membership disappears the garden is reconciled:
///
/// | Accepted members left | Accepted manager left | Outcome |
/// |---|---|---|
/// | none | - | garden deleted |
/// | some | yes | unchanged |
/// | some | no | earliest-joined accepted member promoted |
///
/// Reconciliation reads then writes without a spanning transaction.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{require_garden_manager, require_garden_member};
use crate::error::{DomainError, DomainResult};
use crate::events::{DomainEvent, EventBus};
use crate::models::event::{AttendanceStatus, CreateGardenEvent, EventAttendance, EventVisibility, GardenEvent};
use crate::models::garden::{CreateGarden, Garden};
use crate::models::membership::{CreateMembership, Membership, MembershipRole, MembershipStatus};
use crate::store::Store;

/// Outcome of reconciling a garden after a membership was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// An accepted manager remains
    Unchanged,

    /// This user was promoted to manager
    Promoted(Uuid),

    /// No accepted members remained
    GardenDeleted,
}

pub struct MembershipService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl MembershipService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    async fn garden(&self, garden_id: Uuid) -> DomainResult<Garden> {
        self.store
            .get_garden(garden_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Garden".to_string()))
    }

    async fn membership(&self, membership_id: Uuid) -> DomainResult<Membership> {
        self.store
            .get_membership(membership_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Membership".to_string()))
    }

    /// Creates a garden with `owner_id` as its accepted manager
    pub async fn create_garden(&self, owner_id: Uuid, data: CreateGarden) -> DomainResult<Garden> {
        if data.name.trim().is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }

        let garden = self.store.insert_garden(data).await?;
        let membership = self
            .store
            .insert_membership(CreateMembership {
                user_id: owner_id,
                garden_id: garden.id,
                role: MembershipRole::Manager,
                status: MembershipStatus::Accepted,
            })
            .await?;

        info!(garden_id = %garden.id, %owner_id, "Garden created");

        self.bus
            .publish(&DomainEvent::ManagerMembershipCreated {
                garden_id: garden.id,
                user_id: owner_id,
            })
            .await;
        self.bus
            .publish(&DomainEvent::MembershipAccepted {
                membership_id: membership.id,
                garden_id: garden.id,
                user_id: owner_id,
                approved_by: None,
            })
            .await;

        Ok(garden)
    }

    /// Files a pending join request
    ///
    /// # Errors
    ///
    /// `Conflict` if the user already has a membership (in any status) for
    /// the garden.
    pub async fn request_join(&self, user_id: Uuid, garden_id: Uuid) -> DomainResult<Membership> {
        let garden = self.garden(garden_id).await?;
        if garden.is_hidden {
            return Err(DomainError::NotFound("Garden".to_string()));
        }

        let membership = self
            .store
            .insert_membership(CreateMembership {
                user_id,
                garden_id,
                role: MembershipRole::Worker,
                status: MembershipStatus::Pending,
            })
            .await
            .map_err(|e| DomainError::conflict_or_store(e, "membership already exists"))?;

        self.bus
            .publish(&DomainEvent::MembershipRequested {
                membership_id: membership.id,
                garden_id,
                user_id,
            })
            .await;

        Ok(membership)
    }

    /// Approves a pending request; the manager set is not changed
    pub async fn accept(&self, actor_id: Uuid, membership_id: Uuid) -> DomainResult<Membership> {
        let membership = self
            .decide(actor_id, membership_id, MembershipStatus::Accepted)
            .await?;

        self.bus
            .publish(&DomainEvent::MembershipAccepted {
                membership_id: membership.id,
                garden_id: membership.garden_id,
                user_id: membership.user_id,
                approved_by: Some(actor_id),
            })
            .await;

        Ok(membership)
    }

    /// Rejects a pending request
    pub async fn reject(&self, actor_id: Uuid, membership_id: Uuid) -> DomainResult<Membership> {
        self.decide(actor_id, membership_id, MembershipStatus::Rejected)
            .await
    }

    async fn decide(
        &self,
        actor_id: Uuid,
        membership_id: Uuid,
        target: MembershipStatus,
    ) -> DomainResult<Membership> {
        let membership = self.membership(membership_id).await?;
        require_garden_manager(self.store.as_ref(), membership.garden_id, actor_id).await?;

        if !membership.status.can_transition_to(target) {
            return Err(DomainError::InvalidTransition(format!(
                "membership is {}, cannot become {}",
                membership.status.as_str(),
                target.as_str()
            )));
        }

        self.store
            .set_membership_status(membership_id, target)
            .await?
            .ok_or_else(|| DomainError::NotFound("Membership".to_string()))
    }

    /// Removes the caller's own membership
    pub async fn leave(&self, user_id: Uuid, garden_id: Uuid) -> DomainResult<Reconciliation> {
        let membership = self
            .store
            .find_membership(user_id, garden_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Membership".to_string()))?;

        self.store.delete_membership(membership.id).await?;
        self.reconcile_garden(garden_id).await
    }

    /// Deletes a membership by id
    ///
    /// Allowed for the member themselves and for the garden's managers.
    pub async fn remove_member(
        &self,
        actor_id: Uuid,
        membership_id: Uuid,
    ) -> DomainResult<Reconciliation> {
        let membership = self.membership(membership_id).await?;
        if membership.user_id != actor_id {
            require_garden_manager(self.store.as_ref(), membership.garden_id, actor_id).await?;
        }

        self.store.delete_membership(membership.id).await?;
        self.reconcile_garden(membership.garden_id).await
    }

    /// Deletes an empty garden or promotes a new manager
    pub async fn reconcile_garden(&self, garden_id: Uuid) -> DomainResult<Reconciliation> {
        let accepted: Vec<Membership> = self
            .store
            .garden_memberships(garden_id)
            .await?
            .into_iter()
            .filter(|m| m.status == MembershipStatus::Accepted)
            .collect();

        if accepted.is_empty() {
            self.store.delete_garden(garden_id).await?;
            info!(%garden_id, "Garden deleted after last member left");
            return Ok(Reconciliation::GardenDeleted);
        }

        if accepted.iter().any(Membership::is_active_manager) {
            return Ok(Reconciliation::Unchanged);
        }

        // garden_memberships is in join order
        let successor = &accepted[0];
        self.store
            .set_membership_role(successor.id, MembershipRole::Manager)
            .await?;
        info!(%garden_id, user_id = %successor.user_id, "Promoted member to manager");

        self.bus
            .publish(&DomainEvent::ManagerMembershipCreated {
                garden_id,
                user_id: successor.user_id,
            })
            .await;

        Ok(Reconciliation::Promoted(successor.user_id))
    }

    /// Schedules a garden event; managers only
    pub async fn create_event(&self, actor_id: Uuid, data: CreateGardenEvent) -> DomainResult<GardenEvent> {
        if data.title.trim().is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        require_garden_manager(self.store.as_ref(), data.garden_id, actor_id).await?;

        Ok(self
            .store
            .insert_event(CreateGardenEvent {
                created_by: actor_id,
                ..data
            })
            .await?)
    }

    /// Records (or changes) a user's attendance vote
    ///
    /// Private events accept votes from accepted members only.
    pub async fn mark_attendance(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        status: AttendanceStatus,
    ) -> DomainResult<EventAttendance> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Event".to_string()))?;

        if event.visibility == EventVisibility::Private {
            require_garden_member(self.store.as_ref(), event.garden_id, user_id).await?;
        }

        let attendance = self.store.upsert_attendance(event_id, user_id, status).await?;

        self.bus
            .publish(&DomainEvent::AttendanceMarked {
                event_id,
                user_id,
                status,
                starts_at: event.starts_at,
            })
            .await;

        Ok(attendance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, MembershipService) {
        let store = Arc::new(MemoryStore::new());
        let service = MembershipService::new(store.clone(), Arc::new(EventBus::new()));
        (store, service)
    }

    fn garden(name: &str) -> CreateGarden {
        CreateGarden {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_garden_makes_owner_manager() {
        let (store, service) = setup().await;
        let owner = store.seed_user("Ada").await;

        let garden = service.create_garden(owner, garden("Plot 7")).await.unwrap();
        let membership = store.find_membership(owner, garden.id).await.unwrap().unwrap();

        assert!(membership.is_active_manager());
    }

    #[tokio::test]
    async fn test_create_garden_rejects_blank_name() {
        let (store, service) = setup().await;
        let owner = store.seed_user("Ada").await;

        let err = service.create_garden(owner, garden("  ")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_join_request_conflicts() {
        let (store, service) = setup().await;
        let owner = store.seed_user("Ada").await;
        let joiner = store.seed_user("Bram").await;
        let garden = service.create_garden(owner, garden("Plot 7")).await.unwrap();

        service.request_join(joiner, garden.id).await.unwrap();
        let err = service.request_join(joiner, garden.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_only_managers_decide() {
        let (store, service) = setup().await;
        let owner = store.seed_user("Ada").await;
        let joiner = store.seed_user("Bram").await;
        let garden = service.create_garden(owner, garden("Plot 7")).await.unwrap();
        let request = service.request_join(joiner, garden.id).await.unwrap();

        let err = service.accept(joiner, request.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let rejected = service.reject(owner, request.id).await.unwrap();
        assert_eq!(rejected.status, MembershipStatus::Rejected);

        let err = service.accept(owner, request.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_private_event_requires_membership() {
        let (store, service) = setup().await;
        let owner = store.seed_user("Ada").await;
        let outsider = store.seed_user("Cas").await;
        let garden = service.create_garden(owner, garden("Plot 7")).await.unwrap();

        let event = service
            .create_event(
                owner,
                CreateGardenEvent {
                    garden_id: garden.id,
                    created_by: owner,
                    title: "Seed swap".to_string(),
                    description: None,
                    visibility: EventVisibility::Private,
                    starts_at: chrono::Utc::now(),
                },
            )
            .await
            .unwrap();

        assert!(service
            .mark_attendance(owner, event.id, AttendanceStatus::Going)
            .await
            .is_ok());
        let err = service
            .mark_attendance(outsider, event.id, AttendanceStatus::Going)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
