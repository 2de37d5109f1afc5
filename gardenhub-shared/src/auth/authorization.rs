/// Authorization helpers and permission checks
///
/// GardenHub has two independent permission axes:
///
/// 1. **Platform role** on the profile (admin / moderator / member / guest),
///    which gates moderation.
/// 2. **Garden membership** (manager / worker, accepted only), which gates
///    garden-scoped writes.
///
/// Checks read through the [`Store`] so services and route handlers share
/// them.
///
/// # Example
///
/// ```no_run
/// use gardenhub_shared::auth::authorization::{require_garden_manager, require_moderator};
/// use gardenhub_shared::store::Store;
/// use uuid::Uuid;
///
/// async fn check(store: &dyn Store, user_id: Uuid, garden_id: Uuid) -> Result<(), String> {
///     require_garden_manager(store, garden_id, user_id).await.map_err(|e| e.to_string())?;
///     require_moderator(store, user_id).await.map_err(|e| e.to_string())?;
///     Ok(())
/// }
/// ```

use uuid::Uuid;

use crate::error::DomainError;
use crate::models::membership::{Membership, MembershipRole, MembershipStatus};
use crate::models::user::UserRole;
use crate::store::{Store, StoreError};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// No accepted membership in the garden
    #[error("Not a member of garden {0}")]
    NotMember(Uuid),

    /// Accepted member, but not a manager
    #[error("Manager role required in garden {0}")]
    NotManager(Uuid),

    /// Platform role insufficient
    #[error("Insufficient permissions: requires moderator, has {0:?}")]
    NotModerator(UserRole),

    /// User doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Store(e) => DomainError::Store(e),
            other => DomainError::Forbidden(other.to_string()),
        }
    }
}

/// Requires an accepted membership in the garden and returns it
pub async fn require_garden_member(
    store: &dyn Store,
    garden_id: Uuid,
    user_id: Uuid,
) -> Result<Membership, AuthzError> {
    match store.find_membership(user_id, garden_id).await? {
        Some(m) if m.status == MembershipStatus::Accepted => Ok(m),
        _ => Err(AuthzError::NotMember(garden_id)),
    }
}

/// Requires an accepted manager membership in the garden
pub async fn require_garden_manager(
    store: &dyn Store,
    garden_id: Uuid,
    user_id: Uuid,
) -> Result<Membership, AuthzError> {
    let membership = require_garden_member(store, garden_id, user_id).await?;
    if membership.role != MembershipRole::Manager {
        return Err(AuthzError::NotManager(garden_id));
    }
    Ok(membership)
}

/// Requires the moderator or admin platform role
pub async fn require_moderator(store: &dyn Store, user_id: Uuid) -> Result<UserRole, AuthzError> {
    let role = store
        .get_profile(user_id)
        .await?
        .map(|p| p.role)
        .unwrap_or(UserRole::Guest);

    if !role.can_moderate() {
        return Err(AuthzError::NotModerator(role));
    }
    Ok(role)
}

/// Checks that the caller owns a resource
pub fn require_ownership(user_id: Uuid, resource_owner_id: Uuid) -> Result<(), AuthzError> {
    if user_id != resource_owner_id {
        return Err(AuthzError::NotAuthorized);
    }
    Ok(())
}

/// Owner of the resource, or a moderator
pub async fn require_owner_or_moderator(
    store: &dyn Store,
    user_id: Uuid,
    resource_owner_id: Option<Uuid>,
) -> Result<(), AuthzError> {
    if resource_owner_id == Some(user_id) {
        return Ok(());
    }
    require_moderator(store, user_id).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::garden::CreateGarden;
    use crate::models::membership::CreateMembership;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_garden_roles() {
        let store = MemoryStore::new();
        let manager = store.seed_user("Ada").await;
        let worker = store.seed_user("Bram").await;
        let pending = store.seed_user("Cas").await;
        let garden_id = store
            .insert_garden(CreateGarden {
                name: "Oosterpark Allotment".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id;

        for (user_id, role, status) in [
            (manager, MembershipRole::Manager, MembershipStatus::Accepted),
            (worker, MembershipRole::Worker, MembershipStatus::Accepted),
            (pending, MembershipRole::Worker, MembershipStatus::Pending),
        ] {
            store
                .insert_membership(CreateMembership { user_id, garden_id, role, status })
                .await
                .unwrap();
        }

        assert!(require_garden_manager(&store, garden_id, manager).await.is_ok());
        assert!(require_garden_member(&store, garden_id, worker).await.is_ok());
        assert!(matches!(
            require_garden_manager(&store, garden_id, worker).await,
            Err(AuthzError::NotManager(_))
        ));
        assert!(matches!(
            require_garden_member(&store, garden_id, pending).await,
            Err(AuthzError::NotMember(_))
        ));
    }

    #[tokio::test]
    async fn test_require_moderator() {
        let store = MemoryStore::new();
        let member = store.seed_user("Dirk").await;
        let moderator = store.seed_user("Eva").await;
        store.set_role(moderator, UserRole::Moderator).await;

        assert!(require_moderator(&store, moderator).await.is_ok());
        assert!(matches!(
            require_moderator(&store, member).await,
            Err(AuthzError::NotModerator(UserRole::Member))
        ));
        assert!(require_owner_or_moderator(&store, member, Some(member)).await.is_ok());
        assert!(require_owner_or_moderator(&store, member, None).await.is_err());
    }

    #[test]
    fn test_require_ownership() {
        let user_id = Uuid::new_v4();
        assert!(require_ownership(user_id, user_id).is_ok());
        assert!(require_ownership(user_id, Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_authz_error_maps_to_forbidden() {
        let err: DomainError = AuthzError::NotManager(Uuid::nil()).into();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
