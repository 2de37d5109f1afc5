/// Accounts, social graph and forum writes
///
/// The writes here publish the events that drive onboarding, follower and
/// forum badges as well as reply and follower notifications.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::require_owner_or_moderator;
use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{DomainError, DomainResult};
use crate::events::{DomainEvent, EventBus};
use crate::models::forum::{Comment, ContentState, CreateComment, CreatePost, ForumPost};
use crate::models::user::{CreateUser, Profile, User};
use crate::store::Store;

/// Registration input (plaintext password)
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub location: Option<String>,
}

pub struct CommunityService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl CommunityService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    /// Creates a user and profile, then publishes `ProfileCreated`
    pub async fn register(&self, registration: Registration) -> DomainResult<(User, Profile)> {
        let email = registration.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::validation("email", "must be an email address"));
        }
        validate_password_strength(&registration.password)
            .map_err(|message| DomainError::validation("password", message))?;

        let password_hash = hash_password(&registration.password)
            .map_err(|e| DomainError::External(e.to_string()))?;

        let (user, profile) = self
            .store
            .create_user(CreateUser {
                email,
                password_hash,
                display_name: registration.display_name,
                location: registration.location.filter(|l| !l.trim().is_empty()),
            })
            .await
            .map_err(|e| DomainError::conflict_or_store(e, "email already registered"))?;

        info!(user_id = %user.id, "User registered");
        self.bus
            .publish(&DomainEvent::ProfileCreated { user_id: user.id })
            .await;

        Ok((user, profile))
    }

    /// Follows a user; returns false if already following
    pub async fn follow(&self, follower_id: Uuid, followed_id: Uuid) -> DomainResult<bool> {
        if follower_id == followed_id {
            return Err(DomainError::validation("user_id", "cannot follow yourself"));
        }
        if self.store.get_user(followed_id).await?.is_none() {
            return Err(DomainError::NotFound("User".to_string()));
        }

        let created = self.store.add_follow(follower_id, followed_id).await?;
        if created {
            self.bus
                .publish(&DomainEvent::FollowAdded {
                    follower_id,
                    followed_id,
                })
                .await;
        }
        Ok(created)
    }

    pub async fn unfollow(&self, follower_id: Uuid, followed_id: Uuid) -> DomainResult<bool> {
        Ok(self.store.remove_follow(follower_id, followed_id).await?)
    }

    pub async fn create_post(&self, data: CreatePost) -> DomainResult<ForumPost> {
        if data.title.trim().is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        if data.content.trim().is_empty() {
            return Err(DomainError::validation("content", "must not be empty"));
        }

        let post = self.store.insert_post(data).await?;
        self.bus
            .publish(&DomainEvent::PostCreated {
                post_id: post.id,
                author_id: post.author_id,
            })
            .await;
        Ok(post)
    }

    /// Comments on an active post
    pub async fn create_comment(&self, data: CreateComment) -> DomainResult<Comment> {
        if data.content.trim().is_empty() {
            return Err(DomainError::validation("content", "must not be empty"));
        }
        let post = self
            .store
            .get_post(data.post_id)
            .await?
            .filter(|p| p.state == ContentState::Active)
            .ok_or_else(|| DomainError::NotFound("Post".to_string()))?;

        let comment = self.store.insert_comment(data).await?;
        self.bus
            .publish(&DomainEvent::CommentCreated {
                comment_id: comment.id,
                post_id: post.id,
                post_title: post.title,
                author_id: comment.author_id,
                post_author_id: post.author_id,
            })
            .await;
        Ok(comment)
    }

    /// Author or moderator removes a post
    pub async fn remove_post(&self, actor_id: Uuid, post_id: Uuid) -> DomainResult<()> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Post".to_string()))?;
        require_owner_or_moderator(self.store.as_ref(), actor_id, Some(post.author_id)).await?;

        self.store.set_post_state(post_id, ContentState::Removed).await?;
        Ok(())
    }

    /// Author or moderator removes a comment
    pub async fn remove_comment(&self, actor_id: Uuid, comment_id: Uuid) -> DomainResult<()> {
        let comment = self
            .store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Comment".to_string()))?;
        require_owner_or_moderator(self.store.as_ref(), actor_id, Some(comment.author_id)).await?;

        self.store
            .set_comment_state(comment_id, ContentState::Removed)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> CommunityService {
        CommunityService::new(store, Arc::new(EventBus::new()))
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_rejects_duplicates() {
        let store = Arc::new(MemoryStore::new());
        let community = service(store);
        let registration = Registration {
            email: " Ada@Example.com ".to_string(),
            password: "radishes42".to_string(),
            display_name: Some("Ada".to_string()),
            location: Some("Utrecht".to_string()),
        };

        let (user, profile) = community.register(registration.clone()).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(profile.location.as_deref(), Some("Utrecht"));
        assert!(profile.receives_notifications);

        let err = community.register(registration).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_enforces_password_policy() {
        let community = service(Arc::new(MemoryStore::new()));
        let err = community
            .register(Registration {
                email: "bram@example.com".to_string(),
                password: "short".to_string(),
                display_name: None,
                location: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "password"));
    }

    #[tokio::test]
    async fn test_follow_is_idempotent_and_not_reflexive() {
        let store = Arc::new(MemoryStore::new());
        let ada = store.seed_user("Ada").await;
        let bram = store.seed_user("Bram").await;
        let community = service(store);

        assert!(community.follow(ada, bram).await.unwrap());
        assert!(!community.follow(ada, bram).await.unwrap());
        assert!(community.follow(ada, ada).await.is_err());
        assert!(community.unfollow(ada, bram).await.unwrap());
    }

    #[tokio::test]
    async fn test_cannot_comment_on_removed_post() {
        let store = Arc::new(MemoryStore::new());
        let ada = store.seed_user("Ada").await;
        let bram = store.seed_user("Bram").await;
        let community = service(store);

        let post = community
            .create_post(CreatePost {
                author_id: ada,
                title: "Slugs".to_string(),
                content: "Beer traps or copper tape?".to_string(),
                image: None,
            })
            .await
            .unwrap();

        let err = community.remove_post(bram, post.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        community.remove_post(ada, post.id).await.unwrap();

        let err = community
            .create_comment(CreateComment {
                post_id: post.id,
                author_id: bram,
                content: "Copper".to_string(),
                image: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
