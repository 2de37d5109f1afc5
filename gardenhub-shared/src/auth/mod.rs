/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the registration policy
/// - [`jwt`]: HS256 access/refresh tokens
/// - [`middleware`]: Axum bearer-token middleware and the `AuthContext` extractor
/// - [`authorization`]: garden-role and platform-role checks
///
/// # Example
///
/// ```no_run
/// use gardenhub_shared::auth::password::{hash_password, verify_password};
/// use gardenhub_shared::auth::jwt::issue_token_pair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password1")?;
/// assert!(verify_password("user_password1", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
