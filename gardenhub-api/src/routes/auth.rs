/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a new account
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new pair
/// - `POST /v1/auth/logout` - Stateless; clients drop their tokens
///
/// Tokens carry no role. Authorization reads the profile on every request.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use gardenhub_shared::{
    auth::{jwt, middleware::AuthContext, password},
    community::Registration,
    models::user::{Profile, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Strength is checked at registration (letter + digit, 8+ chars)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub display_name: Option<String>,

    /// Used to match weather alerts
    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
    pub profile: Profile,
    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Register a new user
///
/// Creates the user and its profile, publishes the onboarding event (which
/// awards the welcome badge) and returns a token pair.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "tomato123",
///   "display_name": "Sam",
///   "location": "Utrecht"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or weak password
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    let (user, profile) = state
        .services
        .community
        .register(Registration {
            email: req.email,
            password: req.password,
            display_name: req.display_name,
            location: req.location,
        })
        .await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            profile,
            tokens,
        }),
    ))
}

/// Login endpoint
///
/// Wrong email and wrong password answer the same 401 so the endpoint does
/// not reveal which emails are registered.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Account deactivated
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .store()
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    // Best effort; login does not depend on it
    let db = state.db.clone();
    let user_id = user.id;
    tokio::spawn(async move {
        if let Err(e) = User::update_last_login(&db, user_id).await {
            tracing::warn!(%user_id, error = %e, "Failed to record last login");
        }
    });

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        tokens,
    }))
}

/// Token refresh endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired or non-refresh token, or unknown user
/// - `403 Forbidden`: Account deactivated
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<jwt::TokenPair>> {
    req.validate()?;

    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = state
        .store()
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    Ok(Json(jwt::issue_token_pair(user.id, state.jwt_secret())?))
}

pub async fn logout(auth: AuthContext) -> StatusCode {
    tracing::debug!(user_id = %auth.user_id, "User logged out");
    StatusCode::NO_CONTENT
}
