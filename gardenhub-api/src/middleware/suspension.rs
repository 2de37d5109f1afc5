/// Suspension gate
///
/// Runs after JWT authentication on every protected route. An expired
/// suspension is lifted on the way through; a live suspension or a ban
/// answers 403 except for the few routes a restricted user still needs
/// (logging out and reading their own profile and suspension status).

use axum::{
    extract::{OriginalUri, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use gardenhub_shared::auth::middleware::AuthContext;
use gardenhub_shared::models::user::Profile;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

/// Routes open to restricted accounts
const ALLOWED_WHILE_RESTRICTED: [(Method, &str); 3] = [
    (Method::POST, "/v1/auth/logout"),
    (Method::GET, "/v1/profile/me"),
    (Method::GET, "/v1/profile/me/suspension"),
];

pub fn is_allowed_while_restricted(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    ALLOWED_WHILE_RESTRICTED
        .iter()
        .any(|(m, p)| m == method && *p == path)
}

fn restriction_message(profile: &Profile) -> String {
    if profile.is_banned {
        return match &profile.ban_reason {
            Some(reason) => format!("Account banned: {}", reason),
            None => "Account banned".to_string(),
        };
    }
    match profile.suspended_until {
        Some(until) => format!("Account suspended until {}", until.to_rfc3339()),
        None => "Account suspended".to_string(),
    }
}

pub async fn suspension_gate(
    State(state): State<AppState>,
    auth: AuthContext,
    req: Request,
    next: Next,
) -> ApiResult<Response> {
    let now = Utc::now();
    let profile = state
        .services
        .moderation
        .lift_expired_suspension(auth.user_id, now)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown account".to_string()))?;

    if profile.is_restricted(now) {
        // Nested routers see a stripped path
        let path = req
            .extensions()
            .get::<OriginalUri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        if !is_allowed_while_restricted(req.method(), &path) {
            tracing::info!(user_id = %auth.user_id, %path, "Blocked request from restricted account");
            return Err(ApiError::Forbidden(restriction_message(&profile)));
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        assert!(is_allowed_while_restricted(&Method::POST, "/v1/auth/logout"));
        assert!(is_allowed_while_restricted(&Method::GET, "/v1/profile/me/"));
        assert!(is_allowed_while_restricted(&Method::GET, "/v1/profile/me/suspension"));
        assert!(!is_allowed_while_restricted(&Method::PATCH, "/v1/profile/me"));
        assert!(!is_allowed_while_restricted(&Method::POST, "/v1/gardens"));
    }
}
