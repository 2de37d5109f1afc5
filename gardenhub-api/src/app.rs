/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use gardenhub_api::{app::AppState, config::Config};
/// use gardenhub_shared::notify::NoopPushGateway;
/// use gardenhub_shared::services::Services;
/// use gardenhub_shared::store::postgres::PgStore;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let services = Services::build(Arc::new(PgStore::new(pool.clone())), Arc::new(NoopPushGateway));
/// let state = AppState::new(pool, config, services);
/// let app = gardenhub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, suspension::suspension_gate},
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use gardenhub_shared::auth::middleware::create_jwt_middleware;
use gardenhub_shared::services::Services;
use gardenhub_shared::store::Store;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used for listings and other plain reads
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Domain services; every workflow write goes through these
    pub services: Services,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, services: Services) -> Self {
        Self {
            db,
            config: Arc::new(config),
            services,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn store(&self) -> &dyn Store {
        self.services.store.as_ref()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// └── /v1/
///     ├── /auth/register|login|refresh  (public)
///     └── everything else               (JWT + suspension gate)
///         ├── /auth/logout
///         ├── /profile/me, /users/:id, /devices
///         ├── /gardens, /memberships
///         ├── /tasks
///         ├── /forum
///         ├── /notifications, /badges
///         ├── /events
///         └── /reports, /moderation
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. JWT authentication, then the suspension gate (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        // Profiles and social graph
        .route(
            "/profile/me",
            get(routes::profile::get_me).patch(routes::profile::update_me),
        )
        .route("/profile/me/suspension", get(routes::profile::suspension_status))
        .route("/users/:id", get(routes::profile::get_user))
        .route(
            "/users/:id/follow",
            post(routes::profile::follow).delete(routes::profile::unfollow),
        )
        .route(
            "/users/:id/block",
            post(routes::profile::block).delete(routes::profile::unblock),
        )
        .route("/users/:id/badges", get(routes::badges::list_user_badges))
        .route("/devices", post(routes::profile::register_device))
        // Gardens and memberships
        .route(
            "/gardens",
            post(routes::gardens::create_garden).get(routes::gardens::list_gardens),
        )
        .route(
            "/gardens/:id",
            get(routes::gardens::get_garden)
                .patch(routes::gardens::update_garden)
                .delete(routes::gardens::delete_garden),
        )
        .route("/gardens/:id/join", post(routes::gardens::join_garden))
        .route("/gardens/:id/memberships", get(routes::gardens::list_memberships))
        .route(
            "/gardens/:id/task-types",
            post(routes::gardens::create_task_type).get(routes::gardens::list_task_types),
        )
        .route("/memberships/:id/accept", post(routes::gardens::accept_membership))
        .route("/memberships/:id/reject", post(routes::gardens::reject_membership))
        .route("/memberships/:id", delete(routes::gardens::remove_membership))
        // Tasks
        .route(
            "/gardens/:id/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/tasks/:id", get(routes::tasks::get_task))
        .route("/tasks/:id/accept", post(routes::tasks::accept_task))
        .route("/tasks/:id/decline", post(routes::tasks::decline_task))
        .route("/tasks/:id/complete", post(routes::tasks::complete_task))
        .route("/tasks/:id/assign", post(routes::tasks::assign_task))
        .route("/tasks/:id/self-assign", post(routes::tasks::self_assign_task))
        .route("/tasks/:id/cancel", post(routes::tasks::cancel_task))
        // Forum
        .route(
            "/forum/posts",
            post(routes::forum::create_post).get(routes::forum::list_posts),
        )
        .route(
            "/forum/posts/:id",
            get(routes::forum::get_post).delete(routes::forum::delete_post),
        )
        .route("/forum/posts/:id/like", post(routes::forum::like_post))
        .route(
            "/forum/posts/:id/comments",
            post(routes::forum::create_comment).get(routes::forum::list_comments),
        )
        .route("/forum/posts/:id/best-answer", post(routes::forum::set_best_answer))
        .route("/forum/comments/:id", delete(routes::forum::delete_comment))
        .route("/forum/comments/:id/like", post(routes::forum::like_comment))
        // Notifications and badges
        .route("/notifications", get(routes::notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(routes::notifications::unread_count),
        )
        .route("/notifications/read-all", post(routes::notifications::mark_all_read))
        .route("/notifications/:id/read", post(routes::notifications::mark_read))
        .route("/badges", get(routes::badges::list_badges))
        // Events
        .route(
            "/gardens/:id/events",
            post(routes::events::create_event).get(routes::events::list_events),
        )
        .route("/events/:id/vote", post(routes::events::vote))
        .route("/events/:id/attendances", get(routes::events::list_attendances))
        // Reports and moderation
        .route(
            "/reports",
            post(routes::moderation::create_report).get(routes::moderation::list_reports),
        )
        .route("/reports/:id/review", post(routes::moderation::review_report))
        .route("/moderation/users/:id/suspend", post(routes::moderation::suspend_user))
        .route(
            "/moderation/users/:id/unsuspend",
            post(routes::moderation::unsuspend_user),
        )
        .route("/moderation/users/:id/ban", post(routes::moderation::ban_user))
        .route("/moderation/gardens/:id/hide", post(routes::moderation::hide_garden))
        .route(
            "/moderation/gardens/:id/unhide",
            post(routes::moderation::unhide_garden),
        )
        .route("/moderation/gardens/:id", delete(routes::moderation::delete_garden))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            suspension_gate,
        ))
        .route_layer(axum::middleware::from_fn(create_jwt_middleware(
            state.config.jwt.secret.clone(),
        )));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
