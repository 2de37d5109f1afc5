/// Notifications: dispatcher, push gateway and event listener
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use gardenhub_shared::models::notification::NotificationCategory;
/// use gardenhub_shared::notify::{NoopPushGateway, NotificationDispatcher, Outgoing};
/// use gardenhub_shared::store::Store;
/// use uuid::Uuid;
///
/// # async fn example(store: Arc<dyn Store>, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let dispatcher = NotificationDispatcher::new(store, Arc::new(NoopPushGateway));
/// dispatcher
///     .send_notification(
///         Some(user_id),
///         Outgoing::new(NotificationCategory::System, "Welcome", "Happy gardening!"),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```

pub mod dispatcher;
pub mod listener;
pub mod push;

pub use dispatcher::{NotificationDispatcher, Outgoing};
pub use listener::NotificationListener;
pub use push::{
    HttpPushGateway, NoopPushGateway, PushError, PushGateway, PushPayload, RecordingPushGateway,
    DEFAULT_PUSH_ENDPOINT,
};
