/// Notification dispatcher
///
/// Persists a notification for an opted-in recipient and fans it out to the
/// recipient's active push devices. Push delivery is best effort: failures
/// are logged per token and never undo the stored notification.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::push::{PushGateway, PushPayload};
use crate::error::DomainResult;
use crate::models::notification::{CreateNotification, Notification, NotificationCategory};
use crate::store::Store;

/// A notification to send
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub link: Option<String>,
    pub push: bool,
}

impl Outgoing {
    /// Pushed notification without a link
    pub fn new(
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            category,
            link: None,
            push: true,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Store only, no push
    pub fn silent(mut self) -> Self {
        self.push = false;
        self
    }
}

/// Creates notifications and pushes them to devices
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    push: Arc<dyn PushGateway>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn Store>, push: Arc<dyn PushGateway>) -> Self {
        Self { store, push }
    }

    /// Sends a notification
    ///
    /// Returns `Ok(None)` without side effects when the recipient is absent,
    /// has no profile, or has turned notifications off.
    ///
    /// # Errors
    ///
    /// Only persistence failures are returned; push failures are logged.
    pub async fn send_notification(
        &self,
        recipient: Option<Uuid>,
        outgoing: Outgoing,
    ) -> DomainResult<Option<Notification>> {
        let Some(recipient_id) = recipient else {
            return Ok(None);
        };

        let opted_in = self
            .store
            .get_profile(recipient_id)
            .await?
            .map_or(false, |p| p.receives_notifications);
        if !opted_in {
            debug!(%recipient_id, "Recipient does not receive notifications");
            return Ok(None);
        }

        let notification = self
            .store
            .insert_notification(CreateNotification {
                recipient_id,
                title: outgoing.title.clone(),
                message: outgoing.message.clone(),
                category: outgoing.category,
                link: outgoing.link.clone(),
            })
            .await?;

        if outgoing.push {
            self.push_to_devices(recipient_id, &outgoing).await;
        }

        Ok(Some(notification))
    }

    async fn push_to_devices(&self, recipient_id: Uuid, outgoing: &Outgoing) {
        let tokens = match self.store.active_push_tokens(recipient_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(%recipient_id, error = %e, "Failed to load push tokens");
                return;
            }
        };

        let payload = PushPayload {
            title: outgoing.title.clone(),
            body: outgoing.message.clone(),
            category: outgoing.category.as_str().to_string(),
            link: outgoing.link.clone(),
        };

        for token in tokens {
            if let Err(e) = self.push.send(&token, &payload).await {
                warn!(%recipient_id, error = %e, "Push delivery failed");
            }
        }
    }
}
