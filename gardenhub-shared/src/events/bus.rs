/// Ordered, synchronous event bus
///
/// `publish` awaits each listener in turn. A failing listener is logged and
/// skipped; the publisher never sees the error, so side effects cannot undo
/// the write that triggered them.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::DomainEvent;
use crate::error::DomainResult;

/// Reacts to domain events
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Listener name for logs
    fn name(&self) -> &str;

    /// Handles one event
    async fn handle(&self, event: &DomainEvent) -> DomainResult<()>;
}

/// Holds listeners in registration order
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener; listeners run in the order they were registered
    pub fn register(&mut self, listener: Arc<dyn EventListener>) {
        debug!(listener = listener.name(), "Registered event listener");
        self.listeners.push(listener);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.register(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers an event to every listener
    pub async fn publish(&self, event: &DomainEvent) {
        debug!(event = event.kind(), "Publishing domain event");

        for listener in &self.listeners {
            if let Err(e) = listener.handle(event).await {
                warn!(
                    listener = listener.name(),
                    event = event.kind(),
                    error = %e,
                    "Event listener failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventListener for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, _event: &DomainEvent) -> DomainResult<()> {
            self.log.lock().await.push(self.name);
            if self.fail {
                return Err(DomainError::External("boom".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_listeners_run_in_order_and_errors_do_not_stop_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = EventBus::new()
            .with_listener(Arc::new(Recorder {
                name: "first",
                log: log.clone(),
                fail: true,
            }))
            .with_listener(Arc::new(Recorder {
                name: "second",
                log: log.clone(),
                fail: false,
            }));

        bus.publish(&DomainEvent::ProfileCreated {
            user_id: Uuid::new_v4(),
        })
        .await;

        assert_eq!(*log.lock().await, vec!["first", "second"]);
        assert_eq!(bus.listener_count(), 2);
    }
}
