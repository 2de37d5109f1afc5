/// Service wiring
///
/// Builds the dispatcher, the event bus with its listeners and every domain
/// service over one store and one push gateway. Both binaries call
/// [`Services::build`] once at startup.
///
/// Listener order is fixed: the badge engine runs before the notification
/// listener for every event.

use std::sync::Arc;

use crate::badges::BadgeEngine;
use crate::community::CommunityService;
use crate::events::EventBus;
use crate::gardens::MembershipService;
use crate::moderation::ModerationService;
use crate::notify::{NotificationDispatcher, NotificationListener, PushGateway};
use crate::store::Store;
use crate::tasks::TaskService;

#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub bus: Arc<EventBus>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub badges: Arc<BadgeEngine>,
    pub memberships: Arc<MembershipService>,
    pub tasks: Arc<TaskService>,
    pub community: Arc<CommunityService>,
    pub moderation: Arc<ModerationService>,
}

impl Services {
    pub fn build(store: Arc<dyn Store>, push: Arc<dyn PushGateway>) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::new(store.clone(), push));
        let badges = Arc::new(BadgeEngine::new(store.clone(), dispatcher.clone()));
        let notifications = Arc::new(NotificationListener::new(store.clone(), dispatcher.clone()));

        let bus = Arc::new(
            EventBus::new()
                .with_listener(badges.clone())
                .with_listener(notifications),
        );

        Self {
            memberships: Arc::new(MembershipService::new(store.clone(), bus.clone())),
            tasks: Arc::new(TaskService::new(store.clone(), bus.clone())),
            community: Arc::new(CommunityService::new(store.clone(), bus.clone())),
            moderation: Arc::new(ModerationService::new(store.clone(), dispatcher.clone())),
            store,
            bus,
            dispatcher,
            badges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoopPushGateway;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_build_registers_both_listeners() {
        let services = Services::build(Arc::new(MemoryStore::new()), Arc::new(NoopPushGateway));
        assert_eq!(services.bus.listener_count(), 2);
    }
}
