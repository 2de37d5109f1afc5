/// Badge rule engine
///
/// Listens to domain events, recomputes the relevant counter and awards every
/// badge in the category whose requirement is met. Awards are idempotent
/// (`UNIQUE (user_id, badge_id)` plus `ON CONFLICT DO NOTHING`) and never
/// revoked.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::rules::{count_met, season_met, triggers_for, Measure, Trigger};
use crate::error::DomainResult;
use crate::events::{DomainEvent, EventListener};
use crate::models::badge::{Badge, UserBadge};
use crate::models::notification::NotificationCategory;
use crate::notify::{NotificationDispatcher, Outgoing};
use crate::store::Store;

pub struct BadgeEngine {
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl BadgeEngine {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Awards a badge by key
    ///
    /// Returns the new award, or `Ok(None)` if the key is unknown or the user
    /// already holds the badge. A new award sends a badge notification.
    pub async fn award_badge(&self, user_id: Uuid, badge_key: &str) -> DomainResult<Option<UserBadge>> {
        let Some(badge) = self.store.badge_by_key(badge_key).await? else {
            debug!(badge_key, "Ignoring unknown badge key");
            return Ok(None);
        };
        self.award(user_id, &badge).await
    }

    async fn award(&self, user_id: Uuid, badge: &Badge) -> DomainResult<Option<UserBadge>> {
        let Some(award) = self.store.insert_user_badge(user_id, badge.id).await? else {
            return Ok(None);
        };

        info!(%user_id, badge = %badge.key, "Badge awarded");

        let notice = Outgoing::new(
            NotificationCategory::Badge,
            "New badge",
            format!("You earned the {} badge!", badge.name),
        )
        .with_link("/badges");
        if let Err(e) = self.dispatcher.send_notification(Some(user_id), notice).await {
            warn!(%user_id, badge = %badge.key, error = %e, "Failed to send badge notification");
        }

        Ok(Some(award))
    }

    /// Evaluates one trigger; returns the badges newly awarded
    pub async fn evaluate(&self, trigger: Trigger) -> DomainResult<Vec<UserBadge>> {
        let badges = self.store.badges_in_category(trigger.category).await?;
        if badges.is_empty() {
            return Ok(Vec::new());
        }

        // Counters are resolved to a fixed value once per trigger
        let measure = match trigger.measure {
            Measure::Counter(counter) => {
                let value = self.store.count(counter).await?;
                debug!(user_id = %trigger.user_id, ?counter, value, "Recomputed badge counter");
                Measure::Fixed(value)
            }
            other => other,
        };
        let met = |badge: &Badge| match measure {
            Measure::Fixed(value) => count_met(&badge.requirement, value),
            Measure::Season(season) => season_met(&badge.requirement, season),
            Measure::Counter(_) => false,
        };

        let mut awarded = Vec::new();
        for badge in badges.iter().filter(|b| met(*b)) {
            if let Some(award) = self.award(trigger.user_id, badge).await? {
                awarded.push(award);
            }
        }
        Ok(awarded)
    }
}

#[async_trait]
impl EventListener for BadgeEngine {
    fn name(&self) -> &str {
        "badges"
    }

    async fn handle(&self, event: &DomainEvent) -> DomainResult<()> {
        for trigger in triggers_for(event) {
            self.evaluate(trigger).await?;
        }
        Ok(())
    }
}
