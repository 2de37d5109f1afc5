/// Adverse weather alerts
///
/// For every distinct profile location, tomorrow's forecast is fetched and,
/// when adverse, every opted-in profile at exactly that location string is
/// notified. A failure for one location is logged and the run moves on.

use gardenhub_shared::error::DomainResult;
use gardenhub_shared::models::notification::NotificationCategory;
use gardenhub_shared::notify::{NotificationDispatcher, Outgoing};
use gardenhub_shared::store::Store;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::weather::{classify, AdverseCondition, DailyForecast, ForecastProvider, Geocoder, WeatherError};

/// Index of tomorrow in the daily forecast
const TOMORROW: usize = 1;

pub struct WeatherAlertJob {
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
    geocoder: Arc<dyn Geocoder>,
    forecaster: Arc<dyn ForecastProvider>,
}

impl WeatherAlertJob {
    pub fn new(
        store: Arc<dyn Store>,
        dispatcher: Arc<NotificationDispatcher>,
        geocoder: Arc<dyn Geocoder>,
        forecaster: Arc<dyn ForecastProvider>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            geocoder,
            forecaster,
        }
    }

    /// Returns the number of alerts sent
    pub async fn check_weather_and_notify(&self) -> DomainResult<usize> {
        let locations = self.store.distinct_locations().await?;
        let mut sent = 0;

        for location in &locations {
            let tomorrow = match self.tomorrow_at(location).await {
                Ok(Some(day)) => day,
                Ok(None) => {
                    warn!(location, "Location could not be geocoded, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(location, error = %e, "Weather lookup failed, skipping");
                    continue;
                }
            };

            let Some(condition) = classify(&tomorrow) else {
                debug!(location, "No adverse weather tomorrow");
                continue;
            };

            match self.alert(location, condition, &tomorrow).await {
                Ok(count) => sent += count,
                Err(e) => warn!(location, error = %e, "Failed to send weather alerts"),
            }
        }

        info!(locations = locations.len(), sent, "Weather check finished");
        Ok(sent)
    }

    async fn tomorrow_at(&self, location: &str) -> Result<Option<DailyForecast>, WeatherError> {
        let Some(coordinates) = self.geocoder.geocode(location).await? else {
            return Ok(None);
        };
        let days = self.forecaster.daily(coordinates).await?;
        days.get(TOMORROW)
            .copied()
            .map(Some)
            .ok_or(WeatherError::MissingDay(TOMORROW))
    }

    async fn alert(
        &self,
        location: &str,
        condition: AdverseCondition,
        day: &DailyForecast,
    ) -> DomainResult<usize> {
        let message = alert_message(location, condition, day);
        let mut sent = 0;

        for profile in self.store.opted_in_profiles_at(location).await? {
            let outgoing = Outgoing::new(NotificationCategory::Weather, "Weather alert", message.clone());
            match self.dispatcher.send_notification(Some(profile.user_id), outgoing).await {
                Ok(Some(_)) => sent += 1,
                Ok(None) => {}
                Err(e) => warn!(location, user_id = %profile.user_id, error = %e, "Failed to send weather alert"),
            }
        }

        info!(location, condition = condition.describe(), sent, "Weather alerts sent");
        Ok(sent)
    }
}

pub fn alert_message(location: &str, condition: AdverseCondition, day: &DailyForecast) -> String {
    format!(
        "{} expected in {} tomorrow (high {:.0}°C, low {:.0}°C). Protect your plants.",
        condition.describe(),
        location,
        day.high_c,
        day.low_c
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::Coordinates;
    use async_trait::async_trait;
    use gardenhub_shared::notify::NoopPushGateway;
    use gardenhub_shared::store::memory::MemoryStore;
    use std::collections::HashMap;

    struct FakeGeocoder {
        known: HashMap<&'static str, Coordinates>,
        broken: Vec<&'static str>,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, location: &str) -> Result<Option<Coordinates>, WeatherError> {
            if self.broken.contains(&location) {
                return Err(WeatherError::Status(503));
            }
            Ok(self.known.get(location).copied())
        }
    }

    /// Returns the tomorrow forecast keyed by latitude
    struct FakeForecast {
        by_latitude: Vec<(f64, DailyForecast)>,
    }

    #[async_trait]
    impl ForecastProvider for FakeForecast {
        async fn daily(&self, at: Coordinates) -> Result<Vec<DailyForecast>, WeatherError> {
            let tomorrow = self
                .by_latitude
                .iter()
                .find(|(lat, _)| *lat == at.latitude)
                .map(|(_, day)| *day)
                .ok_or(WeatherError::MissingDay(1))?;
            let today = DailyForecast {
                weather_code: 0,
                high_c: 18.0,
                low_c: 8.0,
            };
            Ok(vec![today, tomorrow])
        }
    }

    fn coords(latitude: f64) -> Coordinates {
        Coordinates {
            latitude,
            longitude: 5.0,
        }
    }

    async fn user_at(store: &MemoryStore, name: &str, location: &str, opted_in: bool) -> uuid::Uuid {
        let id = store.seed_user(name).await;
        let location = location.to_string();
        store
            .update_profile(id, move |p| {
                p.location = Some(location);
                p.receives_notifications = opted_in;
            })
            .await;
        id
    }

    fn job(store: Arc<MemoryStore>, geocoder: FakeGeocoder, forecast: FakeForecast) -> WeatherAlertJob {
        let dispatcher = Arc::new(NotificationDispatcher::new(store.clone(), Arc::new(NoopPushGateway)));
        WeatherAlertJob::new(store, dispatcher, Arc::new(geocoder), Arc::new(forecast))
    }

    #[tokio::test]
    async fn test_frost_alerts_opted_in_profiles_at_exact_location() {
        let store = Arc::new(MemoryStore::new());
        let ada = user_at(&store, "Ada", "Utrecht", true).await;
        let bram = user_at(&store, "Bram", "Utrecht", true).await;
        let cas = user_at(&store, "Cas", "Utrecht", false).await;
        let dirk = user_at(&store, "Dirk", "utrecht", true).await;

        let geocoder = FakeGeocoder {
            known: HashMap::from([("Utrecht", coords(52.0))]),
            broken: vec![],
        };
        let forecast = FakeForecast {
            by_latitude: vec![(
                52.0,
                DailyForecast {
                    weather_code: 1,
                    high_c: 3.0,
                    low_c: -5.0,
                },
            )],
        };

        let sent = job(store.clone(), geocoder, forecast)
            .check_weather_and_notify()
            .await
            .unwrap();
        assert_eq!(sent, 2);

        for user in [ada, bram] {
            let notes = store.notifications_for(user).await;
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].category, NotificationCategory::Weather);
            assert!(notes[0].message.starts_with("Frost expected in Utrecht"));
        }
        assert!(store.notifications_for(cas).await.is_empty());
        assert!(store.notifications_for(dirk).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_location_does_not_abort_run() {
        let store = Arc::new(MemoryStore::new());
        user_at(&store, "Ada", "Atlantis", true).await;
        user_at(&store, "Bram", "Nowhere", true).await;
        let eva = user_at(&store, "Eva", "Rotterdam", true).await;
        let fien = user_at(&store, "Fien", "Zwolle", true).await;

        let geocoder = FakeGeocoder {
            known: HashMap::from([("Rotterdam", coords(51.9)), ("Zwolle", coords(52.5))]),
            broken: vec!["Atlantis"],
        };
        let forecast = FakeForecast {
            by_latitude: vec![
                (
                    51.9,
                    DailyForecast {
                        weather_code: 95,
                        high_c: 24.0,
                        low_c: 15.0,
                    },
                ),
                (
                    52.5,
                    DailyForecast {
                        weather_code: 2,
                        high_c: 21.0,
                        low_c: 11.0,
                    },
                ),
            ],
        };

        let sent = job(store.clone(), geocoder, forecast)
            .check_weather_and_notify()
            .await
            .unwrap();
        assert_eq!(sent, 1);
        assert!(store.notifications_for(eva).await[0].message.starts_with("Thunderstorm"));
        assert!(store.notifications_for(fien).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_alert_does_not_stop_the_location() {
        let store = Arc::new(MemoryStore::new());
        let ada = user_at(&store, "Ada", "Delft", true).await;
        let bram = user_at(&store, "Bram", "Delft", true).await;
        store.fail_notifications_for(ada).await;

        let geocoder = FakeGeocoder {
            known: HashMap::from([("Delft", coords(52.0))]),
            broken: vec![],
        };
        let forecast = FakeForecast {
            by_latitude: vec![(
                52.0,
                DailyForecast {
                    weather_code: 65,
                    high_c: 12.0,
                    low_c: 6.0,
                },
            )],
        };

        let sent = job(store.clone(), geocoder, forecast)
            .check_weather_and_notify()
            .await
            .unwrap();
        assert_eq!(sent, 1);
        assert!(store.notifications_for(ada).await.is_empty());
        assert_eq!(store.notifications_for(bram).await.len(), 1);
    }

    #[test]
    fn test_alert_message() {
        let day = DailyForecast {
            weather_code: 0,
            high_c: 37.4,
            low_c: 21.0,
        };
        assert_eq!(
            alert_message("Sevilla", AdverseCondition::Heat, &day),
            "Extreme heat expected in Sevilla tomorrow (high 37°C, low 21°C). Protect your plants."
        );
    }
}
