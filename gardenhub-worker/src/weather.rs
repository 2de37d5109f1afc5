/// Weather lookups
///
/// Two narrow traits sit between the alert job and the network:
///
/// - [`Geocoder`]: free-text location → coordinates
/// - [`ForecastProvider`]: coordinates → daily forecast for today and tomorrow
///
/// The Open-Meteo clients implement both with short fixed timeouts and no
/// retries. [`classify`] decides whether a forecast day warrants an alert.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Drizzle, rain, snow, shower and thunderstorm codes (WMO)
pub const ADVERSE_WEATHER_CODES: [i32; 22] = [
    51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 71, 73, 75, 77, 80, 81, 82, 85, 86, 95, 96, 99,
];

/// Below this daily low (°C) an alert is raised
pub const FROST_THRESHOLD_C: f64 = 0.0;

/// Above this daily high (°C) an alert is raised
pub const HEAT_THRESHOLD_C: f64 = 35.0;

const GEOCODING_TIMEOUT: Duration = Duration::from_secs(5);
const FORECAST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Weather provider returned {0}")]
    Status(u16),

    #[error("Forecast has no entry for day {0}")]
    MissingDay(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One forecast day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyForecast {
    pub weather_code: i32,
    pub high_c: f64,
    pub low_c: f64,
}

/// Reason a forecast day is adverse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdverseCondition {
    Precipitation(i32),
    Frost,
    Heat,
}

impl AdverseCondition {
    pub fn describe(&self) -> &'static str {
        match self {
            AdverseCondition::Precipitation(code) => describe_code(*code),
            AdverseCondition::Frost => "Frost",
            AdverseCondition::Heat => "Extreme heat",
        }
    }
}

pub fn is_adverse_code(code: i32) -> bool {
    ADVERSE_WEATHER_CODES.contains(&code)
}

/// Human-readable name for an adverse WMO code
pub fn describe_code(code: i32) -> &'static str {
    match code {
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 | 77 => "Snow",
        80 | 81 | 82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 | 96 | 99 => "Thunderstorm",
        _ => "Unsettled weather",
    }
}

/// Returns the first matching adverse condition, checking the code first
pub fn classify(day: &DailyForecast) -> Option<AdverseCondition> {
    if is_adverse_code(day.weather_code) {
        Some(AdverseCondition::Precipitation(day.weather_code))
    } else if day.low_c < FROST_THRESHOLD_C {
        Some(AdverseCondition::Frost)
    } else if day.high_c > HEAT_THRESHOLD_C {
        Some(AdverseCondition::Heat)
    } else {
        None
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for `location`, or `None` when nothing matches
    async fn geocode(&self, location: &str) -> Result<Option<Coordinates>, WeatherError>;
}

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Daily forecast starting today (index 0)
    async fn daily(&self, at: Coordinates) -> Result<Vec<DailyForecast>, WeatherError>;
}

pub struct OpenMeteoGeocoder {
    client: Client,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(base_url: impl Into<String>) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Client::builder().timeout(GEOCODING_TIMEOUT).build()?,
            base_url: base_url.into(),
        })
    }

    fn search_url(&self, location: &str) -> String {
        format!(
            "{}?name={}&count=1&format=json",
            self.base_url,
            urlencoding::encode(location)
        )
    }
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    latitude: f64,
    longitude: f64,
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn geocode(&self, location: &str) -> Result<Option<Coordinates>, WeatherError> {
        let response = self.client.get(self.search_url(location)).send().await?;
        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status().as_u16()));
        }

        let body: GeocodingResponse = response.json().await?;
        debug!(location, matches = body.results.len(), "Geocoded location");
        Ok(body.results.first().map(|r| Coordinates {
            latitude: r.latitude,
            longitude: r.longitude,
        }))
    }
}

pub struct OpenMeteoForecast {
    client: Client,
    base_url: String,
}

impl OpenMeteoForecast {
    pub fn new(base_url: impl Into<String>) -> Result<Self, WeatherError> {
        Ok(Self {
            client: Client::builder().timeout(FORECAST_TIMEOUT).build()?,
            base_url: base_url.into(),
        })
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    daily: DailySeries,
}

#[derive(Deserialize)]
struct DailySeries {
    weathercode: Vec<i32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
}

impl DailySeries {
    fn into_days(self) -> Vec<DailyForecast> {
        self.weathercode
            .into_iter()
            .zip(self.temperature_2m_max)
            .zip(self.temperature_2m_min)
            .map(|((weather_code, high_c), low_c)| DailyForecast {
                weather_code,
                high_c,
                low_c,
            })
            .collect()
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoForecast {
    async fn daily(&self, at: Coordinates) -> Result<Vec<DailyForecast>, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", at.latitude.to_string()),
                ("longitude", at.longitude.to_string()),
                (
                    "daily",
                    "weathercode,temperature_2m_max,temperature_2m_min".to_string(),
                ),
                ("forecast_days", "2".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status().as_u16()));
        }

        let body: ForecastResponse = response.json().await?;
        Ok(body.daily.into_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(weather_code: i32, high_c: f64, low_c: f64) -> DailyForecast {
        DailyForecast {
            weather_code,
            high_c,
            low_c,
        }
    }

    #[test]
    fn test_code_table() {
        for code in ADVERSE_WEATHER_CODES {
            assert!(is_adverse_code(code), "code {code}");
        }
        for code in [0, 1, 2, 3, 45, 48] {
            assert!(!is_adverse_code(code), "code {code}");
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&day(0, 20.0, 10.0)), None);
        assert_eq!(
            classify(&day(95, 20.0, 10.0)),
            Some(AdverseCondition::Precipitation(95))
        );
        assert_eq!(classify(&day(1, 4.0, -5.0)), Some(AdverseCondition::Frost));
        assert_eq!(classify(&day(0, 36.5, 22.0)), Some(AdverseCondition::Heat));
        assert_eq!(classify(&day(0, 35.0, 0.0)), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(AdverseCondition::Precipitation(63).describe(), "Rain");
        assert_eq!(AdverseCondition::Precipitation(99).describe(), "Thunderstorm");
        assert_eq!(AdverseCondition::Frost.describe(), "Frost");
    }

    #[test]
    fn test_search_url_encodes_location() {
        let geocoder = OpenMeteoGeocoder::new("https://geo.test/v1/search").unwrap();
        assert_eq!(
            geocoder.search_url("Den Haag"),
            "https://geo.test/v1/search?name=Den%20Haag&count=1&format=json"
        );
    }

    #[test]
    fn test_forecast_body_parses() {
        let body: ForecastResponse = serde_json::from_str(
            r#"{"daily":{"time":["2024-01-01","2024-01-02"],"weathercode":[3,71],
                "temperature_2m_max":[4.5,1.0],"temperature_2m_min":[-1.0,-3.5]}}"#,
        )
        .unwrap();
        let days = body.daily.into_days();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1], day(71, 1.0, -3.5));
    }
}
