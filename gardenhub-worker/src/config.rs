/// Worker configuration
///
/// Loaded once from environment variables (a `.env` file is honoured).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool ceiling (default: 5)
/// - `PUSH_SERVER_KEY`: push provider key; push is disabled when unset
/// - `PUSH_ENDPOINT`: push provider URL (default: FCM legacy endpoint)
/// - `WEATHER_GEOCODING_URL`: geocoding search endpoint (default: Open-Meteo)
/// - `WEATHER_FORECAST_URL`: daily forecast endpoint (default: Open-Meteo)
/// - `RECURRING_DRY_RUN`: compute recurring instances without writing (default: false)

use gardenhub_shared::notify::push::DEFAULT_PUSH_ENDPOINT;
use std::env;

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub push: PushConfig,
    pub weather: WeatherConfig,

    /// Log recurring instances instead of creating them
    pub recurring_dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub endpoint: String,
    pub server_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?;

        let server_key = env::var("PUSH_SERVER_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            push: PushConfig {
                endpoint: env::var("PUSH_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_PUSH_ENDPOINT.to_string()),
                server_key,
            },
            weather: WeatherConfig {
                geocoding_url: env::var("WEATHER_GEOCODING_URL")
                    .unwrap_or_else(|_| DEFAULT_GEOCODING_URL.to_string()),
                forecast_url: env::var("WEATHER_FORECAST_URL")
                    .unwrap_or_else(|_| DEFAULT_FORECAST_URL.to_string()),
            },
            recurring_dry_run: parse_flag(env::var("RECURRING_DRY_RUN").ok().as_deref()),
        })
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" 1 ")));
        assert!(parse_flag(Some("YES")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }
}
