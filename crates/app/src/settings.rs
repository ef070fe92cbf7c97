//! Handles settings for the application. Configuration is written in
//! `settings.toml` and may be overridden through `SPENDBOT__SECTION__KEY`
//! environment variables.
//!
//! See `settings.toml` for the configuration.

use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use engine::{CachePolicy, RangeRounding, RateTiming};
use serde::Deserialize;

const SETTINGS_PATH_VAR: &str = "SPENDBOT_SETTINGS";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    #[serde(default = "default_lanes")]
    pub lanes: usize,
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,
}

impl Telegram {
    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }
}

fn default_lanes() -> usize {
    1
}

fn default_event_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Currency {
    pub feed_url: String,
    pub refresh_interval_secs: u64,
    pub refresh_timeout_ms: u64,
    pub timezone: Tz,
    pub rate_timing: RateTiming,
}

impl Currency {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            feed_url: "https://www.cbr.ru/scripts/XML_daily.asp?date_req=".to_string(),
            refresh_interval_secs: 3600,
            refresh_timeout_ms: 3000,
            timezone: chrono_tz::Europe::Moscow,
            rate_timing: RateTiming::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Cache {
    pub redis_url: Option<String>,
    pub policy: CachePolicy,
    pub rounding: RangeRounding,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Base-currency minor units.
    pub default_minor: i64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_minor: engine::DEFAULT_MONTHLY_LIMIT.minor(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub telegram: Option<Telegram>,
    pub currency: Currency,
    pub cache: Cache,
    pub limits: Limits,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var(SETTINGS_PATH_VAR).unwrap_or_else(|_| "settings".to_string());
        let settings = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("SPENDBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = parse("");
        assert_eq!(settings.app.level, "info");
        assert!(matches!(settings.database, Database::Memory));
        assert!(settings.telegram.is_none());
        assert_eq!(settings.currency.refresh_interval(), Duration::from_secs(3600));
        assert_eq!(settings.currency.timezone, chrono_tz::Europe::Moscow);
        assert_eq!(settings.cache.policy, CachePolicy::Permanent);
        assert_eq!(settings.cache.rounding, RangeRounding::Exact);
        assert_eq!(settings.limits.default_minor, 1_000_000);
    }

    #[test]
    fn sections_override_defaults() {
        let settings = parse(
            r#"
            database = { sqlite = "spend.db" }

            [telegram]
            token = "123:abc"
            lanes = 4

            [currency]
            timezone = "Europe/Berlin"
            rate_timing = "expense_date"

            [cache]
            redis_url = "redis://127.0.0.1/"
            policy = "invalidate_on_write"
            rounding = "whole_days"
            "#,
        );

        assert!(matches!(settings.database, Database::Sqlite(ref path) if path == "spend.db"));
        let telegram = settings.telegram.unwrap();
        assert_eq!(telegram.lanes, 4);
        assert_eq!(telegram.event_timeout(), Duration::from_secs(10));
        assert_eq!(settings.currency.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.currency.rate_timing, RateTiming::ExpenseDate);
        assert_eq!(settings.cache.policy, CachePolicy::InvalidateOnWrite);
        assert_eq!(settings.cache.rounding, RangeRounding::WholeDays);
    }
}
