//! Front end configuration from environment variables

use std::time::Duration;

use crate::responder::SIMULATED_REPLY_DELAY;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for the terminal front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Delay before the simulated reply resolves
    pub reply_delay: Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reply_delay: SIMULATED_REPLY_DELAY,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values fall back
    /// to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let reply_delay = lookup("GEOCHAT_REPLY_DELAY_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(defaults.reply_delay, Duration::from_millis);

        let log_format = match lookup("GEOCHAT_LOG_FORMAT").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => defaults.log_format,
        };

        Self {
            reply_delay,
            log_format,
        }
    }
}
