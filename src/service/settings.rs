//! Service settings loaded from the environment.
//!
//! | Variable          | Default     | Meaning                          |
//! |-------------------|-------------|----------------------------------|
//! | `WEB_HOST`        | `127.0.0.1` | listen address                   |
//! | `WEB_PORT`        | `8833`      | listen port                      |
//! | `RATE_LIMIT`      | `1`         | enable per-client rate limiting  |
//! | `RATE_LIMIT_RATE` | `60`        | requests allowed per window      |
//! | `RATE_LIMIT_PER`  | `60`        | window length in seconds         |

use crate::rate_limiter::{ConfigResult, RateLimiterConfig};
use std::time::Duration;
use thiserror::Error;

const WEB_HOST: &str = "WEB_HOST";
const WEB_PORT: &str = "WEB_PORT";
const RATE_LIMIT: &str = "RATE_LIMIT";
const RATE_LIMIT_RATE: &str = "RATE_LIMIT_RATE";
const RATE_LIMIT_PER: &str = "RATE_LIMIT_PER";

/// A setting that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {key}: expected {expected}")]
pub struct SettingsError {
    /// Environment variable name.
    pub key: &'static str,
    /// Raw value found.
    pub value: String,
    /// What the variable should contain.
    pub expected: &'static str,
}

/// Runtime settings for the QR service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Whether per-client rate limiting is on.
    pub rate_limit: bool,
    /// Requests allowed per window.
    pub rate_limit_rate: i64,
    /// Window length in seconds.
    pub rate_limit_per: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8833,
            rate_limit: true,
            rate_limit_rate: 60,
            rate_limit_per: 60,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for the first variable that is set but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for
    /// variables it does not return.
    ///
    /// # Errors
    ///
    /// Same as [`Settings::from_env`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use qrgate::Settings;
    ///
    /// let settings = Settings::from_lookup(|key| match key {
    ///     "WEB_PORT" => Some("9000".to_string()),
    ///     "RATE_LIMIT" => Some("no".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(settings.port, 9000);
    /// assert!(!settings.rate_limit);
    /// assert_eq!(settings.bind_addr(), "127.0.0.1:9000");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            host: lookup(WEB_HOST).unwrap_or(defaults.host),
            port: match lookup(WEB_PORT) {
                Some(raw) => parse_number(WEB_PORT, raw, "a port number")?,
                None => defaults.port,
            },
            rate_limit: match lookup(RATE_LIMIT) {
                Some(raw) => parse_bool(RATE_LIMIT, raw)?,
                None => defaults.rate_limit,
            },
            rate_limit_rate: match lookup(RATE_LIMIT_RATE) {
                Some(raw) => parse_number(RATE_LIMIT_RATE, raw, "an integer")?,
                None => defaults.rate_limit_rate,
            },
            rate_limit_per: match lookup(RATE_LIMIT_PER) {
                Some(raw) => parse_number(RATE_LIMIT_PER, raw, "a non-negative number of seconds")?,
                None => defaults.rate_limit_per,
            },
        })
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validated limiter configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::ConfigError) when the rate or the window
    /// is not positive.
    pub fn rate_limiter_config(&self) -> ConfigResult<RateLimiterConfig> {
        let per = Duration::from_secs(self.rate_limit_per);
        let config = RateLimiterConfig::new(self.rate_limit_rate as f64, per)
            .with_enabled(self.rate_limit);
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    raw: String,
    expected: &'static str,
) -> Result<T, SettingsError> {
    raw.trim().parse().map_err(|_| SettingsError {
        key,
        value: raw,
        expected,
    })
}

fn parse_bool(key: &'static str, raw: String) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" | "t" => Ok(true),
        "0" | "false" | "no" | "n" | "off" | "f" | "" => Ok(false),
        _ => Err(SettingsError {
            key,
            value: raw,
            expected: "a boolean",
        }),
    }
}
