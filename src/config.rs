use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::info;

use crate::importer::{ImportOptions, DEFAULT_BATCH_AMOUNT, DEFAULT_PAUSE_MS};
use crate::retry::RetryPolicy;
use crate::source::DEFAULT_SOURCE_URL;

pub const DEFAULT_QUIZ_SIZE: usize = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub source_url: String,
    pub quiz_size: usize,
    pub batch_amount: u32,
    pub http_timeout: Duration,
}

impl Config {
    /// Reads settings from the environment, falling back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self {
            port: try_load("TRIVIA_PORT", "3001")?,
            db_path: try_load("TRIVIA_DB_PATH", "trivia.sqlite")?,
            source_url: try_load("TRIVIA_SOURCE_URL", DEFAULT_SOURCE_URL)?,
            quiz_size: try_load("TRIVIA_QUIZ_SIZE", &DEFAULT_QUIZ_SIZE.to_string())?,
            batch_amount: try_load("TRIVIA_BATCH_AMOUNT", &DEFAULT_BATCH_AMOUNT.to_string())?,
            http_timeout: Duration::from_secs(try_load("TRIVIA_HTTP_TIMEOUT_SECS", "30")?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that parse but would make every quiz or fetch fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quiz_size == 0 {
            return Err(invalid("TRIVIA_QUIZ_SIZE", "0", "must be at least 1"));
        }
        if self.batch_amount == 0 {
            return Err(invalid("TRIVIA_BATCH_AMOUNT", "0", "must be at least 1"));
        }
        if self.http_timeout.is_zero() {
            return Err(invalid("TRIVIA_HTTP_TIMEOUT_SECS", "0", "must be at least 1"));
        }
        Ok(())
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            amount: self.batch_amount,
            retry: RetryPolicy::default(),
            pause_ms: DEFAULT_PAUSE_MS,
        }
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse(key, &value)
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_values() {
        let port: u16 = parse("TRIVIA_PORT", "8080").unwrap();
        assert_eq!(port, 8080);

        let size: usize = parse("TRIVIA_QUIZ_SIZE", " 10 ").unwrap();
        assert_eq!(size, 10);
    }

    #[test]
    fn test_parse_invalid_value_names_key() {
        let err = parse::<u16>("TRIVIA_PORT", "not-a-port").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("TRIVIA_PORT"));
        assert!(message.contains("not-a-port"));
    }

    fn defaults() -> Config {
        Config {
            port: 3001,
            db_path: "trivia.sqlite".to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            quiz_size: DEFAULT_QUIZ_SIZE,
            batch_amount: 50,
            http_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_zero_settings_are_rejected() {
        assert!(defaults().validate().is_ok());

        let config = Config { http_timeout: Duration::ZERO, ..defaults() };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("TRIVIA_HTTP_TIMEOUT_SECS"));

        let config = Config { quiz_size: 0, ..defaults() };
        assert!(config.validate().unwrap_err().to_string().contains("TRIVIA_QUIZ_SIZE"));

        let config = Config { batch_amount: 0, ..defaults() };
        assert!(config.validate().unwrap_err().to_string().contains("TRIVIA_BATCH_AMOUNT"));
    }

    #[test]
    fn test_import_options_use_source_defaults() {
        let config = defaults();

        let options = config.import_options();
        assert_eq!(options.amount, 50);
        assert_eq!(options.pause_ms, 15_000..35_000);
        assert_eq!(options.retry.max_retries, 3);
    }
}
