// src/config.rs
use crate::logging::DEFAULT_LOG_PATH;
use crate::mailer::MailerConfig;
use crate::scraper::fetcher::RetryPolicy;
use config::{builder::DefaultState, ConfigBuilder, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "TRACKER";

/// Longest wait allowed between fetch attempts.
const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid setting {0}: {1}")]
    Invalid(&'static str, String),
}

/// Everything the tracker reads from the environment (`TRACKER_*`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub target_url: String,
    pub base_origin: String,
    pub db_path: String,
    /// Empty disables the log file.
    pub log_path: String,
    pub interval_minutes: u64,
    pub max_retries: u32,
    pub retry_delay_min_secs: f64,
    pub retry_delay_max_secs: f64,
    pub request_timeout_secs: u64,
    pub image_timeout_secs: u64,

    pub brevo_api_key: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: String,
    pub to_email: Option<String>,
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("base_origin", "https://streeteasy.com")?
        .set_default("db_path", "apartments.db")?
        .set_default("log_path", DEFAULT_LOG_PATH)?
        .set_default("interval_minutes", 5)?
        .set_default("max_retries", 3)?
        .set_default("retry_delay_min_secs", 2.0)?
        .set_default("retry_delay_max_secs", 5.0)?
        .set_default("request_timeout_secs", 30)?
        .set_default("image_timeout_secs", 10)?
        .set_default("sender_name", "Apartment Tracker")
}

impl Settings {
    /// Loads from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    /// Loads from an explicit variable map instead of the process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_environment(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(vars)),
        )
    }

    fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = with_defaults()?
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.target_url.trim().is_empty() {
            return Err(ConfigError::Invalid("target_url", "must not be empty".into()));
        }
        if self.interval_minutes == 0 {
            return Err(ConfigError::Invalid("interval_minutes", "must be at least 1".into()));
        }
        if self.interval_minutes.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid(
                "interval_minutes",
                format!("{} is too large", self.interval_minutes),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("max_retries", "must be at least 1".into()));
        }
        for (name, secs) in [
            ("retry_delay_min_secs", self.retry_delay_min_secs),
            ("retry_delay_max_secs", self.retry_delay_max_secs),
        ] {
            if !secs.is_finite() || !(0.0..=MAX_RETRY_DELAY_SECS).contains(&secs) {
                return Err(ConfigError::Invalid(
                    name,
                    format!("{secs} is not between 0 and {MAX_RETRY_DELAY_SECS}"),
                ));
            }
        }
        if self.retry_delay_max_secs < self.retry_delay_min_secs {
            return Err(ConfigError::Invalid(
                "retry_delay_max_secs",
                format!(
                    "range {}..{} is not valid",
                    self.retry_delay_min_secs, self.retry_delay_max_secs
                ),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            min_delay: Duration::from_secs_f64(self.retry_delay_min_secs),
            max_delay: Duration::from_secs_f64(self.retry_delay_max_secs),
        }
    }

    pub fn mailer_config(&self) -> MailerConfig {
        MailerConfig {
            api_key: self.brevo_api_key.clone(),
            sender_email: self.sender_email.clone(),
            sender_name: self.sender_name.clone(),
            to_email: self.to_email.clone(),
        }
    }
}
