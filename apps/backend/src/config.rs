//! Server configuration, loaded from the environment at startup.

use std::str::FromStr;

use chrono::Duration;
use invin_core::{CuratedSequence, GradingPolicy, MatchingMode};

/// A configuration value that could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Could not read {0}: {1}")]
    File(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    /// `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// `None` disables the admin routes.
    pub admin_token: Option<String>,
    pub curated: CuratedSequence,
    pub dev_session_ttl: Duration,
    pub dev_mode: bool,
    pub dev_email: String,
    pub feed_default_page_size: usize,
    pub feed_max_page_size: usize,
    pub grading: GradingPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            database_url: None,
            database_max_connections: 10,
            admin_token: None,
            curated: CuratedSequence::default(),
            dev_session_ttl: Duration::days(7),
            dev_mode: false,
            dev_email: "dev@invin.local".to_string(),
            feed_default_page_size: 10,
            feed_max_page_size: 50,
            grading: GradingPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// `.env` is read outside of tests only, so tests stay hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset and blank values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse(&var, "PORT", 3000)?;

        let curated = match var("CURATED_PLAYABLES_FILE") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::File(path.clone(), e.to_string()))?;
                serde_json::from_str::<CuratedSequence>(&raw)
                    .map_err(|e| ConfigError::File(path, e.to_string()))?
            }
            None => CuratedSequence::new(
                var("CURATED_PLAYABLES")
                    .unwrap_or_default()
                    .split(',')
                    .map(str::to_string),
            ),
        };

        let dev_session_days: i64 = parse(&var, "DEV_SESSION_TTL_DAYS", 7)?;
        if dev_session_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "DEV_SESSION_TTL_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let feed_default_page_size: usize =
            parse(&var, "FEED_DEFAULT_PAGE_SIZE", defaults.feed_default_page_size)?;
        let feed_max_page_size: usize =
            parse(&var, "FEED_MAX_PAGE_SIZE", defaults.feed_max_page_size)?;
        if feed_max_page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "FEED_MAX_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if feed_default_page_size == 0 || feed_default_page_size > feed_max_page_size {
            return Err(ConfigError::InvalidValue(
                "FEED_DEFAULT_PAGE_SIZE".to_string(),
                format!("must be between 1 and {feed_max_page_size}"),
            ));
        }

        let matching_mode = match var("ANSWER_MATCHING") {
            Some(raw) => MatchingMode::from_str(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "ANSWER_MATCHING".to_string(),
                    format!("'{raw}' is not case_insensitive or fuzzy"),
                )
            })?,
            None => MatchingMode::default(),
        };
        let fuzzy_threshold: f64 = parse(&var, "FUZZY_THRESHOLD", 0.85)?;
        if !(0.0..=1.0).contains(&fuzzy_threshold) {
            return Err(ConfigError::InvalidValue(
                "FUZZY_THRESHOLD".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }

        Ok(Self {
            bind_address: format!("{host}:{port}"),
            database_url: var("DATABASE_URL"),
            database_max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS", 10)?,
            admin_token: var("ADMIN_TOKEN"),
            curated,
            dev_session_ttl: Duration::days(dev_session_days),
            dev_mode: parse_bool(&var, "DEV_MODE")?,
            dev_email: var("DEV_EMAIL").unwrap_or(defaults.dev_email),
            feed_default_page_size,
            feed_max_page_size,
            grading: GradingPolicy {
                matching_mode,
                fuzzy_threshold,
            },
        })
    }
}

fn parse<T, V>(var: &V, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool<V>(var: &V, key: &str) -> Result<bool, ConfigError>
where
    V: Fn(&str) -> Option<String>,
{
    match var(key).map(|v| v.to_lowercase()).as_deref() {
        None | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{other}' is not a boolean"),
        )),
    }
}
