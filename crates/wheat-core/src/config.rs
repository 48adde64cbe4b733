//! Settings - built once at startup and passed by reference.
//!
//! Values come from the process environment (the CLI loads an optional `.env`
//! first); anything unset falls back to its default.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{ConfigError, Format};

pub const DEFAULT_COLLECTION_FILE: &str = "input/unsorted.csv";
pub const DEFAULT_OUTPUT_FILE: &str = "output/chaff.csv";
pub const DEFAULT_DATABASE_PATH: &str = "collection.db";
pub const DEFAULT_API_BASE_URL: &str = "https://api2.moxfield.com/";
pub const DEFAULT_THROTTLE_LIMIT: usize = 10;
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Collection export read by `load-collection`.
    pub collection_file: PathBuf,
    /// Where `find-chaff --output` writes its report.
    pub output_file: PathBuf,
    pub target_format: Format,
    pub database_path: PathBuf,
    pub api_base_url: String,
    /// Requests allowed per `throttle_interval`.
    pub throttle_limit: usize,
    pub throttle_interval: Duration,
    /// Records committed per transaction.
    pub batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection_file: PathBuf::from(DEFAULT_COLLECTION_FILE),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            target_format: Format::default(),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            throttle_limit: DEFAULT_THROTTLE_LIMIT,
            throttle_interval: DEFAULT_THROTTLE_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` (variable name -> value).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = get("COLLECTION_FILE") {
            settings.collection_file = PathBuf::from(path);
        }
        if let Some(path) = get("OUTPUT_FILE") {
            settings.output_file = PathBuf::from(path);
        }
        if let Some(format) = get("TARGET_FORMAT") {
            settings.target_format = format.parse()?;
        }
        if let Some(path) = get("DATABASE_PATH") {
            settings.database_path = PathBuf::from(path);
        }
        if let Some(url) = get("API_BASE_URL") {
            settings.api_base_url = url;
        }
        if let Some(limit) = get("THROTTLE_LIMIT") {
            settings.throttle_limit = parse_positive("THROTTLE_LIMIT", &limit)?;
        }
        if let Some(ms) = get("THROTTLE_INTERVAL_MS") {
            let ms = parse_positive("THROTTLE_INTERVAL_MS", &ms)?;
            settings.throttle_interval = Duration::from_millis(ms as u64);
        }
        if let Some(size) = get("BATCH_SIZE") {
            settings.batch_size = parse_positive("BATCH_SIZE", &size)?;
        }

        Ok(settings)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        }),
    }
}
