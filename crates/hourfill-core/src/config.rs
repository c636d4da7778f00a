use crate::error::{HourfillError, Result};
use crate::models::TimeUnit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default upstream API root
pub const DEFAULT_BASE_URL: &str = "https://api.eia.gov/v2/";

/// Environment variables checked for the API credential, in order
pub const API_KEY_VARS: [&str; 2] = ["HOURFILL_API_KEY", "EIA_API_KEY"];

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for Hourfill
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub base_url: ConfigValue<String>,
    pub frequency: ConfigValue<TimeUnit>,
    pub offset: ConfigValue<i64>,
    pub page_size: ConfigValue<usize>,
    pub missing_tolerance: ConfigValue<f64>,
    pub max_retries: ConfigValue<u32>,
    pub retry_backoff_ms: ConfigValue<u64>,
    pub request_timeout_secs: ConfigValue<u64>,
    pub catalog_path: ConfigValue<PathBuf>,
    pub data_path: ConfigValue<PathBuf>,
    pub ledger_path: ConfigValue<PathBuf>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            base_url: ConfigValue::new(DEFAULT_BASE_URL.to_string(), ConfigSource::Default),
            frequency: ConfigValue::new(TimeUnit::Hour, ConfigSource::Default),
            offset: ConfigValue::new(2250, ConfigSource::Default),
            page_size: ConfigValue::new(5000, ConfigSource::Default),
            missing_tolerance: ConfigValue::new(0.05, ConfigSource::Default),
            max_retries: ConfigValue::new(2, ConfigSource::Default),
            retry_backoff_ms: ConfigValue::new(500, ConfigSource::Default),
            request_timeout_secs: ConfigValue::new(30, ConfigSource::Default),
            catalog_path: ConfigValue::new(PathBuf::from("metadata/series.json"), ConfigSource::Default),
            data_path: ConfigValue::new(PathBuf::from("csv/data.csv"), ConfigSource::Default),
            ledger_path: ConfigValue::new(PathBuf::from("metadata/log.csv"), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| HourfillError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| HourfillError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(base_url) = file_config.base_url {
            self.base_url.update(base_url, ConfigSource::File);
        }
        if let Some(frequency) = file_config.frequency {
            self.frequency.update(TimeUnit::from_frequency(&frequency)?, ConfigSource::File);
        }
        if let Some(offset) = file_config.offset {
            self.offset.update(offset, ConfigSource::File);
        }
        if let Some(page_size) = file_config.page_size {
            self.page_size.update(page_size, ConfigSource::File);
        }
        if let Some(tolerance) = file_config.missing_tolerance {
            self.missing_tolerance.update(tolerance, ConfigSource::File);
        }
        if let Some(max_retries) = file_config.max_retries {
            self.max_retries.update(max_retries, ConfigSource::File);
        }
        if let Some(backoff) = file_config.retry_backoff_ms {
            self.retry_backoff_ms.update(backoff, ConfigSource::File);
        }
        if let Some(timeout) = file_config.request_timeout_secs {
            self.request_timeout_secs.update(timeout, ConfigSource::File);
        }
        if let Some(path) = file_config.catalog_path {
            self.catalog_path.update(path, ConfigSource::File);
        }
        if let Some(path) = file_config.data_path {
            self.data_path.update(path, ConfigSource::File);
        }
        if let Some(path) = file_config.ledger_path {
            self.ledger_path.update(path, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load the file only if it exists
    pub fn load_from_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().exists() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(url) = env::var("HOURFILL_BASE_URL") {
            self.base_url.update(url, ConfigSource::Environment);
        }

        if let Ok(freq) = env::var("HOURFILL_FREQUENCY") {
            match TimeUnit::from_frequency(&freq) {
                Ok(unit) => self.frequency.update(unit, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid HOURFILL_FREQUENCY value '{}': expected hourly or daily",
                    freq
                ),
            }
        }

        env_parse("HOURFILL_OFFSET", &mut self.offset, "positive integer");
        env_parse("HOURFILL_PAGE_SIZE", &mut self.page_size, "positive integer");
        env_parse("HOURFILL_MISSING_TOLERANCE", &mut self.missing_tolerance, "fraction between 0 and 1");
        env_parse("HOURFILL_MAX_RETRIES", &mut self.max_retries, "integer");
        env_parse("HOURFILL_RETRY_BACKOFF_MS", &mut self.retry_backoff_ms, "milliseconds");
        env_parse("HOURFILL_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs, "seconds");

        if let Ok(path) = env::var("HOURFILL_CATALOG_PATH") {
            self.catalog_path.update(PathBuf::from(path), ConfigSource::Environment);
        }
        if let Ok(path) = env::var("HOURFILL_DATA_PATH") {
            self.data_path.update(PathBuf::from(path), ConfigSource::Environment);
        }
        if let Ok(path) = env::var("HOURFILL_LEDGER_PATH") {
            self.ledger_path.update(PathBuf::from(path), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(offset) = overrides.offset {
            self.offset.update(offset, ConfigSource::Cli);
        }
        if let Some(tolerance) = overrides.missing_tolerance {
            self.missing_tolerance.update(tolerance, ConfigSource::Cli);
        }
        if let Some(max_retries) = overrides.max_retries {
            self.max_retries.update(max_retries, ConfigSource::Cli);
        }
        if let Some(path) = overrides.catalog_path {
            self.catalog_path.update(path, ConfigSource::Cli);
        }
        if let Some(path) = overrides.data_path {
            self.data_path.update(path, ConfigSource::Cli);
        }
        if let Some(path) = overrides.ledger_path {
            self.ledger_path.update(path, ConfigSource::Cli);
        }
    }

    /// Check values that cannot be expressed by their types alone
    pub fn validate(&self) -> Result<()> {
        if self.offset.value <= 0 {
            return Err(HourfillError::ConfigInvalid {
                key: "offset".to_string(),
                reason: format!("must be positive, got {}", self.offset.value),
            });
        }
        if self.page_size.value == 0 {
            return Err(HourfillError::ConfigInvalid {
                key: "page_size".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.missing_tolerance.value) {
            return Err(HourfillError::ConfigInvalid {
                key: "missing_tolerance".to_string(),
                reason: format!("must be between 0 and 1, got {}", self.missing_tolerance.value),
            });
        }
        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("base_url".to_string(), (self.base_url.value.clone(), self.base_url.source));
        map.insert(
            "frequency".to_string(),
            (self.frequency.value.frequency().to_string(), self.frequency.source),
        );
        map.insert("offset".to_string(), (self.offset.value.to_string(), self.offset.source));
        map.insert("page_size".to_string(), (self.page_size.value.to_string(), self.page_size.source));
        map.insert(
            "missing_tolerance".to_string(),
            (self.missing_tolerance.value.to_string(), self.missing_tolerance.source),
        );
        map.insert(
            "max_retries".to_string(),
            (self.max_retries.value.to_string(), self.max_retries.source),
        );
        map.insert(
            "retry_backoff_ms".to_string(),
            (self.retry_backoff_ms.value.to_string(), self.retry_backoff_ms.source),
        );
        map.insert(
            "request_timeout_secs".to_string(),
            (self.request_timeout_secs.value.to_string(), self.request_timeout_secs.source),
        );
        map.insert(
            "catalog_path".to_string(),
            (self.catalog_path.value.display().to_string(), self.catalog_path.source),
        );
        map.insert(
            "data_path".to_string(),
            (self.data_path.value.display().to_string(), self.data_path.source),
        );
        map.insert(
            "ledger_path".to_string(),
            (self.ledger_path.value.display().to_string(), self.ledger_path.source),
        );

        map
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, slot: &mut ConfigValue<T>, expected: &str) {
    if let Ok(raw) = env::var(var) {
        match raw.parse::<T>() {
            Ok(value) => slot.update(value, ConfigSource::Environment),
            Err(_) => tracing::warn!("Invalid {} value '{}': expected {}", var, raw, expected),
        }
    }
}

/// Read the API credential from the environment, never from the config file
pub fn api_key_from_env() -> Result<String> {
    API_KEY_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| HourfillError::ConfigMissing {
            key: API_KEY_VARS.join(" or "),
        })
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    base_url: Option<String>,
    frequency: Option<String>,
    offset: Option<i64>,
    page_size: Option<usize>,
    missing_tolerance: Option<f64>,
    max_retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    catalog_path: Option<PathBuf>,
    data_path: Option<PathBuf>,
    ledger_path: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub offset: Option<i64>,
    pub missing_tolerance: Option<f64>,
    pub max_retries: Option<u32>,
    pub catalog_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
}
