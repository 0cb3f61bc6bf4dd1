use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "AEROWX_CONFIG";

/// Floor for upstream call spacing. The provider allows 100 requests per
/// minute.
pub const MIN_REQUEST_SPACING_MS: u64 = 700;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a single-line message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Airports to keep in the cache (ICAO codes, upper-cased on load)
    pub airport_codes: Vec<String>,

    /// Fetch TAF forecasts alongside METAR observations
    pub include_taf: bool,

    /// Cadence of the scheduled sync trigger, in minutes
    pub update_interval_minutes: u32,

    /// IANA zone used for local time display; system zone when unset
    pub timezone: Option<String>,

    /// Location of the persisted cache document
    pub cache_path: Option<PathBuf>,

    /// Default log filter when RUST_LOG is not set
    pub log_level: String,

    /// Upstream weather API settings
    pub upstream: UpstreamConfig,

    /// Home-automation publishing settings
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the aviation weather data API
    pub base_url: String,

    /// User-Agent header sent with every upstream call
    pub user_agent: String,

    /// Per-call timeout in seconds
    pub request_timeout_secs: u64,

    /// Minimum spacing between two consecutive upstream calls, never
    /// below `MIN_REQUEST_SPACING_MS`
    pub min_request_spacing_ms: u64,
}

impl UpstreamConfig {
    /// Spacing the rate gate enforces: the configured value, raised to the
    /// floor when set lower.
    pub fn request_spacing(&self) -> Duration {
        Duration::from_millis(self.min_request_spacing_ms.max(MIN_REQUEST_SPACING_MS))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aviationweather.gov/api/data".to_string(),
            user_agent: concat!("AeroWx/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 10,
            min_request_spacing_ms: 700,
        }
    }
}

/// Which airports get pushed to the home-automation sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorAirport {
    /// Every configured airport
    All,
    /// The configured airport nearest to the home location
    Auto,
    /// One explicit airport
    Code(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Publish sensors and the weather entity at all
    pub create_sensors: bool,

    /// `all`, `auto`, or an ICAO code
    pub sensor_airport: String,

    /// Platform REST API base URL
    pub supervisor_url: String,

    /// Bearer token for the platform API (SUPERVISOR_TOKEN when unset)
    pub supervisor_token: Option<String>,

    /// Optional message bus for sensor discovery
    pub mqtt: Option<MqttConfig>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            create_sensors: false,
            sensor_airport: "auto".to_string(),
            supervisor_url: "http://supervisor/core/api".to_string(),
            supervisor_token: None,
            mqtt: None,
        }
    }
}

impl PublishConfig {
    /// Interpret the `sensor_airport` setting
    pub fn sensor_airport_choice(&self) -> SensorAirport {
        let value = self.sensor_airport.trim();
        if value.eq_ignore_ascii_case("all") {
            SensorAirport::All
        } else if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            SensorAirport::Auto
        } else {
            SensorAirport::Code(value.to_ascii_uppercase())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub discovery_prefix: String,
    pub client_id: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            discovery_prefix: "homeassistant".to_string(),
            client_id: "aerowx".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            airport_codes: Vec::new(),
            include_taf: true,
            update_interval_minutes: 30,
            timezone: None,
            cache_path: None,
            log_level: "info".to_string(),
            upstream: UpstreamConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (or `AEROWX_CONFIG`).
    pub fn load() -> Result<Self> {
        let path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => Self::default_config_path()?,
        };
        Self::load_from(&path)
    }

    /// Load configuration from a TOML file layered with `AEROWX_*` environment
    /// variables. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
        }

        let layered = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("AEROWX")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("airport_codes")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Config = layered
            .try_deserialize()
            .context("Failed to parse config file")?;

        config.normalize();
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with its validation result so the caller
    /// can report warnings once logging is up. Fails on validation errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        Ok((config, validation))
    }

    fn normalize(&mut self) {
        self.airport_codes = self
            .airport_codes
            .iter()
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();

        if self.publish.supervisor_token.is_none() {
            self.publish.supervisor_token = std::env::var("SUPERVISOR_TOKEN").ok();
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.upstream.base_url, "upstream.base_url", &mut result);

        if self.upstream.request_timeout_secs == 0 {
            result.add_error(
                "upstream.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.upstream.min_request_spacing_ms < MIN_REQUEST_SPACING_MS {
            result.add_warning(
                "upstream.min_request_spacing_ms",
                format!(
                    "Spacing below {}ms would exceed 100 requests/minute; using {}ms",
                    MIN_REQUEST_SPACING_MS, MIN_REQUEST_SPACING_MS
                ),
            );
        }

        if self.airport_codes.is_empty() {
            result.add_warning("airport_codes", "No airports configured - nothing to sync");
        }

        for code in &self.airport_codes {
            let looks_like_icao =
                (3..=4).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric());
            if !looks_like_icao {
                result.add_warning(
                    "airport_codes",
                    format!("'{}' does not look like an ICAO code", code),
                );
            }
        }

        if self.update_interval_minutes == 0 {
            result.add_warning(
                "update_interval_minutes",
                "Scheduled sync disabled (0 minutes)",
            );
        }

        if let Err(e) = self.local_timezone() {
            result.add_error("timezone", e.to_string());
        }

        if self.publish.create_sensors {
            self.validate_url(
                &self.publish.supervisor_url,
                "publish.supervisor_url",
                &mut result,
            );

            if self.publish.supervisor_token.is_none() {
                result.add_warning(
                    "publish.supervisor_token",
                    "No platform API token - entity registration will fail",
                );
            }

            if let SensorAirport::Code(code) = self.publish.sensor_airport_choice() {
                if !self.airport_codes.contains(&code) {
                    result.add_warning(
                        "publish.sensor_airport",
                        format!("{} is not in airport_codes, the first airport will be used", code),
                    );
                }
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Configured local zone, `None` meaning the system zone
    pub fn local_timezone(&self) -> Result<Option<Tz>, ConfigError> {
        match self.timezone.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name
                .parse::<Tz>()
                .map(Some)
                .map_err(|_| ConfigError::Invalid(format!("Unknown timezone: {}", name))),
        }
    }

    /// Cache document location, falling back to the user data directory
    pub fn effective_cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("aerowx")
                .join("weather_cache.json")
        })
    }

    /// Get the default path of the configuration file
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("aerowx");

        Ok(config_dir.join("config.toml"))
    }
}
