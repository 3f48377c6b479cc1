//! Configuration management for the collector
//!
//! Configuration is assembled once at process start from built-in defaults,
//! an optional TOML file and `COVEWATCH__` environment variables, validated,
//! and then passed by reference to every source client. Nothing reads it
//! from globals.

use crate::CollectorError;
use crate::derived::{ExposureSector, default_exposure};
use crate::telemetry::LogFormat;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "COVEWATCH_CONFIG";

/// Root configuration structure for the collector
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CollectorConfig {
    /// The single location this collector reports on
    #[serde(default)]
    pub location: LocationConfig,
    /// Observation and tide station identifiers
    #[serde(default)]
    pub stations: StationsConfig,
    /// Upstream endpoints and request behaviour
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Site exposure used to score wind risk
    #[serde(default)]
    pub wind_risk: WindRiskConfig,
    /// Where the snapshot is published
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fixed location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Display name
    #[serde(default = "default_location_name")]
    pub name: String,
    /// Latitude in decimal degrees
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    /// IANA time zone used to interpret forecast local times
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// Station identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Observation station id as known to api.weather.gov (airport or CWOP station)
    #[serde(default = "default_weather_station")]
    pub weather_station: String,
    /// NOAA CO-OPS tide prediction station id
    #[serde(default = "default_tide_station")]
    pub tide_station: String,
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Open-Meteo base URL
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    /// api.weather.gov base URL used for station observations
    #[serde(default = "default_nws_url")]
    pub station_url: String,
    /// NOAA CO-OPS data getter base URL
    #[serde(default = "default_tides_url")]
    pub tides_url: String,
    /// api.weather.gov base URL used for alerts
    #[serde(default = "default_nws_url")]
    pub alerts_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Open-Meteo model for the hourly series; falls back to the blended
    /// default when it fails. Empty for the blended default only.
    #[serde(default = "default_hourly_model")]
    pub hourly_model: Option<String>,
    /// Open-Meteo model for the daily series, with the same fallback
    #[serde(default = "default_daily_model")]
    pub daily_model: Option<String>,
    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Wind risk settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindRiskConfig {
    /// Hours of the hourly series searched for peaks
    #[serde(default = "default_wind_window")]
    pub window_hours: usize,
    /// Exposure factor per compass sector
    #[serde(default = "default_exposure")]
    pub exposure: Vec<ExposureSector>,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path of the published JSON document
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_location_name() -> String {
    "Wyman Cove, Marblehead MA".to_string()
}

fn default_latitude() -> f64 {
    42.5014
}

fn default_longitude() -> f64 {
    -70.8750
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_weather_station() -> String {
    "KBVY".to_string()
}

fn default_tide_station() -> String {
    "8442645".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_nws_url() -> String {
    "https://api.weather.gov".to_string()
}

fn default_tides_url() -> String {
    "https://api.tidesandcurrents.noaa.gov/api/prod".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_hourly_model() -> Option<String> {
    Some("ncep_hrrr_conus".to_string())
}

fn default_daily_model() -> Option<String> {
    Some("ecmwf_ifs025".to_string())
}

fn default_wind_window() -> usize {
    12
}

fn default_user_agent() -> String {
    format!("covewatch/{} (static weather snapshot)", crate::VERSION)
}

fn default_output_path() -> PathBuf {
    PathBuf::from("weather_data.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: default_location_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            timezone: default_timezone(),
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            weather_station: default_weather_station(),
            tide_station: default_tide_station(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            station_url: default_nws_url(),
            tides_url: default_tides_url(),
            alerts_url: default_nws_url(),
            timeout_seconds: default_timeout(),
            hourly_model: default_hourly_model(),
            daily_model: default_daily_model(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for WindRiskConfig {
    fn default() -> Self {
        Self {
            window_hours: default_wind_window(),
            exposure: default_exposure(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CollectorConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from("covewatch.toml");
                local.exists().then_some(local)
            })
            .or_else(Self::get_config_path);

        if let Some(config_file) = config_file.filter(|path| path.exists()) {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // COVEWATCH__SOURCES__TIMEOUT_SECONDS=10 style overrides
        builder = builder.add_source(
            Environment::with_prefix("COVEWATCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: CollectorConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("covewatch").join("config.toml"))
    }

    /// Parsed time zone of the location
    pub fn timezone(&self) -> Result<Tz> {
        self.location.timezone.parse::<Tz>().map_err(|_| {
            CollectorError::config(format!(
                "Unknown time zone '{}'",
                self.location.timezone
            ))
            .into()
        })
    }

    /// Per-request timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.timeout_seconds)
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_location()?;
        self.validate_stations()?;
        self.validate_sources()?;
        self.validate_wind_risk()?;
        self.validate_output()?;
        self.validate_logging()?;
        Ok(())
    }

    fn validate_location(&self) -> Result<()> {
        let location = &self.location;

        if !(-90.0..=90.0).contains(&location.latitude) {
            return Err(CollectorError::config(format!(
                "Latitude must be between -90 and 90, got: {}",
                location.latitude
            ))
            .into());
        }

        if !(-180.0..=180.0).contains(&location.longitude) {
            return Err(CollectorError::config(format!(
                "Longitude must be between -180 and 180, got: {}",
                location.longitude
            ))
            .into());
        }

        if location.name.trim().is_empty() {
            return Err(CollectorError::config("Location name cannot be empty").into());
        }

        self.timezone()?;
        Ok(())
    }

    fn validate_stations(&self) -> Result<()> {
        if self.stations.weather_station.trim().is_empty() {
            return Err(CollectorError::config("Weather station id cannot be empty").into());
        }

        if self.stations.tide_station.trim().is_empty() {
            return Err(CollectorError::config("Tide station id cannot be empty").into());
        }

        Ok(())
    }

    fn validate_sources(&self) -> Result<()> {
        let sources = &self.sources;

        if sources.timeout_seconds == 0 {
            return Err(CollectorError::config("Request timeout must be at least 1 second").into());
        }

        if sources.timeout_seconds > 300 {
            return Err(
                CollectorError::config("Request timeout cannot exceed 300 seconds").into(),
            );
        }

        for (name, url) in [
            ("forecast_url", &sources.forecast_url),
            ("station_url", &sources.station_url),
            ("tides_url", &sources.tides_url),
            ("alerts_url", &sources.alerts_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CollectorError::config(format!(
                    "sources.{name} must be a valid HTTP or HTTPS URL, got '{url}'"
                ))
                .into());
            }
        }

        if sources.user_agent.trim().is_empty() {
            return Err(CollectorError::config("User agent cannot be empty").into());
        }

        Ok(())
    }

    fn validate_wind_risk(&self) -> Result<()> {
        let wind_risk = &self.wind_risk;

        if wind_risk.window_hours == 0 || wind_risk.window_hours > 48 {
            return Err(CollectorError::config(format!(
                "Wind risk window must be between 1 and 48 hours, got: {}",
                wind_risk.window_hours
            ))
            .into());
        }

        for sector in &wind_risk.exposure {
            let in_compass = |deg: f64| (0.0..=360.0).contains(&deg);
            if !in_compass(sector.from) || !in_compass(sector.to) || sector.from == sector.to {
                return Err(CollectorError::config(format!(
                    "Exposure sector {}..{} must span 0 to 360 degrees",
                    sector.from, sector.to
                ))
                .into());
            }

            if !(0.0..=1.0).contains(&sector.factor) {
                return Err(CollectorError::config(format!(
                    "Exposure factor must be between 0 and 1, got: {}",
                    sector.factor
                ))
                .into());
            }
        }

        Ok(())
    }

    fn validate_output(&self) -> Result<()> {
        if self.output.path.as_os_str().is_empty() {
            return Err(CollectorError::config("Output path cannot be empty").into());
        }
        Ok(())
    }

    fn validate_logging(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(CollectorError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        LogFormat::parse(&self.logging.format)?;
        Ok(())
    }
}
