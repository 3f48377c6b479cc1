//! The published snapshot document
//!
//! Every field is always present in the serialized form. Missing data is an
//! explicit `null` or an empty array, so the viewer never has to guard
//! against absent keys.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Astronomy, Location};
use crate::derived::{Derived, PrecipType, WindRisk, precip_type, wet_bulb};
use crate::error::FailureKind;
use crate::models::units::round_to;
use crate::sources::SourceKind;

/// Version of the published document layout
pub const SCHEMA_VERSION: &str = "2.1";

/// Maximum number of hourly points published
pub const MAX_HOURLY_POINTS: usize = 48;

/// Maximum number of daily forecast entries published
pub const MAX_DAILY_ENTRIES: usize = 10;

/// Maximum number of tide events published
pub const MAX_TIDE_EVENTS: usize = 4;

/// Hours of the 6-minute tide curve published
pub const TIDE_CURVE_HOURS: i64 = 48;

/// One complete published weather document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub schema_version: String,
    /// When the run that produced this snapshot completed its merge
    pub generated_at: DateTime<Utc>,
    pub location: Location,
    /// Best available current conditions, station first, model second
    pub current: CurrentConditions,
    pub comparison: Comparison,
    /// Station-minus-model temperature bias
    pub hyperlocal: Option<Hyperlocal>,
    pub alerts: Vec<AlertRecord>,
    pub forecast: Vec<DailyForecast>,
    pub hourly: Vec<HourlyPoint>,
    /// Indicators computed from the forecast series
    pub derived: Derived,
    pub wind_risk: Option<WindRisk>,
    pub tides: Vec<TideEvent>,
    pub tide_curve: Vec<TidePoint>,
    pub astronomy: Astronomy,
    pub sources: BTreeMap<SourceKind, SourceStatus>,
}

/// Where a set of current conditions came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationSource {
    Station,
    Model,
}

/// Normalized current conditions. Temperatures in °F, wind in mph,
/// pressure in hPa, humidity and cloud cover in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub dew_point: Option<f64>,
    pub wet_bulb: Option<f64>,
    pub precip_type: Option<PrecipType>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub cloud_cover: Option<f64>,
    /// Inches in the last hour
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    /// Degrees the wind blows from
    pub wind_direction: Option<f64>,
    pub wind_cardinal: Option<String>,
    pub weather_code: Option<u8>,
    pub condition: Option<String>,
    pub observation_source: Option<ObservationSource>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl CurrentConditions {
    /// True when no measured field is populated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.feels_like.is_none()
            && self.dew_point.is_none()
            && self.humidity.is_none()
            && self.pressure.is_none()
            && self.cloud_cover.is_none()
            && self.precipitation.is_none()
            && self.wind_speed.is_none()
            && self.wind_gust.is_none()
            && self.wind_direction.is_none()
            && self.weather_code.is_none()
    }

    /// Fill wet bulb and precipitation type from temperature and humidity
    #[must_use]
    pub fn with_wet_bulb(mut self) -> Self {
        self.wet_bulb = wet_bulb(self.temperature, self.humidity);
        self.precip_type = precip_type(self.wet_bulb);
        self
    }
}

/// Station and model conditions side by side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub station: CurrentConditions,
    pub model: CurrentConditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperlocal {
    /// Station temperature minus model temperature, °F
    pub bias_temp: f64,
    /// Model temperature with the bias applied, °F
    pub corrected_temp: f64,
}

/// One active alert from the alert feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Option<String>,
    pub event: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub severity: String,
    /// Start of the effective window
    pub onset: Option<DateTime<Utc>>,
    /// End of the effective window
    pub expires: Option<DateTime<Utc>>,
}

/// One day of the 10-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Local calendar date at the location
    pub date: NaiveDate,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub feels_like_max: Option<f64>,
    pub feels_like_min: Option<f64>,
    pub weather_code: Option<u8>,
    pub condition: Option<String>,
    /// Percent
    pub precipitation_probability: Option<f64>,
    /// Inches
    pub precipitation_sum: Option<f64>,
    pub wind_speed_max: Option<f64>,
    pub wind_gust_max: Option<f64>,
    pub uv_index_max: Option<f64>,
}

/// One hour of the 48-hour series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub time: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub dew_point: Option<f64>,
    pub wet_bulb: Option<f64>,
    pub precip_type: Option<PrecipType>,
    pub humidity: Option<f64>,
    /// Sea-level pressure, hPa
    pub pressure: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub weather_code: Option<u8>,
    /// Inches
    pub precipitation: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_direction: Option<f64>,
    /// °F at 850 hPa
    pub temperature_850hpa: Option<f64>,
    /// Geopotential height of 850 hPa, metres
    pub height_850hpa: Option<f64>,
}

impl HourlyPoint {
    /// An hour with no values yet
    #[must_use]
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time,
            temperature: None,
            feels_like: None,
            dew_point: None,
            wet_bulb: None,
            precip_type: None,
            humidity: None,
            pressure: None,
            cloud_cover: None,
            weather_code: None,
            precipitation: None,
            precipitation_probability: None,
            wind_speed: None,
            wind_gust: None,
            wind_direction: None,
            temperature_850hpa: None,
            height_850hpa: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideKind {
    High,
    Low,
}

/// A predicted high or low tide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TideKind,
    /// Feet above MLLW
    pub height: f64,
}

/// One point of the 6-minute predicted water level curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidePoint {
    pub time: DateTime<Utc>,
    /// Feet above MLLW
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Ok,
    Error,
}

/// Outcome of one source for this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub status: SourceState,
    pub kind: Option<FailureKind>,
    pub error: Option<String>,
    /// When the source was queried; `None` if it never was
    pub updated_at: Option<DateTime<Utc>>,
    /// Minutes between `updated_at` and the snapshot's `generated_at`
    pub age_minutes: Option<f64>,
    /// Forecast models that served the data
    pub model: Option<String>,
}

impl SourceStatus {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: SourceState::Ok,
            kind: None,
            error: None,
            updated_at: None,
            age_minutes: None,
            model: None,
        }
    }

    #[must_use]
    pub fn failed(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            status: SourceState::Error,
            kind: Some(kind),
            error: Some(error.into()),
            ..Self::ok()
        }
    }

    /// Stamp the query time and its age relative to `generated_at`
    #[must_use]
    pub fn updated(mut self, updated_at: DateTime<Utc>, generated_at: DateTime<Utc>) -> Self {
        let age_seconds = (generated_at - updated_at).num_milliseconds() as f64 / 1000.0;
        self.updated_at = Some(updated_at);
        self.age_minutes = Some(round_to(age_seconds / 60.0, 1));
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}
