//! Forecast-model source backed by the Open-Meteo API
//!
//! Three requests make up one forecast: current conditions from the blended
//! default, the hourly series from a short-range model and the daily series
//! from a medium-range model. Either model request falls back to the blended
//! default when its model fails. Values arrive in Fahrenheit, mph and inches
//! and every time as a Unix timestamp, so instants need no zone handling.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::http::get_json;
use super::{Fragment, RunContext, SourceClient, SourceKind};
use crate::config::{CollectorConfig, WindRiskConfig};
use crate::derived::{Derived, WindRisk, precip_type, wet_bulb, wind_risk};
use crate::error::SourceFailure;
use crate::models::snapshot::{MAX_DAILY_ENTRIES, MAX_HOURLY_POINTS};
use crate::models::units::{round_to, weather_code_to_description, wind_direction_to_cardinal};
use crate::models::{CurrentConditions, DailyForecast, HourlyPoint, ObservationSource};

const CURRENT_VARIABLES: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,\
    precipitation,weather_code,cloud_cover,pressure_msl,wind_speed_10m,wind_direction_10m,\
    wind_gusts_10m";

const HOURLY_VARIABLES: &str = "temperature_2m,relative_humidity_2m,dew_point_2m,\
    apparent_temperature,precipitation_probability,precipitation,weather_code,pressure_msl,\
    cloud_cover,wind_speed_10m,wind_direction_10m,wind_gusts_10m,temperature_850hPa,\
    geopotential_height_850hPa";

const DAILY_VARIABLES: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
    apparent_temperature_max,apparent_temperature_min,sunrise,sunset,uv_index_max,\
    precipitation_sum,precipitation_probability_max,wind_speed_10m_max,wind_gusts_10m_max";

/// Name Open-Meteo uses for its blended default
pub const BLENDED_MODEL: &str = "best_match";

/// Days requested for the hourly series; covers 48 hours from any start hour
const HOURLY_FORECAST_DAYS: usize = 3;

/// The block a single request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Current,
    Hourly,
    Daily,
}

impl Block {
    fn name(self) -> &'static str {
        match self {
            Block::Current => "current",
            Block::Hourly => "hourly",
            Block::Daily => "daily",
        }
    }

    fn variables(self) -> &'static str {
        match self {
            Block::Current => CURRENT_VARIABLES,
            Block::Hourly => HOURLY_VARIABLES,
            Block::Daily => DAILY_VARIABLES,
        }
    }

    fn forecast_days(self) -> Option<usize> {
        match self {
            Block::Current => None,
            Block::Hourly => Some(HOURLY_FORECAST_DAYS),
            Block::Daily => Some(MAX_DAILY_ENTRIES),
        }
    }
}

/// Model that answered each request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServedModels {
    pub current: Option<String>,
    pub hourly: Option<String>,
    pub daily: Option<String>,
}

impl ServedModels {
    /// `current=best_match,hourly=ncep_hrrr_conus,daily=ecmwf_ifs025`, or
    /// `None` when no request was served
    #[must_use]
    pub fn label(&self) -> Option<String> {
        let parts: Vec<String> = [
            (Block::Current, &self.current),
            (Block::Hourly, &self.hourly),
            (Block::Daily, &self.daily),
        ]
        .into_iter()
        .filter_map(|(block, model)| Some(format!("{}={}", block.name(), model.as_deref()?)))
        .collect();

        (!parts.is_empty()).then(|| parts.join(","))
    }
}

/// One decoded response and the model that produced it
#[derive(Debug, Default)]
pub struct Served {
    pub model: String,
    pub response: ForecastResponse,
}

/// The three decoded forecast responses of a run
#[derive(Debug, Default)]
pub struct ForecastParts {
    pub current: Served,
    pub hourly: Served,
    pub daily: Served,
}

/// Normalized forecast-model data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastFragment {
    pub current: CurrentConditions,
    pub daily: Vec<DailyForecast>,
    pub hourly: Vec<HourlyPoint>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub derived: Derived,
    pub wind_risk: Option<WindRisk>,
    pub models: ServedModels,
}

/// Open-Meteo forecast client
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    hourly_model: Option<String>,
    daily_model: Option<String>,
    wind_risk: WindRiskConfig,
}

/// A configured model name, treating a blank entry as none
fn model_name(model: Option<&String>) -> Option<String> {
    model
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

impl OpenMeteoClient {
    #[must_use]
    pub fn new(client: Client, config: &CollectorConfig) -> Self {
        Self {
            client,
            base_url: config.sources.forecast_url.trim_end_matches('/').to_string(),
            latitude: config.location.latitude,
            longitude: config.location.longitude,
            timezone: config.location.timezone.clone(),
            hourly_model: model_name(config.sources.hourly_model.as_ref()),
            daily_model: model_name(config.sources.daily_model.as_ref()),
            wind_risk: config.wind_risk.clone(),
        }
    }

    fn query(&self, block: Block, model: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            (block.name(), block.variables().to_string()),
            ("temperature_unit", "fahrenheit".to_string()),
            ("wind_speed_unit", "mph".to_string()),
            ("precipitation_unit", "inch".to_string()),
            ("timezone", self.timezone.clone()),
            ("timeformat", "unixtime".to_string()),
        ];
        if let Some(days) = block.forecast_days() {
            query.push(("forecast_days", days.to_string()));
        }
        if let Some(model) = model {
            query.push(("models", model.to_string()));
        }
        query
    }

    async fn request(&self, block: Block, model: Option<&str>) -> Result<Served, SourceFailure> {
        let request = self
            .client
            .get(format!("{}/forecast", self.base_url))
            .query(&self.query(block, model));

        let in_block = |failure: SourceFailure| SourceFailure {
            message: format!("{} request: {}", block.name(), failure.message),
            ..failure
        };

        let response: ForecastResponse = get_json(request, SourceKind::Forecast)
            .await
            .map_err(in_block)?;

        if response.error {
            return Err(in_block(SourceFailure::unavailable(
                SourceKind::Forecast,
                response
                    .reason
                    .unwrap_or_else(|| "Open-Meteo reported an error".to_string()),
            )));
        }

        let model = model.unwrap_or(BLENDED_MODEL).to_string();
        debug!(block = block.name(), %model, "forecast block served");
        Ok(Served { model, response })
    }

    /// Request `block` from `model`, retrying once with the blended default
    async fn request_with_fallback(
        &self,
        block: Block,
        model: Option<&str>,
    ) -> Result<Served, SourceFailure> {
        let Some(model) = model else {
            return self.request(block, None).await;
        };

        match self.request(block, Some(model)).await {
            Ok(served) => Ok(served),
            Err(failure) => {
                warn!(
                    block = block.name(),
                    "Model {model} unavailable ({}), falling back to {BLENDED_MODEL}",
                    failure.message
                );
                self.request(block, None).await
            }
        }
    }
}

#[async_trait]
impl SourceClient for OpenMeteoClient {
    type Raw = ForecastParts;

    fn kind(&self) -> SourceKind {
        SourceKind::Forecast
    }

    #[instrument(skip(self, _ctx), fields(hourly_model = ?self.hourly_model, daily_model = ?self.daily_model))]
    async fn fetch(&self, _ctx: &RunContext) -> Result<ForecastParts, SourceFailure> {
        let (current, hourly, daily) = futures::try_join!(
            self.request(Block::Current, None),
            self.request_with_fallback(Block::Hourly, self.hourly_model.as_deref()),
            self.request_with_fallback(Block::Daily, self.daily_model.as_deref()),
        )?;

        info!(
            hourly = %hourly.model,
            daily = %daily.model,
            "Forecast served"
        );

        Ok(ForecastParts {
            current,
            hourly,
            daily,
        })
    }

    fn normalize(&self, raw: ForecastParts, ctx: &RunContext) -> Result<Fragment, SourceFailure> {
        if raw.current.response.current.is_none()
            && raw.hourly.response.hourly.is_none()
            && raw.daily.response.daily.is_none()
        {
            return Err(SourceFailure::malformed(
                SourceKind::Forecast,
                "responses contain no current, hourly or daily block",
            ));
        }
        Ok(Fragment::Forecast(ForecastFragment::from_parts(
            raw,
            ctx,
            &self.wind_risk,
        )))
    }
}

impl ForecastFragment {
    /// Build a fragment from the decoded Open-Meteo responses
    #[must_use]
    pub fn from_parts(parts: ForecastParts, ctx: &RunContext, wind: &WindRiskConfig) -> Self {
        let models = ServedModels {
            current: parts.current.response.current.is_some().then_some(parts.current.model),
            hourly: parts.hourly.response.hourly.is_some().then_some(parts.hourly.model),
            daily: parts.daily.response.daily.is_some().then_some(parts.daily.model),
        };

        let current = parts
            .current
            .response
            .current
            .as_ref()
            .map(CurrentData::to_conditions)
            .unwrap_or_default();

        let hourly = parts
            .hourly
            .response
            .hourly
            .as_ref()
            .map(|hourly| hourly.to_points(ctx))
            .unwrap_or_default();

        let (daily, sunrise, sunset) = match &parts.daily.response.daily {
            Some(daily) => {
                let today = ctx.now.with_timezone(&ctx.timezone).date_naive();
                let (sunrise, sunset) = daily.sun_times(today, ctx.timezone);
                (daily.to_forecasts(ctx.timezone), sunrise, sunset)
            }
            None => (Vec::new(), None, None),
        };

        Self {
            derived: Derived::from_forecast(&hourly, &current),
            wind_risk: wind_risk::assess(&hourly, &current, wind.window_hours, &wind.exposure),
            current,
            daily,
            hourly,
            sunrise,
            sunset,
            models,
        }
    }
}

fn instant(timestamp: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
}

/// Local calendar date of a daily stamp. Daily stamps mark local midnight;
/// half a day of slack absorbs an offset taken from the other side of a DST
/// change.
fn local_date(timestamp: i64, tz: Tz) -> Option<NaiveDate> {
    let midnight = instant(timestamp)?;
    Some((midnight + Duration::hours(12)).with_timezone(&tz).date_naive())
}

fn rounded(value: Option<f64>, places: i32) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| round_to(v, places))
}

fn value_at<T: Copy>(series: &[Option<T>], index: usize) -> Option<T> {
    series.get(index).copied().flatten()
}

/// Forecast response from the `OpenMeteo` API; holds whichever blocks were
/// requested
#[derive(Debug, Default, Deserialize)]
pub struct ForecastResponse {
    pub current: Option<CurrentData>,
    pub hourly: Option<HourlyData>,
    pub daily: Option<DailyData>,
    /// Set on error bodies, together with `reason`
    #[serde(default)]
    pub error: bool,
    pub reason: Option<String>,
}

/// Current conditions block
#[derive(Debug, Default, Deserialize)]
pub struct CurrentData {
    pub time: Option<i64>,
    pub temperature_2m: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub apparent_temperature: Option<f64>,
    pub precipitation: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub pressure_msl: Option<f64>,
    pub wind_speed_10m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub wind_gusts_10m: Option<f64>,
    pub weather_code: Option<u8>,
}

impl CurrentData {
    fn to_conditions(&self) -> CurrentConditions {
        let wind_direction = rounded(self.wind_direction_10m, 0);
        CurrentConditions {
            temperature: rounded(self.temperature_2m, 1),
            feels_like: rounded(self.apparent_temperature, 1),
            humidity: rounded(self.relative_humidity_2m, 0),
            pressure: rounded(self.pressure_msl, 1),
            cloud_cover: rounded(self.cloud_cover, 0),
            precipitation: rounded(self.precipitation, 2),
            wind_speed: rounded(self.wind_speed_10m, 1),
            wind_gust: rounded(self.wind_gusts_10m, 1),
            wind_direction,
            wind_cardinal: wind_direction.map(|d| wind_direction_to_cardinal(d).to_string()),
            weather_code: self.weather_code,
            condition: self
                .weather_code
                .map(|code| weather_code_to_description(code).to_string()),
            observation_source: Some(ObservationSource::Model),
            observed_at: self.time.and_then(instant),
            ..Default::default()
        }
        .with_wet_bulb()
    }
}

/// Hourly weather data from `OpenMeteo`
#[derive(Debug, Default, Deserialize)]
pub struct HourlyData {
    pub time: Vec<i64>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub dew_point_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability: Vec<Option<f64>>,
    #[serde(default)]
    pub weather_code: Vec<Option<u8>>,
    #[serde(default)]
    pub pressure_msl: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m: Vec<Option<f64>>,
    #[serde(default, rename = "temperature_850hPa")]
    pub temperature_850hpa: Vec<Option<f64>>,
    #[serde(default, rename = "geopotential_height_850hPa")]
    pub geopotential_height_850hpa: Vec<Option<f64>>,
}

impl HourlyData {
    /// Points from the first hour at or after the run instant, at most 48
    fn to_points(&self, ctx: &RunContext) -> Vec<HourlyPoint> {
        self.time
            .iter()
            .enumerate()
            .filter_map(|(i, &time)| {
                let temperature = rounded(value_at(&self.temperature_2m, i), 1);
                let humidity = rounded(value_at(&self.relative_humidity_2m, i), 0);
                let wet_bulb = wet_bulb(temperature, humidity);
                Some(HourlyPoint {
                    time: instant(time)?,
                    temperature,
                    feels_like: rounded(value_at(&self.apparent_temperature, i), 1),
                    dew_point: rounded(value_at(&self.dew_point_2m, i), 1),
                    wet_bulb,
                    precip_type: precip_type(wet_bulb),
                    humidity,
                    pressure: rounded(value_at(&self.pressure_msl, i), 1),
                    cloud_cover: rounded(value_at(&self.cloud_cover, i), 0),
                    weather_code: value_at(&self.weather_code, i),
                    precipitation: rounded(value_at(&self.precipitation, i), 2),
                    precipitation_probability: rounded(
                        value_at(&self.precipitation_probability, i),
                        0,
                    ),
                    wind_speed: rounded(value_at(&self.wind_speed_10m, i), 1),
                    wind_gust: rounded(value_at(&self.wind_gusts_10m, i), 1),
                    wind_direction: rounded(value_at(&self.wind_direction_10m, i), 0),
                    temperature_850hpa: rounded(value_at(&self.temperature_850hpa, i), 1),
                    height_850hpa: rounded(value_at(&self.geopotential_height_850hpa, i), 0),
                })
            })
            .filter(|point| point.time >= ctx.now)
            .take(MAX_HOURLY_POINTS)
            .collect()
    }
}

/// Daily weather data from `OpenMeteo`
#[derive(Debug, Default, Deserialize)]
pub struct DailyData {
    pub time: Vec<i64>,
    #[serde(default)]
    pub weather_code: Vec<Option<u8>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature_max: Vec<Option<f64>>,
    #[serde(default)]
    pub apparent_temperature_min: Vec<Option<f64>>,
    #[serde(default)]
    pub uv_index_max: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_gusts_10m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub sunrise: Vec<Option<i64>>,
    #[serde(default)]
    pub sunset: Vec<Option<i64>>,
}

impl DailyData {
    fn to_forecasts(&self, tz: Tz) -> Vec<DailyForecast> {
        self.time
            .iter()
            .enumerate()
            .filter_map(|(i, &date)| {
                let weather_code = value_at(&self.weather_code, i);
                Some(DailyForecast {
                    date: local_date(date, tz)?,
                    high: rounded(value_at(&self.temperature_2m_max, i), 1),
                    low: rounded(value_at(&self.temperature_2m_min, i), 1),
                    feels_like_max: rounded(value_at(&self.apparent_temperature_max, i), 1),
                    feels_like_min: rounded(value_at(&self.apparent_temperature_min, i), 1),
                    weather_code,
                    condition: weather_code
                        .map(|code| weather_code_to_description(code).to_string()),
                    precipitation_probability: rounded(
                        value_at(&self.precipitation_probability_max, i),
                        0,
                    ),
                    precipitation_sum: rounded(value_at(&self.precipitation_sum, i), 2),
                    wind_speed_max: rounded(value_at(&self.wind_speed_10m_max, i), 1),
                    wind_gust_max: rounded(value_at(&self.wind_gusts_10m_max, i), 1),
                    uv_index_max: rounded(value_at(&self.uv_index_max, i), 1),
                })
            })
            .take(MAX_DAILY_ENTRIES)
            .collect()
    }

    /// Sunrise and sunset for `today`, or for the first day when today is absent
    fn sun_times(&self, today: NaiveDate, tz: Tz) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let index = self
            .time
            .iter()
            .position(|&date| local_date(date, tz) == Some(today))
            .unwrap_or(0);

        let at = |series: &[Option<i64>]| value_at(series, index).and_then(instant);
        (at(&self.sunrise), at(&self.sunset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn ctx() -> RunContext {
        // 2024-01-15 12:30 in New York
        RunContext::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 17, 30, 0).unwrap(),
            New_York,
        )
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp()
    }

    fn served(model: &str, body: serde_json::Value) -> Served {
        Served {
            model: model.to_string(),
            response: serde_json::from_value(body).unwrap(),
        }
    }

    fn sample_parts() -> ForecastParts {
        ForecastParts {
            current: served(
                BLENDED_MODEL,
                serde_json::json!({
                    "latitude": 42.5,
                    "longitude": -70.875,
                    "utc_offset_seconds": -18000,
                    "timezone": "America/New_York",
                    "current": {
                        "time": utc(2024, 1, 15, 17, 30),
                        "temperature_2m": 34.26,
                        "relative_humidity_2m": 71,
                        "apparent_temperature": 27.9,
                        "precipitation": 0.0,
                        "weather_code": 3,
                        "cloud_cover": 100,
                        "pressure_msl": 1014.62,
                        "wind_speed_10m": 11.4,
                        "wind_direction_10m": 312,
                        "wind_gusts_10m": 24.1
                    }
                }),
            ),
            hourly: served(
                "ncep_hrrr_conus",
                serde_json::json!({
                    "utc_offset_seconds": -18000,
                    "hourly": {
                        "time": [
                            utc(2024, 1, 15, 17, 0),
                            utc(2024, 1, 15, 18, 0),
                            i64::MAX,
                            utc(2024, 1, 15, 19, 0),
                            utc(2024, 1, 15, 20, 0),
                            utc(2024, 1, 15, 21, 0)
                        ],
                        "temperature_2m": [33.0, 35.04, 36.0, null, 36.0, 37.0],
                        "relative_humidity_2m": [70, 72, 75, 80, 82, 85],
                        "dew_point_2m": [25.0, 26.0, 27.0, 28.0, 29.0, 30.0],
                        "pressure_msl": [1015.0, 1014.6, 1013.9, 1013.5, 1012.8, 1011.0],
                        "precipitation": [0.0, 0.013, 0.0, 0.0, 0.0, 0.0],
                        "precipitation_probability": [5, 10, 10, 15, 20, 20],
                        "wind_speed_10m": [10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
                        "wind_gusts_10m": [20.0, 21.0, 22.0, 23.0, 24.0, 26.0],
                        "wind_direction_10m": [300, 305, 310, 315, 320, 330],
                        "temperature_850hPa": [24.3, 24.0, 23.5, 23.0, 22.8, 22.5]
                    }
                }),
            ),
            daily: served(
                "ecmwf_ifs025",
                serde_json::json!({
                    "utc_offset_seconds": -18000,
                    "daily": {
                        "time": [utc(2024, 1, 15, 5, 0), utc(2024, 1, 16, 5, 0)],
                        "weather_code": [3, 71],
                        "temperature_2m_max": [36.1, 30.2],
                        "temperature_2m_min": [25.0, null],
                        "apparent_temperature_max": [30.0, 24.4],
                        "apparent_temperature_min": [18.2, 15.0],
                        "sunrise": [utc(2024, 1, 15, 12, 10), utc(2024, 1, 16, 12, 10)],
                        "sunset": [utc(2024, 1, 15, 21, 34), utc(2024, 1, 16, 21, 35)],
                        "uv_index_max": [1.46, 1.2],
                        "precipitation_sum": [0.0, 0.42],
                        "precipitation_probability_max": [10, 80],
                        "wind_speed_10m_max": [14.0, 18.5],
                        "wind_gusts_10m_max": [28.0, 35.5]
                    }
                }),
            ),
        }
    }

    fn fragment() -> ForecastFragment {
        ForecastFragment::from_parts(sample_parts(), &ctx(), &WindRiskConfig::default())
    }

    #[test]
    fn test_current_conditions_normalized() {
        let current = fragment().current;
        assert_eq!(current.temperature, Some(34.3));
        assert_eq!(current.pressure, Some(1014.6));
        assert_eq!(current.cloud_cover, Some(100.0));
        assert_eq!(current.wind_direction, Some(312.0));
        assert_eq!(current.wind_cardinal.as_deref(), Some("NW"));
        assert_eq!(current.condition.as_deref(), Some("Overcast"));
        assert_eq!(current.observation_source, Some(ObservationSource::Model));
        assert_eq!(
            current.observed_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 17, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_current_wet_bulb_and_precip_type() {
        let current = fragment().current;
        assert_eq!(current.wet_bulb, Some(30.0));
        assert_eq!(current.precip_type, Some(crate::derived::PrecipType::SnowLikely));
    }

    #[test]
    fn test_hourly_starts_at_run_instant_and_skips_bad_rows() {
        let fragment = fragment();
        let times: Vec<_> = fragment.hourly.iter().map(|p| p.time).collect();
        assert_eq!(
            times,
            vec![
                Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 15, 19, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 15, 21, 0, 0).unwrap(),
            ]
        );
        let first = &fragment.hourly[0];
        assert_eq!(first.temperature, Some(35.0));
        assert_eq!(first.precipitation, Some(0.01));
        assert_eq!(first.temperature_850hpa, Some(24.0));
        assert_eq!(first.wet_bulb, Some(30.8));
        assert_eq!(first.precip_type, Some(crate::derived::PrecipType::SnowLikely));
        assert_eq!(fragment.hourly[1].temperature, None);
        assert_eq!(fragment.hourly[1].wet_bulb, None);
    }

    #[test]
    fn test_hourly_capped_at_48() {
        let start = utc(2024, 1, 16, 0, 0);
        let hourly = HourlyData {
            time: (0..72).map(|h| start + h * 3600).collect(),
            ..Default::default()
        };
        let points = hourly.to_points(&ctx());
        assert_eq!(points.len(), MAX_HOURLY_POINTS);
        assert!(points.iter().all(|p| p.temperature.is_none()));
    }

    #[test]
    fn test_hourly_across_fall_back_has_no_duplicate_hour() {
        // Local 00:00, 01:00 EDT, 01:00 EST, 02:00 on 2024-11-03
        let hourly = HourlyData {
            time: (0..4).map(|h| utc(2024, 11, 3, 4, 0) + h * 3600).collect(),
            ..Default::default()
        };
        let ctx = RunContext::new(Utc.with_ymd_and_hms(2024, 11, 3, 4, 0, 0).unwrap(), New_York);
        let points = hourly.to_points(&ctx);

        let times: Vec<_> = points.iter().map(|p| p.time).collect();
        assert_eq!(
            times,
            vec![
                Utc.with_ymd_and_hms(2024, 11, 3, 4, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 11, 3, 5, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 11, 3, 6, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 11, 3, 7, 0, 0).unwrap(),
            ]
        );
        assert!(times.windows(2).all(|w| w[0] < w[1]));

        let local: Vec<String> = times
            .iter()
            .map(|t| t.with_timezone(&New_York).format("%H:%M").to_string())
            .collect();
        assert_eq!(local, ["00:00", "01:00", "01:00", "02:00"]);
    }

    #[test]
    fn test_daily_dates_across_dst() {
        // Midnight stamps for 2024-11-03 (EDT) and 2024-11-04 (EST), plus the
        // 04:00Z stamp an unchanged offset would give for 2024-11-04
        assert_eq!(
            local_date(utc(2024, 11, 3, 4, 0), New_York),
            NaiveDate::from_ymd_opt(2024, 11, 3)
        );
        assert_eq!(
            local_date(utc(2024, 11, 4, 5, 0), New_York),
            NaiveDate::from_ymd_opt(2024, 11, 4)
        );
        assert_eq!(
            local_date(utc(2024, 11, 4, 4, 0), New_York),
            NaiveDate::from_ymd_opt(2024, 11, 4)
        );
    }

    #[test]
    fn test_daily_and_sun_times() {
        let fragment = fragment();
        assert_eq!(fragment.daily.len(), 2);
        assert_eq!(fragment.daily[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(fragment.daily[0].uv_index_max, Some(1.5));
        assert_eq!(fragment.daily[1].condition.as_deref(), Some("Light Snow"));
        assert_eq!(fragment.daily[1].low, None);
        assert_eq!(fragment.daily[1].feels_like_min, Some(15.0));
        assert_eq!(fragment.daily[1].wind_speed_max, Some(18.5));
        assert_eq!(fragment.daily[1].precipitation_probability, Some(80.0));
        assert_eq!(
            fragment.sunrise,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 10, 0).unwrap())
        );
        assert_eq!(
            fragment.sunset,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 21, 34, 0).unwrap())
        );
    }

    #[test]
    fn test_derived_indicators_from_series() {
        let fragment = fragment();

        let trend = fragment.derived.pressure_trend.unwrap();
        assert_eq!(trend.change_hpa_3h, -3.6);
        assert_eq!(trend.tendency, crate::derived::PressureTendency::FallingFast);
        assert_eq!(
            fragment.derived.pressure_alarm,
            Some(crate::derived::PressureAlarm::Falling)
        );

        let column = fragment.derived.column_precip.unwrap();
        assert_eq!(column.temperature_850hpa, 24.0);
        assert_eq!(column.precip_type, crate::derived::PrecipType::Snow);
        assert_eq!(fragment.derived.trough_signal, None);

        let gust = fragment.wind_risk.unwrap().gust.unwrap();
        assert_eq!(gust.peak_mph, 26.0);
        assert_eq!(gust.worry_score, 24.07);
        assert_eq!(
            gust.peak_time,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 21, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_models_recorded() {
        let fragment = fragment();
        assert_eq!(
            fragment.models.label().as_deref(),
            Some("current=best_match,hourly=ncep_hrrr_conus,daily=ecmwf_ifs025")
        );
        assert_eq!(
            Fragment::Forecast(fragment).model().as_deref(),
            Some("current=best_match,hourly=ncep_hrrr_conus,daily=ecmwf_ifs025")
        );
        assert_eq!(ServedModels::default().label(), None);
    }

    #[test]
    fn test_query_requests_unix_times_and_model() {
        let client = OpenMeteoClient::new(Client::new(), &CollectorConfig::default());
        let query = client.query(Block::Hourly, Some("ncep_hrrr_conus"));
        let lookup = |key: &str| query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());
        assert_eq!(lookup("timeformat"), Some("unixtime"));
        assert_eq!(lookup("models"), Some("ncep_hrrr_conus"));
        assert_eq!(lookup("forecast_days"), Some("3"));
        assert!(lookup("hourly").unwrap().contains("temperature_850hPa"));
        assert_eq!(lookup("daily"), None);

        let query = client.query(Block::Current, None);
        assert!(query.iter().all(|(k, _)| *k != "models" && *k != "forecast_days"));
    }

    #[test]
    fn test_blank_model_means_blended_default() {
        let mut config = CollectorConfig::default();
        config.sources.hourly_model = Some("  ".to_string());
        config.sources.daily_model = None;
        let client = OpenMeteoClient::new(Client::new(), &config);
        assert_eq!(client.hourly_model, None);
        assert_eq!(client.daily_model, None);
    }

    #[test]
    fn test_empty_responses_are_malformed() {
        let client = OpenMeteoClient::new(Client::new(), &CollectorConfig::default());
        let result = client.normalize(ForecastParts::default(), &ctx());
        assert!(matches!(
            result,
            Err(SourceFailure { kind: crate::error::FailureKind::SourceMalformed, .. })
        ));
    }
}
