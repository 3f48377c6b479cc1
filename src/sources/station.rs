//! Observation-station source backed by api.weather.gov
//!
//! `GET /stations/{id}/observations/latest` works for airport ASOS stations
//! as well as the citizen (CWOP) personal stations the NWS ingests. Every
//! quantity arrives as `{unitCode, value}` and is converted by its unit code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use super::http::get_json;
use super::{Fragment, RunContext, SourceClient, SourceKind};
use crate::config::CollectorConfig;
use crate::error::SourceFailure;
use crate::models::units::{
    celsius_to_fahrenheit, kmh_to_mph, knots_to_mph, ms_to_mph, pa_to_hpa, round_to,
    wind_direction_to_cardinal,
};
use crate::models::{CurrentConditions, ObservationSource};

/// Normalized station observation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationFragment {
    pub station_id: String,
    pub conditions: CurrentConditions,
}

/// api.weather.gov latest-observation client
#[derive(Debug, Clone)]
pub struct NwsStationClient {
    client: Client,
    base_url: String,
    station_id: String,
}

impl NwsStationClient {
    #[must_use]
    pub fn new(client: Client, config: &CollectorConfig) -> Self {
        Self {
            client,
            base_url: config.sources.station_url.trim_end_matches('/').to_string(),
            station_id: config.stations.weather_station.clone(),
        }
    }
}

#[async_trait]
impl SourceClient for NwsStationClient {
    type Raw = ObservationResponse;

    fn kind(&self) -> SourceKind {
        SourceKind::Station
    }

    #[instrument(skip(self, _ctx), fields(station = %self.station_id))]
    async fn fetch(&self, _ctx: &RunContext) -> Result<ObservationResponse, SourceFailure> {
        let request = self
            .client
            .get(format!(
                "{}/stations/{}/observations/latest",
                self.base_url, self.station_id
            ))
            .header(reqwest::header::ACCEPT, "application/geo+json");

        get_json(request, SourceKind::Station).await
    }

    fn normalize(&self, raw: ObservationResponse, _ctx: &RunContext) -> Result<Fragment, SourceFailure> {
        let conditions = raw.properties.to_conditions();
        if conditions.is_empty() {
            return Err(SourceFailure::malformed(
                SourceKind::Station,
                format!("station {} reported no usable values", self.station_id),
            ));
        }

        Ok(Fragment::Station(StationFragment {
            station_id: self.station_id.clone(),
            conditions,
        }))
    }
}

/// Station observation (GeoJSON feature)
#[derive(Debug, Deserialize)]
pub struct ObservationResponse {
    pub properties: ObservationProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationProperties {
    pub timestamp: Option<String>,
    pub text_description: Option<String>,
    #[serde(default)]
    pub temperature: Option<Quantity>,
    #[serde(default)]
    pub dewpoint: Option<Quantity>,
    #[serde(default)]
    pub heat_index: Option<Quantity>,
    #[serde(default)]
    pub wind_chill: Option<Quantity>,
    #[serde(default)]
    pub relative_humidity: Option<Quantity>,
    #[serde(default)]
    pub wind_direction: Option<Quantity>,
    #[serde(default)]
    pub wind_speed: Option<Quantity>,
    #[serde(default)]
    pub wind_gust: Option<Quantity>,
    #[serde(default)]
    pub sea_level_pressure: Option<Quantity>,
    #[serde(default)]
    pub barometric_pressure: Option<Quantity>,
}

/// A measured value with its WMO unit code, e.g. `wmoUnit:degC`
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    pub unit_code: Option<String>,
    pub value: Option<f64>,
}

impl Quantity {
    /// Unit code without its namespace prefix
    fn unit(&self) -> Option<&str> {
        let code = self.unit_code.as_deref()?;
        Some(code.rsplit_once(':').map_or(code, |(_, unit)| unit))
    }

    fn fahrenheit(&self) -> Option<f64> {
        let value = self.value?;
        match self.unit()? {
            "degC" => Some(celsius_to_fahrenheit(value)),
            "degF" => Some(value),
            _ => None,
        }
    }

    fn mph(&self) -> Option<f64> {
        let value = self.value?;
        match self.unit()? {
            "km_h-1" => Some(kmh_to_mph(value)),
            "m_s-1" => Some(ms_to_mph(value)),
            "kt" | "knot" => Some(knots_to_mph(value)),
            "mi_h-1" => Some(value),
            _ => None,
        }
    }

    fn hpa(&self) -> Option<f64> {
        let value = self.value?;
        match self.unit()? {
            "Pa" => Some(pa_to_hpa(value)),
            "hPa" => Some(value),
            _ => None,
        }
    }

    fn percent(&self) -> Option<f64> {
        let value = self.value?;
        (self.unit()? == "percent").then_some(value)
    }

    fn degrees(&self) -> Option<f64> {
        let value = self.value?;
        (self.unit()? == "degree_(angle)").then_some(value)
    }
}

fn round1(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| round_to(v, 1))
}

impl ObservationProperties {
    fn to_conditions(&self) -> CurrentConditions {
        let temperature = self.temperature.as_ref().and_then(Quantity::fahrenheit);
        // NWS only reports heat index / wind chill when they apply
        let feels_like = self
            .heat_index
            .as_ref()
            .and_then(Quantity::fahrenheit)
            .or_else(|| self.wind_chill.as_ref().and_then(Quantity::fahrenheit))
            .or(temperature);
        let pressure = self
            .sea_level_pressure
            .as_ref()
            .and_then(Quantity::hpa)
            .or_else(|| self.barometric_pressure.as_ref().and_then(Quantity::hpa));
        let wind_direction = self
            .wind_direction
            .as_ref()
            .and_then(Quantity::degrees)
            .map(|d| round_to(d, 0));

        CurrentConditions {
            temperature: round1(temperature),
            feels_like: round1(feels_like),
            dew_point: round1(self.dewpoint.as_ref().and_then(Quantity::fahrenheit)),
            wet_bulb: None,
            precip_type: None,
            humidity: self
                .relative_humidity
                .as_ref()
                .and_then(Quantity::percent)
                .map(|h| round_to(h, 0)),
            pressure: round1(pressure),
            cloud_cover: None,
            precipitation: None,
            wind_speed: round1(self.wind_speed.as_ref().and_then(Quantity::mph)),
            wind_gust: round1(self.wind_gust.as_ref().and_then(Quantity::mph)),
            wind_direction,
            wind_cardinal: wind_direction.map(|d| wind_direction_to_cardinal(d).to_string()),
            weather_code: None,
            condition: self
                .text_description
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            observation_source: Some(ObservationSource::Station),
            observed_at: self
                .timestamp
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
        }
        .with_wet_bulb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_observation() -> ObservationResponse {
        serde_json::from_value(serde_json::json!({
            "id": "https://api.weather.gov/stations/KBVY/observations/2024-01-15T17:53:00+00:00",
            "type": "Feature",
            "properties": {
                "station": "https://api.weather.gov/stations/KBVY",
                "timestamp": "2024-01-15T12:53:00-05:00",
                "textDescription": "Cloudy",
                "temperature": {"unitCode": "wmoUnit:degC", "value": 1.1, "qualityControl": "V"},
                "dewpoint": {"unitCode": "wmoUnit:degC", "value": -3.9, "qualityControl": "V"},
                "windDirection": {"unitCode": "wmoUnit:degree_(angle)", "value": 310, "qualityControl": "V"},
                "windSpeed": {"unitCode": "wmoUnit:km_h-1", "value": 18.36, "qualityControl": "V"},
                "windGust": {"unitCode": "wmoUnit:km_h-1", "value": null, "qualityControl": "Z"},
                "barometricPressure": {"unitCode": "wmoUnit:Pa", "value": 101320, "qualityControl": "V"},
                "seaLevelPressure": {"unitCode": "wmoUnit:Pa", "value": 101460, "qualityControl": "V"},
                "relativeHumidity": {"unitCode": "wmoUnit:percent", "value": 69.64, "qualityControl": "V"},
                "windChill": {"unitCode": "wmoUnit:degC", "value": -3.6, "qualityControl": "V"},
                "heatIndex": {"unitCode": "wmoUnit:degC", "value": null, "qualityControl": "V"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_observation_converted_by_unit_code() {
        let conditions = sample_observation().properties.to_conditions();
        assert_eq!(conditions.temperature, Some(34.0));
        assert_eq!(conditions.feels_like, Some(25.5));
        assert_eq!(conditions.dew_point, Some(25.0));
        assert_eq!(conditions.wet_bulb, Some(29.6));
        assert_eq!(conditions.wind_speed, Some(11.4));
        assert_eq!(conditions.wind_gust, None);
        assert_eq!(conditions.wind_direction, Some(310.0));
        assert_eq!(conditions.wind_cardinal.as_deref(), Some("NW"));
        assert_eq!(conditions.pressure, Some(1014.6));
        assert_eq!(conditions.humidity, Some(70.0));
        assert_eq!(conditions.condition.as_deref(), Some("Cloudy"));
        assert_eq!(conditions.observation_source, Some(ObservationSource::Station));
        assert_eq!(
            conditions.observed_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 17, 53, 0).unwrap())
        );
    }

    #[test]
    fn test_unknown_unit_yields_null() {
        let quantity = Quantity {
            unit_code: Some("wmoUnit:K".to_string()),
            value: Some(274.0),
        };
        assert_eq!(quantity.fahrenheit(), None);

        let quantity = Quantity {
            unit_code: None,
            value: Some(5.0),
        };
        assert_eq!(quantity.mph(), None);
    }

    #[test]
    fn test_null_properties_tolerated() {
        let raw: ObservationResponse = serde_json::from_value(serde_json::json!({
            "properties": {
                "timestamp": "2024-01-15T17:53:00+00:00",
                "temperature": null,
                "windSpeed": {"unitCode": "wmoUnit:m_s-1", "value": 5.0}
            }
        }))
        .unwrap();
        let conditions = raw.properties.to_conditions();
        assert_eq!(conditions.temperature, None);
        assert_eq!(conditions.feels_like, None);
        assert_eq!(conditions.wind_speed, Some(11.2));
    }

    #[test]
    fn test_observation_without_values_is_malformed() {
        let client = NwsStationClient::new(Client::new(), &CollectorConfig::default());
        let raw = ObservationResponse {
            properties: ObservationProperties::default(),
        };
        let ctx = RunContext::new(Utc::now(), chrono_tz::UTC);
        assert!(client.normalize(raw, &ctx).is_err());
    }
}
