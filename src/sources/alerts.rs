//! Active NWS alerts for the location

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use super::http::get_json;
use super::{Fragment, RunContext, SourceClient, SourceKind};
use crate::config::CollectorConfig;
use crate::error::SourceFailure;
use crate::models::{AlertRecord, Location};

/// Severity published when the feed leaves it out
const UNKNOWN_SEVERITY: &str = "Unknown";

/// Active alerts in feed order. An empty list is a successful answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFragment {
    pub alerts: Vec<AlertRecord>,
}

/// api.weather.gov active-alerts client
#[derive(Debug, Clone)]
pub struct NwsAlertsClient {
    client: Client,
    base_url: String,
    location: Location,
}

impl NwsAlertsClient {
    #[must_use]
    pub fn new(client: Client, config: &CollectorConfig) -> Self {
        Self {
            client,
            base_url: config.sources.alerts_url.trim_end_matches('/').to_string(),
            location: Location::from(&config.location),
        }
    }
}

#[async_trait]
impl SourceClient for NwsAlertsClient {
    type Raw = AlertsResponse;

    fn kind(&self) -> SourceKind {
        SourceKind::Alerts
    }

    #[instrument(skip(self, _ctx), fields(point = %self.location.point_parameter()))]
    async fn fetch(&self, _ctx: &RunContext) -> Result<AlertsResponse, SourceFailure> {
        let request = self
            .client
            .get(format!("{}/alerts/active", self.base_url))
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .query(&[
                ("point", self.location.point_parameter()),
                ("status", "actual".to_string()),
            ]);

        get_json(request, SourceKind::Alerts).await
    }

    fn normalize(&self, raw: AlertsResponse, _ctx: &RunContext) -> Result<Fragment, SourceFailure> {
        let alerts = raw
            .features
            .into_iter()
            .map(AlertFeature::into_record)
            .collect();

        Ok(Fragment::Alerts(AlertFragment { alerts }))
    }
}

/// GeoJSON feature collection of alerts
#[derive(Debug, Deserialize)]
pub struct AlertsResponse {
    pub features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
pub struct AlertFeature {
    pub id: Option<String>,
    #[serde(default)]
    pub properties: AlertProperties,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertProperties {
    pub id: Option<String>,
    pub event: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub onset: Option<String>,
    pub effective: Option<String>,
    pub expires: Option<String>,
    pub ends: Option<String>,
}

fn parse_instant(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl AlertFeature {
    fn into_record(self) -> AlertRecord {
        let AlertProperties {
            id,
            event,
            headline,
            description,
            severity,
            onset,
            effective,
            expires,
            ends,
        } = self.properties;

        AlertRecord {
            id: id.or(self.id),
            event,
            headline,
            description: description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            severity: severity
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_SEVERITY.to_string()),
            onset: parse_instant(onset.as_deref()).or_else(|| parse_instant(effective.as_deref())),
            expires: parse_instant(expires.as_deref()).or_else(|| parse_instant(ends.as_deref())),
        }
    }
}
