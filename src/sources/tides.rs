//! NOAA CO-OPS tide predictions
//!
//! Two requests per run: the high/low events and a six-minute height curve
//! for charting. Both are requested in GMT so times need no zone handling.
//! The API answers errors with HTTP 200 and an `error` object.

use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::http::get_json;
use super::{Fragment, RunContext, SourceClient, SourceKind};
use crate::config::CollectorConfig;
use crate::error::SourceFailure;
use crate::models::snapshot::{MAX_TIDE_EVENTS, TIDE_CURVE_HOURS};
use crate::models::units::round_to;
use crate::models::{TideEvent, TideKind, TidePoint};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const DATE_FORMAT: &str = "%Y%m%d";
/// Days past today to request; covers the 48-hour curve from any start
const LOOKAHEAD_DAYS: u64 = 2;

const HILO_INTERVAL: &str = "hilo";
/// Minutes between curve points
const CURVE_INTERVAL: &str = "6";

/// Upcoming tide events and the height curve, both in chronological order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TideFragment {
    pub events: Vec<TideEvent>,
    pub curve: Vec<TidePoint>,
}

/// Decoded high/low and curve responses
#[derive(Debug)]
pub struct TideResponses {
    pub events: TidesResponse,
    pub curve: TidesResponse,
}

/// CO-OPS datagetter client
#[derive(Debug, Clone)]
pub struct NoaaTidesClient {
    client: Client,
    base_url: String,
    station_id: String,
}

impl NoaaTidesClient {
    #[must_use]
    pub fn new(client: Client, config: &CollectorConfig) -> Self {
        Self {
            client,
            base_url: config.sources.tides_url.trim_end_matches('/').to_string(),
            station_id: config.stations.tide_station.clone(),
        }
    }

    fn query(&self, ctx: &RunContext, interval: &str) -> Vec<(&'static str, String)> {
        let begin = ctx.now.date_naive();
        let end = begin.checked_add_days(Days::new(LOOKAHEAD_DAYS)).unwrap_or(begin);

        vec![
            ("station", self.station_id.clone()),
            ("product", "predictions".to_string()),
            ("interval", interval.to_string()),
            ("datum", "MLLW".to_string()),
            ("time_zone", "gmt".to_string()),
            ("units", "english".to_string()),
            ("format", "json".to_string()),
            ("begin_date", begin.format(DATE_FORMAT).to_string()),
            ("end_date", end.format(DATE_FORMAT).to_string()),
        ]
    }
}

#[async_trait]
impl SourceClient for NoaaTidesClient {
    type Raw = TideResponses;

    fn kind(&self) -> SourceKind {
        SourceKind::Tides
    }

    #[instrument(skip(self, ctx), fields(station = %self.station_id))]
    async fn fetch(&self, ctx: &RunContext) -> Result<TideResponses, SourceFailure> {
        let (events, curve) = futures::try_join!(
            self.request(ctx, HILO_INTERVAL),
            self.request(ctx, CURVE_INTERVAL),
        )?;
        Ok(TideResponses { events, curve })
    }

    fn normalize(&self, raw: TideResponses, ctx: &RunContext) -> Result<Fragment, SourceFailure> {
        let predictions = raw.events.predictions.ok_or_else(|| {
            SourceFailure::malformed(SourceKind::Tides, "response has no predictions")
        })?;

        let mut events: Vec<TideEvent> = predictions
            .iter()
            .filter_map(Prediction::to_event)
            .filter(|event| event.time >= ctx.now)
            .collect();
        events.sort_by_key(|event| event.time);
        events.truncate(MAX_TIDE_EVENTS);

        let curve = curve_points(raw.curve.predictions.as_deref().unwrap_or_default(), ctx.now);

        debug!(
            received = predictions.len(),
            kept = events.len(),
            curve_points = curve.len(),
            "tide predictions normalized"
        );

        Ok(Fragment::Tides(TideFragment { events, curve }))
    }
}

impl NoaaTidesClient {
    async fn request(&self, ctx: &RunContext, interval: &str) -> Result<TidesResponse, SourceFailure> {
        let request = self
            .client
            .get(format!("{}/datagetter", self.base_url))
            .query(&self.query(ctx, interval));

        let response: TidesResponse = get_json(request, SourceKind::Tides).await?;
        if let Some(error) = &response.error {
            return Err(SourceFailure::unavailable(
                SourceKind::Tides,
                format!("NOAA error ({interval}): {}", error.message),
            ));
        }
        Ok(response)
    }
}

/// Curve points from `now` to 48 hours later
fn curve_points(predictions: &[Prediction], now: DateTime<Utc>) -> Vec<TidePoint> {
    let end = now + Duration::hours(TIDE_CURVE_HOURS);
    let mut curve: Vec<TidePoint> = predictions
        .iter()
        .filter_map(|prediction| {
            Some(TidePoint {
                time: prediction.time()?,
                height: round_to(prediction.height()?, 2),
            })
        })
        .filter(|point| point.time >= now && point.time < end)
        .collect();
    curve.sort_by_key(|point| point.time);
    curve
}

#[derive(Debug, Deserialize)]
pub struct TidesResponse {
    pub predictions: Option<Vec<Prediction>>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}

/// One prediction row; all values arrive as strings. Curve rows carry no
/// type, and any row may lack a height.
#[derive(Debug, Deserialize)]
pub struct Prediction {
    pub t: String,
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Prediction {
    fn time(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(self.t.trim(), TIME_FORMAT)
            .ok()
            .map(|time| time.and_utc())
    }

    fn height(&self) -> Option<f64> {
        self.v
            .as_deref()?
            .trim()
            .parse()
            .ok()
            .filter(|h: &f64| h.is_finite())
    }

    /// `None` for rows with an unreadable time, height or type
    fn to_event(&self) -> Option<TideEvent> {
        let kind = match self.kind.as_deref()?.trim().chars().next()? {
            'H' | 'h' => TideKind::High,
            'L' | 'l' => TideKind::Low,
            _ => return None,
        };

        Some(TideEvent {
            time: self.time()?,
            kind,
            height: round_to(self.height()?, 3),
        })
    }
}
