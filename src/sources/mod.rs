//! Source clients
//!
//! Four independent upstream sources feed a snapshot:
//! - Forecast: Open-Meteo model data (current, hourly, daily)
//! - Station: latest api.weather.gov station observation
//! - Tides: NOAA CO-OPS high/low predictions and the height curve
//! - Alerts: active api.weather.gov alerts for the location
//!
//! Each client performs its own round trip, maps every failure to a
//! [`SourceFailure`] value and normalizes its payload into a [`Fragment`].
//! No client knows about any other.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SourceFailure;

pub mod alerts;
pub mod http;
pub mod open_meteo;
pub mod station;
pub mod tides;

pub use alerts::{AlertFragment, NwsAlertsClient};
pub use open_meteo::{ForecastFragment, OpenMeteoClient};
pub use station::{NwsStationClient, StationFragment};
pub use tides::{NoaaTidesClient, TideFragment};

/// Role a source plays in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Alerts,
    Forecast,
    Station,
    Tides,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Alerts,
        SourceKind::Forecast,
        SourceKind::Station,
        SourceKind::Tides,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Alerts => "alerts",
            SourceKind::Forecast => "forecast",
            SourceKind::Station => "station",
            SourceKind::Tides => "tides",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized output of one source, tagged by role
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Forecast(ForecastFragment),
    Station(StationFragment),
    Tides(TideFragment),
    Alerts(AlertFragment),
}

impl Fragment {
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        match self {
            Fragment::Forecast(_) => SourceKind::Forecast,
            Fragment::Station(_) => SourceKind::Station,
            Fragment::Tides(_) => SourceKind::Tides,
            Fragment::Alerts(_) => SourceKind::Alerts,
        }
    }

    /// Forecast models that served this fragment, if the source has models
    #[must_use]
    pub fn model(&self) -> Option<String> {
        match self {
            Fragment::Forecast(forecast) => forecast.models.label(),
            _ => None,
        }
    }
}

/// What one source produced during a run
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub source: SourceKind,
    /// When the source was queried
    pub fetched_at: DateTime<Utc>,
    pub result: Result<Fragment, SourceFailure>,
}

impl SourceOutcome {
    #[must_use]
    pub fn ok(fragment: Fragment, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source: fragment.kind(),
            fetched_at,
            result: Ok(fragment),
        }
    }

    #[must_use]
    pub fn failed(failure: SourceFailure, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source: failure.role,
            fetched_at,
            result: Err(failure),
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&SourceFailure> {
        self.result.as_ref().err()
    }
}

/// Per-run facts every client needs: the run instant and the location's zone
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub now: DateTime<Utc>,
    pub timezone: Tz,
}

impl RunContext {
    #[must_use]
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self { now, timezone }
    }
}

/// A single upstream source
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Decoded but not yet normalized payload
    type Raw: Send;

    fn kind(&self) -> SourceKind;

    /// Perform the network round trip(s)
    async fn fetch(&self, ctx: &RunContext) -> Result<Self::Raw, SourceFailure>;

    /// Map the raw payload into the snapshot's conventions. Pure.
    fn normalize(&self, raw: Self::Raw, ctx: &RunContext) -> Result<Fragment, SourceFailure>;

    /// Fetch and normalize, degrading any failure to a tagged outcome
    async fn collect(&self, ctx: &RunContext) -> SourceOutcome {
        let fetched_at = Utc::now();
        let result = match self.fetch(ctx).await {
            Ok(raw) => self.normalize(raw, ctx),
            Err(failure) => Err(failure),
        };

        match result {
            Ok(fragment) => {
                info!(source = %self.kind(), "source collected");
                SourceOutcome::ok(fragment, fetched_at)
            }
            Err(failure) => {
                warn!(source = %self.kind(), kind = ?failure.kind, "source degraded: {}", failure.message);
                SourceOutcome::failed(failure, fetched_at)
            }
        }
    }
}
