//! One collector run: fetch, normalize, merge, serialize, publish
//!
//! The four sources are fetched concurrently and each degrades on its own.
//! Only serialization and write failures abort a run, in which case the
//! previously published document stays in place.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task;
use tracing::{info, instrument, warn};

use crate::config::CollectorConfig;
use crate::error::{CollectorError, SourceFailure};
use crate::merge::{FragmentSet, failure_kinds, merge};
use crate::models::{Location, WeatherSnapshot};
use crate::publish::publish;
use crate::sources::http::build_client;
use crate::sources::{
    NoaaTidesClient, NwsAlertsClient, NwsStationClient, OpenMeteoClient, RunContext, SourceClient,
    SourceKind,
};

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Path the snapshot was published to
    pub output: PathBuf,
    pub generated_at: DateTime<Utc>,
    /// Sources that degraded to placeholders
    pub failures: Vec<SourceFailure>,
}

impl RunReport {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Every source failed; the published snapshot holds placeholders only
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.failures.len() == SourceKind::ALL.len()
    }
}

/// The configured collector with its four source clients
#[derive(Debug)]
pub struct Collector {
    output: PathBuf,
    location: Location,
    timezone: Tz,
    forecast: OpenMeteoClient,
    station: NwsStationClient,
    tides: NoaaTidesClient,
    alerts: NwsAlertsClient,
}

impl Collector {
    /// Build the collector from a validated configuration
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let timezone = config.timezone()?;
        let client = build_client(config).context("Failed to build source clients")?;

        Ok(Self {
            output: config.output.path.clone(),
            location: Location::from(&config.location),
            timezone,
            forecast: OpenMeteoClient::new(client.clone(), config),
            station: NwsStationClient::new(client.clone(), config),
            tides: NoaaTidesClient::new(client.clone(), config),
            alerts: NwsAlertsClient::new(client, config),
        })
    }

    /// Fetch and normalize all four sources concurrently
    #[instrument(skip(self, ctx), fields(now = %ctx.now))]
    pub async fn collect(&self, ctx: &RunContext) -> FragmentSet {
        let (forecast, station, tides, alerts) = futures::join!(
            self.forecast.collect(ctx),
            self.station.collect(ctx),
            self.tides.collect(ctx),
            self.alerts.collect(ctx),
        );

        [forecast, station, tides, alerts].into_iter().collect()
    }

    /// Merge collected fragments, stamping the snapshot with the merge time
    #[must_use]
    pub fn snapshot(&self, fragments: &FragmentSet) -> WeatherSnapshot {
        merge(fragments, &self.location, self.timezone, Utc::now())
    }

    /// Run the full pipeline once and publish the result.
    ///
    /// A run where every source failed still publishes its all-placeholder
    /// snapshot; the per-source `sources` entries record why.
    #[instrument(skip(self), fields(output = %self.output.display()))]
    pub async fn run(&self) -> std::result::Result<RunReport, CollectorError> {
        let ctx = RunContext::new(Utc::now(), self.timezone);
        let fragments = self.collect(&ctx).await;

        let failed = failure_kinds(&fragments);
        if !failed.is_empty() {
            warn!(?failed, "{} of {} sources degraded", failed.len(), SourceKind::ALL.len());
        }

        let snapshot = self.snapshot(&fragments);
        let generated_at = snapshot.generated_at;
        let target = self.output.clone();

        let output = task::spawn_blocking(move || publish(&snapshot, &target))
            .await
            .map_err(|e| CollectorError::write(&self.output, std::io::Error::other(e)))??;

        info!(%generated_at, "run complete");

        Ok(RunReport {
            output,
            generated_at,
            failures: fragments.failures(),
        })
    }
}
