use anyhow::{Context, Result};
use covewatch::{Collector, CollectorConfig, telemetry};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = CollectorConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.logging)?;

    info!(
        version = covewatch::VERSION,
        location = %config.location.name,
        "starting collector run"
    );

    let collector = Collector::new(&config)?;
    let report = match collector.run().await {
        Ok(report) => report,
        Err(e) => {
            error!("run aborted, previous snapshot kept: {e}");
            return Err(e.into());
        }
    };

    for failure in &report.failures {
        warn!(source = %failure.role, "{failure}");
    }
    if report.is_total_failure() {
        warn!("all sources failed; published a placeholder snapshot");
    }

    info!(
        path = %report.output.display(),
        generated_at = %report.generated_at,
        degraded = report.failures.len(),
        "snapshot published"
    );

    Ok(())
}
