//! Logging setup for the collector binary
//!
//! Logs go to stderr so stdout stays free for the scheduler. `RUST_LOG`
//! overrides the configured level when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::Result;
use crate::error::CollectorError;

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one event per line
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(CollectorError::config(format!(
                "Unknown log format '{other}', expected 'pretty' or 'json'"
            ))),
        }
    }
}

/// Filter from `RUST_LOG`, falling back to the configured level
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let format = LogFormat::parse(&config.format)?;
    let filter = env_filter(&config.level);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };

    result.map_err(|e| CollectorError::config(format!("Failed to initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pretty", LogFormat::Pretty)]
    #[case("TEXT", LogFormat::Pretty)]
    #[case(" json ", LogFormat::Json)]
    fn test_parse_format(#[case] input: &str, #[case] expected: LogFormat) {
        assert_eq!(LogFormat::parse(input).unwrap(), expected);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(matches!(
            LogFormat::parse("xml"),
            Err(CollectorError::Config { .. })
        ));
    }
}
