//! Covewatch - weather snapshot collector for a single coastal location
//!
//! Fetches a forecast model, a nearby observation station, tide predictions
//! and active alerts, normalizes them to one unit and time convention,
//! derives short-range indicators, merges them into a snapshot and publishes
//! it as a JSON document with an atomic file replace.

pub mod config;
pub mod derived;
pub mod error;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod sources;
pub mod telemetry;

// Re-export core types for public API
pub use config::CollectorConfig;
pub use error::{CollectorError, FailureKind, SourceFailure};
pub use merge::{FragmentSet, merge};
pub use models::{Location, WeatherSnapshot};
pub use pipeline::{Collector, RunReport};
pub use publish::{publish, to_canonical_json};
pub use sources::{Fragment, RunContext, SourceClient, SourceKind, SourceOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, CollectorError>;
