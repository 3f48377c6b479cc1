//! Data models for the published snapshot
//!
//! - Location: the fixed reporting point
//! - Snapshot: the document written for the viewer
//! - Astronomy: locally computed sun and moon data
//! - Units: conversions into the published unit convention

pub mod astronomy;
pub mod location;
pub mod snapshot;
pub mod units;

// Re-export all public types for convenient access
pub use astronomy::{Astronomy, MoonPhase};
pub use location::Location;
pub use snapshot::{
    AlertRecord, Comparison, CurrentConditions, DailyForecast, HourlyPoint, Hyperlocal,
    ObservationSource, SourceState, SourceStatus, TideEvent, TideKind, TidePoint, WeatherSnapshot,
};
