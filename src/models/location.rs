//! Location model for the fixed reporting point

use serde::{Deserialize, Serialize};

use crate::config::LocationConfig;

/// Location coordinates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Display name
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: String) -> Self {
        Self {
            name,
            latitude,
            longitude,
        }
    }

    /// Coordinates in the `lat,lon` form api.weather.gov expects for `point=`
    #[must_use]
    pub fn point_parameter(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

impl From<&LocationConfig> for Location {
    fn from(config: &LocationConfig) -> Self {
        Self::new(config.latitude, config.longitude, config.name.clone())
    }
}
