//! Sun and moon calculations that need no network source

use std::f64::consts::PI;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::Location;
use super::units::round_to;

/// Mean length of a lunation in days
const SYNODIC_MONTH_DAYS: f64 = 29.530_588_853;

const PHASE_NAMES: [&str; 8] = [
    "New Moon",
    "Waxing Crescent",
    "First Quarter",
    "Waxing Gibbous",
    "Full Moon",
    "Waning Gibbous",
    "Last Quarter",
    "Waning Crescent",
];

/// Sun and moon data for the run date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astronomy {
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub moon_phase: MoonPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonPhase {
    /// One of the eight conventional phase names
    pub name: String,
    /// Illuminated fraction of the disc, 0.0 to 1.0
    pub illumination: f64,
    /// Days since the last mean new moon
    pub age_days: f64,
}

impl MoonPhase {
    /// Mean-lunation moon phase at `at`. Accurate to within about a day,
    /// which is all a phase label needs.
    #[must_use]
    pub fn at(at: DateTime<Utc>) -> Self {
        // 2000-01-06 18:14 UTC, a known new moon
        let reference = Utc.with_ymd_and_hms(2000, 1, 6, 18, 14, 0).single();
        let elapsed_days = reference
            .map(|reference| (at - reference).num_seconds() as f64 / 86_400.0)
            .unwrap_or_default();

        let age = elapsed_days.rem_euclid(SYNODIC_MONTH_DAYS);
        let fraction = age / SYNODIC_MONTH_DAYS;
        let illumination = (1.0 - (2.0 * PI * fraction).cos()) / 2.0;
        let index = ((fraction * 8.0 + 0.5).floor() as usize) % PHASE_NAMES.len();

        Self {
            name: PHASE_NAMES[index].to_string(),
            illumination: round_to(illumination, 2),
            age_days: round_to(age, 1),
        }
    }
}

/// Sunrise and sunset computed from coordinates, used when the forecast
/// source did not supply them. Either is `None` during polar day or night.
#[must_use]
pub fn solar_times(
    location: &Location,
    date: NaiveDate,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let Some(coordinates) = Coordinates::new(location.latitude, location.longitude) else {
        return (None, None);
    };

    let solar_day = SolarDay::new(coordinates, date);

    (
        solar_day.event_time(SolarEvent::Sunrise),
        solar_day.event_time(SolarEvent::Sunset),
    )
}
