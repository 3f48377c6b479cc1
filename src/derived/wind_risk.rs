//! Wind impact on the site
//!
//! Each compass sector has an exposure factor between 0 (fully sheltered)
//! and 1 (open fetch). The worry score of a wind is `speed * factor^1.5`, so
//! speed counts far more on exposed sectors. Peaks are taken over the first
//! hours of the hourly series, falling back to the model's current wind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::units::round_to;
use crate::models::{CurrentConditions, HourlyPoint};

/// Factor used for a direction no sector covers
const UNCOVERED_EXPOSURE: f64 = 0.5;

/// One compass sector, `from` inclusive to `to` exclusive, in degrees.
/// A sector with `from > to` wraps through north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureSector {
    pub from: f64,
    pub to: f64,
    pub factor: f64,
}

impl ExposureSector {
    const fn new(from: f64, to: f64, factor: f64) -> Self {
        Self { from, to, factor }
    }

    fn contains(&self, degrees: f64) -> bool {
        if self.from <= self.to {
            (self.from..self.to).contains(&degrees)
        } else {
            degrees >= self.from || degrees < self.to
        }
    }
}

/// Exposure of a cove-side house: open water to the north, rising ground
/// to the south-west
#[must_use]
pub fn default_exposure() -> Vec<ExposureSector> {
    vec![
        ExposureSector::new(0.0, 20.0, 1.0),
        ExposureSector::new(20.0, 60.0, 0.9),
        ExposureSector::new(60.0, 90.0, 0.7),
        ExposureSector::new(90.0, 130.0, 0.5),
        ExposureSector::new(130.0, 165.0, 0.2),
        ExposureSector::new(165.0, 200.0, 0.1),
        ExposureSector::new(200.0, 255.0, 0.05),
        ExposureSector::new(255.0, 285.0, 0.3),
        ExposureSector::new(285.0, 315.0, 0.7),
        ExposureSector::new(315.0, 360.0, 0.95),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorryLevel {
    Low,
    Noticeable,
    Notable,
    Significant,
    Severe,
}

impl WorryLevel {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 30.0 {
            WorryLevel::Severe
        } else if score >= 20.0 {
            WorryLevel::Significant
        } else if score >= 12.0 {
            WorryLevel::Notable
        } else if score >= 5.0 {
            WorryLevel::Noticeable
        } else {
            WorryLevel::Low
        }
    }
}

/// Strongest wind in the window and what it means for the site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindPeak {
    pub peak_mph: f64,
    /// Whole degrees the wind blows from
    pub direction: f64,
    pub exposure_factor: f64,
    pub worry_score: f64,
    pub level: WorryLevel,
    /// Hour of the peak; `None` when taken from current conditions
    pub peak_time: Option<DateTime<Utc>>,
}

/// The `wind_risk` block of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindRisk {
    pub window_hours: usize,
    pub gust: Option<WindPeak>,
    pub sustained: Option<WindPeak>,
}

/// Exposure factor for wind from `degrees`
#[must_use]
pub fn exposure_factor(degrees: f64, exposure: &[ExposureSector]) -> f64 {
    let degrees = degrees.rem_euclid(360.0).trunc();
    exposure
        .iter()
        .find(|sector| sector.contains(degrees))
        .map_or(UNCOVERED_EXPOSURE, |sector| sector.factor)
}

/// `speed * factor^1.5`, rounded to two places
#[must_use]
pub fn worry_score(speed: f64, factor: f64) -> f64 {
    round_to(speed * factor.powf(1.5), 2)
}

fn peak(
    speed: f64,
    direction: f64,
    peak_time: Option<DateTime<Utc>>,
    exposure: &[ExposureSector],
) -> WindPeak {
    let direction = direction.rem_euclid(360.0).trunc();
    let factor = exposure_factor(direction, exposure);
    let score = worry_score(speed, factor);
    WindPeak {
        peak_mph: round_to(speed, 1),
        direction,
        exposure_factor: round_to(factor, 2),
        worry_score: score,
        level: WorryLevel::from_score(score),
        peak_time,
    }
}

/// Earliest maximum of `speed` among hours that also report a direction
fn find_peak(
    window: &[HourlyPoint],
    speed: impl Fn(&HourlyPoint) -> Option<f64>,
) -> Option<(f64, f64, DateTime<Utc>)> {
    window
        .iter()
        .filter_map(|point| Some((speed(point)?, point.wind_direction?, point.time)))
        .fold(None, |best, candidate| match best {
            Some(best) if best.0 >= candidate.0 => Some(best),
            _ => Some(candidate),
        })
}

/// Assess gust and sustained wind risk over the first `window_hours` hours.
/// `None` when neither the series nor the current conditions carry a wind
/// with a direction.
#[must_use]
pub fn assess(
    hourly: &[HourlyPoint],
    current: &CurrentConditions,
    window_hours: usize,
    exposure: &[ExposureSector],
) -> Option<WindRisk> {
    let window = &hourly[..hourly.len().min(window_hours)];

    let gust = find_peak(window, |point| point.wind_gust)
        .map(|(speed, direction, time)| peak(speed, direction, Some(time), exposure))
        .or_else(|| {
            Some(peak(current.wind_gust?, current.wind_direction?, None, exposure))
        });
    let sustained = find_peak(window, |point| point.wind_speed)
        .map(|(speed, direction, time)| peak(speed, direction, Some(time), exposure))
        .or_else(|| {
            Some(peak(current.wind_speed?, current.wind_direction?, None, exposure))
        });

    if gust.is_none() && sustained.is_none() {
        return None;
    }

    Some(WindRisk {
        window_hours,
        gust,
        sustained,
    })
}
