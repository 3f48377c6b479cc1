//! Short-range outlook indicators: pressure tendency, fog, the 850 hPa
//! precipitation column and trough approach

use serde::{Deserialize, Serialize};

use super::PrecipType;
use crate::models::HourlyPoint;
use crate::models::units::round_to;

/// Hours in the fog window
pub const FOG_WINDOW_HOURS: usize = 12;

/// 3-hour change (hPa) beyond which pressure is rising or falling
const PRESSURE_CHANGE: f64 = 0.6;
/// 3-hour change (hPa) beyond which the change is fast
const PRESSURE_CHANGE_FAST: f64 = 3.0;
/// 6-hour 850 hPa height change (m) that marks a trough or ridge
const HEIGHT_CHANGE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureTendency {
    RisingFast,
    Rising,
    Steady,
    Falling,
    FallingFast,
}

/// Model sea-level pressure change over the next three hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureTrend {
    pub tendency: PressureTendency,
    pub change_hpa_3h: f64,
}

impl PressureTrend {
    /// Alarm raised by a fast change, if any
    #[must_use]
    pub fn alarm(&self) -> Option<PressureAlarm> {
        match self.tendency {
            PressureTendency::FallingFast => Some(PressureAlarm::Falling),
            PressureTendency::RisingFast => Some(PressureAlarm::Rising),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureAlarm {
    Falling,
    Rising,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FogLikelihood {
    Likely,
    Possible,
    LowChance,
    Unlikely,
}

/// Share of the coming hours that meet fog criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FogOutlook {
    /// Percent of the window
    pub percent: u8,
    pub likelihood: FogLikelihood,
    pub fog_hours: usize,
    pub window_hours: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Moderate,
    Low,
}

/// Precipitation type implied by the 850 hPa temperature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPrecip {
    pub precip_type: PrecipType,
    pub confidence: Confidence,
    /// °F at the first forecast hour
    pub temperature_850hpa: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TroughTendency {
    Approaching,
    Steady,
    Ridging,
}

/// 850 hPa geopotential height change over six hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroughSignal {
    pub tendency: TroughTendency,
    /// Metres
    pub height_change_6h: f64,
}

/// Pressure change between the first hour and three hours later
#[must_use]
pub fn pressure_trend(hourly: &[HourlyPoint]) -> Option<PressureTrend> {
    let first = hourly.first()?.pressure?;
    let later = hourly.get(3)?.pressure?;
    if hourly[1..3].iter().any(|point| point.pressure.is_none()) {
        return None;
    }

    let change = later - first;
    let tendency = if change >= PRESSURE_CHANGE_FAST {
        PressureTendency::RisingFast
    } else if change >= PRESSURE_CHANGE {
        PressureTendency::Rising
    } else if change <= -PRESSURE_CHANGE_FAST {
        PressureTendency::FallingFast
    } else if change <= -PRESSURE_CHANGE {
        PressureTendency::Falling
    } else {
        PressureTendency::Steady
    };

    Some(PressureTrend {
        tendency,
        change_hpa_3h: round_to(change, 1),
    })
}

/// An hour is foggy when the dew point depression is at most 2 °F, humidity
/// at least 93% and wind at most 10 mph. Missing values never qualify.
fn is_fog_hour(point: &HourlyPoint) -> bool {
    let (Some(temperature), Some(dew_point), Some(humidity), Some(wind)) = (
        point.temperature,
        point.dew_point,
        point.humidity,
        point.wind_speed,
    ) else {
        return false;
    };
    temperature - dew_point <= 2.0 && humidity >= 93.0 && wind <= 10.0
}

/// Fog outlook over the next twelve hours
#[must_use]
pub fn fog_outlook(hourly: &[HourlyPoint]) -> Option<FogOutlook> {
    let window = &hourly[..hourly.len().min(FOG_WINDOW_HOURS)];
    if window.is_empty() {
        return None;
    }

    let fog_hours = window.iter().filter(|point| is_fog_hour(point)).count();
    let percent = (fog_hours as f64 / window.len() as f64 * 100.0).round() as u8;
    let likelihood = match percent {
        75.. => FogLikelihood::Likely,
        40.. => FogLikelihood::Possible,
        15.. => FogLikelihood::LowChance,
        _ => FogLikelihood::Unlikely,
    };

    Some(FogOutlook {
        percent,
        likelihood,
        fog_hours,
        window_hours: window.len(),
    })
}

/// Column precipitation type from the first hour's 850 hPa temperature.
/// In the marginal band the surface wet bulb decides.
#[must_use]
pub fn column_precip(hourly: &[HourlyPoint], surface_wet_bulb: Option<f64>) -> Option<ColumnPrecip> {
    let t850 = hourly.first()?.temperature_850hpa?;

    let (precip_type, confidence) = if t850 >= 32.0 {
        (PrecipType::Rain, Confidence::High)
    } else if t850 >= 28.0 {
        match surface_wet_bulb {
            Some(wb) if wb <= 32.0 => (PrecipType::SnowLikely, Confidence::Moderate),
            _ => (PrecipType::Mixed, Confidence::Low),
        }
    } else if t850 >= 20.0 {
        (PrecipType::Snow, Confidence::High)
    } else {
        (PrecipType::HeavySnow, Confidence::High)
    };

    Some(ColumnPrecip {
        precip_type,
        confidence,
        temperature_850hpa: round_to(t850, 1),
    })
}

/// Trough or ridge signal from the 850 hPa height change over six hours
#[must_use]
pub fn trough_signal(hourly: &[HourlyPoint]) -> Option<TroughSignal> {
    let heights = hourly
        .get(..7)?
        .iter()
        .map(|point| point.height_850hpa)
        .collect::<Option<Vec<f64>>>()?;

    let change = round_to(heights[6] - heights[0], 0);
    let tendency = if change <= -HEIGHT_CHANGE {
        TroughTendency::Approaching
    } else if change >= HEIGHT_CHANGE {
        TroughTendency::Ridging
    } else {
        TroughTendency::Steady
    };

    Some(TroughSignal {
        tendency,
        height_change_6h: change,
    })
}
