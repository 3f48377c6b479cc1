//! Indicators derived from the forecast model's series
//!
//! Everything here is a pure function of normalized data: the hourly series
//! starting at the run hour and the model's current conditions. Each
//! indicator is `None` when the inputs it needs are missing.

pub mod outlook;
pub mod wind_risk;

use serde::{Deserialize, Serialize};

use crate::models::units::{fahrenheit_to_celsius, celsius_to_fahrenheit, round_to};
use crate::models::{CurrentConditions, HourlyPoint};

pub use outlook::{
    ColumnPrecip, Confidence, FogLikelihood, FogOutlook, PressureAlarm, PressureTendency,
    PressureTrend, TroughSignal, TroughTendency,
};
pub use wind_risk::{ExposureSector, WindPeak, WindRisk, WorryLevel, default_exposure};

/// Precipitation type implied by a wet-bulb or 850 hPa temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecipType {
    HeavySnow,
    Snow,
    SnowLikely,
    Mixed,
    FreezingRainPossible,
    Rain,
}

/// The `derived` block of a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Derived {
    pub pressure_trend: Option<PressureTrend>,
    pub pressure_alarm: Option<PressureAlarm>,
    pub fog_probability: Option<FogOutlook>,
    pub column_precip: Option<ColumnPrecip>,
    pub trough_signal: Option<TroughSignal>,
}

impl Derived {
    /// Compute every indicator from the hourly series and model conditions
    #[must_use]
    pub fn from_forecast(hourly: &[HourlyPoint], current: &CurrentConditions) -> Self {
        let pressure_trend = outlook::pressure_trend(hourly);
        Self {
            pressure_alarm: pressure_trend.as_ref().and_then(PressureTrend::alarm),
            pressure_trend,
            fog_probability: outlook::fog_outlook(hourly),
            column_precip: outlook::column_precip(hourly, current.wet_bulb),
            trough_signal: outlook::trough_signal(hourly),
        }
    }
}

/// Wet-bulb temperature in °F from air temperature (°F) and relative
/// humidity (%), using Stull's 2011 approximation.
#[must_use]
pub fn wet_bulb(temperature: Option<f64>, humidity: Option<f64>) -> Option<f64> {
    let t = fahrenheit_to_celsius(temperature?);
    let rh = humidity?;
    if !t.is_finite() || !(0.0..=100.0).contains(&rh) {
        return None;
    }

    let tw = t * (0.151_977 * (rh + 8.313_659).sqrt()).atan() + (t + rh).atan()
        - (rh - 1.676_331).atan()
        + 0.003_918_38 * rh.powf(1.5) * (0.023_101 * rh).atan()
        - 4.686_035;

    Some(round_to(celsius_to_fahrenheit(tw), 1))
}

/// Precipitation type for a surface wet-bulb temperature in °F
#[must_use]
pub fn precip_type(wet_bulb: Option<f64>) -> Option<PrecipType> {
    let wb = wet_bulb?;
    Some(if wb <= 28.0 {
        PrecipType::Snow
    } else if wb <= 32.0 {
        PrecipType::SnowLikely
    } else if wb <= 35.0 {
        PrecipType::Mixed
    } else if wb <= 38.0 {
        PrecipType::FreezingRainPossible
    } else {
        PrecipType::Rain
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_wet_bulb_known_values() {
        // 20 °C at 50% is about 13.7 °C wet bulb
        assert_eq!(wet_bulb(Some(68.0), Some(50.0)), Some(56.7));
        // Saturated air: wet bulb tracks the air temperature
        let saturated = wet_bulb(Some(50.0), Some(99.0)).unwrap();
        assert!((saturated - 50.0).abs() < 1.0);
    }

    #[test]
    fn test_wet_bulb_needs_both_inputs() {
        assert_eq!(wet_bulb(None, Some(50.0)), None);
        assert_eq!(wet_bulb(Some(50.0), None), None);
        assert_eq!(wet_bulb(Some(50.0), Some(140.0)), None);
    }

    #[rstest]
    #[case(20.0, PrecipType::Snow)]
    #[case(28.0, PrecipType::Snow)]
    #[case(30.5, PrecipType::SnowLikely)]
    #[case(33.0, PrecipType::Mixed)]
    #[case(37.9, PrecipType::FreezingRainPossible)]
    #[case(45.0, PrecipType::Rain)]
    fn test_precip_type_thresholds(#[case] wb: f64, #[case] expected: PrecipType) {
        assert_eq!(precip_type(Some(wb)), Some(expected));
    }

    #[test]
    fn test_precip_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(PrecipType::FreezingRainPossible).unwrap(),
            "freezing_rain_possible"
        );
        assert_eq!(precip_type(None), None);
    }

    #[test]
    fn test_empty_forecast_derives_nothing() {
        let derived = Derived::from_forecast(&[], &CurrentConditions::default());
        assert_eq!(derived, Derived::default());
        let value = serde_json::to_value(&derived).unwrap();
        assert!(value.as_object().unwrap().values().all(serde_json::Value::is_null));
    }
}
