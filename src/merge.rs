//! Combine the four source fragments into one snapshot
//!
//! Outcomes are keyed by role, never by position, so the input order has
//! no effect on the result. A failed or missing role contributes its
//! null/empty placeholder and a failed entry in `sources`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::{FailureKind, SourceFailure};
use crate::models::astronomy::solar_times;
use crate::models::snapshot::SCHEMA_VERSION;
use crate::models::units::{round_to, weather_code_to_description, wind_direction_to_cardinal};
use crate::models::{
    Astronomy, Comparison, CurrentConditions, Hyperlocal, Location, MoonPhase, ObservationSource,
    SourceStatus, WeatherSnapshot,
};
use crate::sources::{
    AlertFragment, ForecastFragment, Fragment, SourceKind, SourceOutcome, StationFragment,
    TideFragment,
};

/// The outcomes of a run, keyed by role
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentSet {
    outcomes: BTreeMap<SourceKind, SourceOutcome>,
}

fn not_collected(role: SourceKind) -> SourceFailure {
    SourceFailure::unavailable(role, "source was not collected")
}

impl FragmentSet {
    /// Record one outcome under its role, replacing what was there
    pub fn insert(&mut self, outcome: SourceOutcome) {
        self.outcomes.insert(outcome.source, outcome);
    }

    fn fragment(&self, role: SourceKind) -> Option<&Fragment> {
        self.outcomes.get(&role)?.result.as_ref().ok()
    }

    #[must_use]
    pub fn forecast(&self) -> Option<&ForecastFragment> {
        match self.fragment(SourceKind::Forecast)? {
            Fragment::Forecast(fragment) => Some(fragment),
            _ => None,
        }
    }

    #[must_use]
    pub fn station(&self) -> Option<&StationFragment> {
        match self.fragment(SourceKind::Station)? {
            Fragment::Station(fragment) => Some(fragment),
            _ => None,
        }
    }

    #[must_use]
    pub fn tides(&self) -> Option<&TideFragment> {
        match self.fragment(SourceKind::Tides)? {
            Fragment::Tides(fragment) => Some(fragment),
            _ => None,
        }
    }

    #[must_use]
    pub fn alerts(&self) -> Option<&AlertFragment> {
        match self.fragment(SourceKind::Alerts)? {
            Fragment::Alerts(fragment) => Some(fragment),
            _ => None,
        }
    }

    /// Failures in role order; a role with no outcome counts as unavailable
    #[must_use]
    pub fn failures(&self) -> Vec<SourceFailure> {
        SourceKind::ALL
            .iter()
            .filter_map(|&role| match self.outcomes.get(&role) {
                Some(outcome) => outcome.failure().cloned(),
                None => Some(not_collected(role)),
            })
            .collect()
    }

    fn statuses(&self, generated_at: DateTime<Utc>) -> BTreeMap<SourceKind, SourceStatus> {
        SourceKind::ALL
            .iter()
            .map(|&role| {
                let status = match self.outcomes.get(&role) {
                    Some(outcome) => match &outcome.result {
                        Ok(fragment) => SourceStatus::ok().with_model(fragment.model()),
                        Err(failure) => SourceStatus::failed(failure.kind, failure.to_string()),
                    }
                    .updated(outcome.fetched_at, generated_at),
                    None => {
                        let failure = not_collected(role);
                        SourceStatus::failed(failure.kind, failure.to_string())
                    }
                };
                (role, status)
            })
            .collect()
    }
}

impl FromIterator<SourceOutcome> for FragmentSet {
    fn from_iter<I: IntoIterator<Item = SourceOutcome>>(outcomes: I) -> Self {
        let mut set = Self::default();
        for outcome in outcomes {
            set.insert(outcome);
        }
        set
    }
}

/// Merge the collected outcomes into a complete snapshot.
///
/// Pure: the same outcomes, location, zone and `generated_at` always yield the
/// same snapshot. Never fails.
#[must_use]
pub fn merge(
    fragments: &FragmentSet,
    location: &Location,
    timezone: Tz,
    generated_at: DateTime<Utc>,
) -> WeatherSnapshot {
    let forecast = fragments.forecast();
    let station = fragments.station();

    let model_current = forecast.map(|f| f.current.clone()).unwrap_or_default();
    let station_current = station.map(|s| s.conditions.clone()).unwrap_or_default();

    let current = best_current(&station_current, &model_current);
    let hyperlocal = hyperlocal(&station_current, &model_current);
    if hyperlocal.is_none() && station.is_some() && forecast.is_some() {
        debug!("no hyperlocal bias: a temperature is missing");
    }

    let astronomy = astronomy(forecast, location, timezone, generated_at);

    let snapshot = WeatherSnapshot {
        schema_version: SCHEMA_VERSION.to_string(),
        generated_at,
        location: location.clone(),
        current,
        comparison: Comparison {
            station: station_current,
            model: model_current,
        },
        hyperlocal,
        alerts: fragments
            .alerts()
            .map(|a| a.alerts.clone())
            .unwrap_or_default(),
        forecast: forecast.map(|f| f.daily.clone()).unwrap_or_default(),
        hourly: forecast.map(|f| f.hourly.clone()).unwrap_or_default(),
        derived: forecast.map(|f| f.derived.clone()).unwrap_or_default(),
        wind_risk: forecast.and_then(|f| f.wind_risk.clone()),
        tides: fragments
            .tides()
            .map(|t| t.events.clone())
            .unwrap_or_default(),
        tide_curve: fragments
            .tides()
            .map(|t| t.curve.clone())
            .unwrap_or_default(),
        astronomy,
        sources: fragments.statuses(generated_at),
    };

    let degraded = fragments.failures().len();
    if degraded == SourceKind::ALL.len() {
        warn!("every source failed; snapshot carries placeholders only");
    } else if degraded > 0 {
        debug!(degraded, "snapshot merged with degraded sources");
    }

    snapshot
}

/// Station values field by field, falling back to the model
fn best_current(station: &CurrentConditions, model: &CurrentConditions) -> CurrentConditions {
    let observation_source = if station.temperature.is_some() {
        Some(ObservationSource::Station)
    } else if !model.is_empty() {
        Some(ObservationSource::Model)
    } else if !station.is_empty() {
        Some(ObservationSource::Station)
    } else {
        None
    };

    let wind_direction = station.wind_direction.or(model.wind_direction);
    // Weather codes only come from the model; keep code and label together
    let weather_code = model.weather_code;

    CurrentConditions {
        temperature: station.temperature.or(model.temperature),
        feels_like: station.feels_like.or(model.feels_like),
        dew_point: station.dew_point.or(model.dew_point),
        wet_bulb: None,
        precip_type: None,
        humidity: station.humidity.or(model.humidity),
        pressure: station.pressure.or(model.pressure),
        cloud_cover: station.cloud_cover.or(model.cloud_cover),
        precipitation: station.precipitation.or(model.precipitation),
        wind_speed: station.wind_speed.or(model.wind_speed),
        wind_gust: station.wind_gust.or(model.wind_gust),
        wind_direction,
        wind_cardinal: wind_direction.map(|d| wind_direction_to_cardinal(d).to_string()),
        weather_code,
        condition: weather_code
            .map(|code| weather_code_to_description(code).to_string())
            .or_else(|| station.condition.clone()),
        observation_source,
        observed_at: match observation_source {
            Some(ObservationSource::Station) => station.observed_at.or(model.observed_at),
            _ => model.observed_at.or(station.observed_at),
        },
    }
    .with_wet_bulb()
}

fn hyperlocal(station: &CurrentConditions, model: &CurrentConditions) -> Option<Hyperlocal> {
    let observed = station.temperature?;
    let modeled = model.temperature?;
    let bias_temp = round_to(observed - modeled, 1);

    Some(Hyperlocal {
        bias_temp,
        corrected_temp: round_to(modeled + bias_temp, 1),
    })
}

fn astronomy(
    forecast: Option<&ForecastFragment>,
    location: &Location,
    timezone: Tz,
    generated_at: DateTime<Utc>,
) -> Astronomy {
    let local_date = generated_at.with_timezone(&timezone).date_naive();
    let (computed_sunrise, computed_sunset) = solar_times(location, local_date);

    Astronomy {
        sunrise: forecast.and_then(|f| f.sunrise).or(computed_sunrise),
        sunset: forecast.and_then(|f| f.sunset).or(computed_sunset),
        moon_phase: MoonPhase::at(generated_at),
    }
}

/// Failure kind each role reported, for logging a run summary
#[must_use]
pub fn failure_kinds(fragments: &FragmentSet) -> Vec<(SourceKind, FailureKind)> {
    fragments
        .failures()
        .into_iter()
        .map(|failure| (failure.role, failure.kind))
        .collect()
}
