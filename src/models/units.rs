//! Unit conversions and display helpers
//!
//! The published snapshot uses one convention throughout: Fahrenheit, mph,
//! hPa, inches and feet. Anything arriving in other units passes through here.

/// Round to `places` decimal places
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let multiplier = 10_f64.powi(places);
    (value * multiplier).round() / multiplier
}

#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

#[must_use]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

#[must_use]
pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh / 1.609_344
}

#[must_use]
pub fn ms_to_mph(ms: f64) -> f64 {
    ms * 2.236_936
}

#[must_use]
pub fn knots_to_mph(knots: f64) -> f64 {
    knots * 1.150_779
}

#[must_use]
pub fn pa_to_hpa(pascals: f64) -> f64 {
    pascals / 100.0
}

/// Convert wind direction from degrees to a 16-point cardinal direction
#[must_use]
pub fn wind_direction_to_cardinal(degrees: f64) -> &'static str {
    if !degrees.is_finite() {
        return "Unknown";
    }
    // rem_euclid keeps negative bearings in range
    let degrees = degrees.rem_euclid(360.0).round() as u16;
    match degrees {
        0..=11 | 349..=360 => "N",
        12..=33 => "NNE",
        34..=56 => "NE",
        57..=78 => "ENE",
        79..=101 => "E",
        102..=123 => "ESE",
        124..=146 => "SE",
        147..=168 => "SSE",
        169..=191 => "S",
        192..=213 => "SSW",
        214..=236 => "SW",
        237..=258 => "WSW",
        259..=281 => "W",
        282..=303 => "WNW",
        304..=326 => "NW",
        327..=348 => "NNW",
        _ => "Unknown",
    }
}

/// Convert a WMO weather code to human-readable description
#[must_use]
pub fn weather_code_to_description(code: u8) -> &'static str {
    match code {
        0 => "Clear",
        1 => "Mostly Clear",
        2 => "Partly Cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Freezing Fog",
        51 => "Light Drizzle",
        53 => "Drizzle",
        55 => "Heavy Drizzle",
        56 => "Light Freezing Drizzle",
        57 => "Freezing Drizzle",
        61 => "Light Rain",
        63 => "Rain",
        65 => "Heavy Rain",
        66 => "Light Freezing Rain",
        67 => "Freezing Rain",
        71 => "Light Snow",
        73 => "Snow",
        75 => "Heavy Snow",
        77 => "Snow Grains",
        80 => "Light Showers",
        81 => "Showers",
        82 => "Heavy Showers",
        85 => "Light Snow Showers",
        86 => "Snow Showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with Hail",
        99 => "Severe Thunderstorm",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 32.0)]
    #[case(100.0, 212.0)]
    #[case(-40.0, -40.0)]
    #[case(21.5, 70.7)]
    fn test_celsius_to_fahrenheit(#[case] celsius: f64, #[case] expected: f64) {
        assert_eq!(round_to(celsius_to_fahrenheit(celsius), 1), expected);
        assert!((fahrenheit_to_celsius(celsius_to_fahrenheit(celsius)) - celsius).abs() < 1e-9);
    }

    #[rstest]
    #[case(kmh_to_mph(16.09344), 10.0)]
    #[case(ms_to_mph(10.0), 22.4)]
    #[case(knots_to_mph(10.0), 11.5)]
    #[case(pa_to_hpa(101_325.0), 1013.3)]
    fn test_speed_and_pressure_conversions(#[case] converted: f64, #[case] expected: f64) {
        assert_eq!(round_to(converted, 1), expected);
    }

    #[rstest]
    #[case(0.0, "N")]
    #[case(359.6, "N")]
    #[case(22.5, "NNE")]
    #[case(90.0, "E")]
    #[case(225.0, "SW")]
    #[case(-90.0, "W")]
    #[case(720.0, "N")]
    #[case(f64::NAN, "Unknown")]
    fn test_wind_direction_to_cardinal(#[case] degrees: f64, #[case] expected: &str) {
        assert_eq!(wind_direction_to_cardinal(degrees), expected);
    }

    #[test]
    fn test_weather_code_descriptions() {
        assert_eq!(weather_code_to_description(0), "Clear");
        assert_eq!(weather_code_to_description(63), "Rain");
        assert_eq!(weather_code_to_description(99), "Severe Thunderstorm");
        assert_eq!(weather_code_to_description(42), "Unknown");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.2346, 3), 1.235);
        assert_eq!(round_to(-0.04, 1), -0.0);
        assert_eq!(round_to(7.0, 1), 7.0);
    }
}
