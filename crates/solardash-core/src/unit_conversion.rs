//! Unit Conversion Functions
//!
//! Provides the conversions behind the dashboard readouts:
//! - Temperature: °C → °F
//! - Distance and speed: km ↔ miles (dashboard factor of 1.61)
//! - Time: milliseconds → hours, seconds → minutes

use serde::{Deserialize, Serialize};

/// Kilometres per mile as used by the dashboard readouts (rounded).
pub const KM_PER_MILE: f64 = 1.61;

/// Milliseconds in one hour
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Unit system used for speed and distance readouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Kilometres and km/h
    #[default]
    Metric,
    /// Miles and mph
    Imperial,
}

impl UnitSystem {
    /// The other unit system
    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }

    /// Label used after a speed value
    pub fn speed_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "kmph",
            UnitSystem::Imperial => "mph",
        }
    }

    /// Label used after a distance value
    pub fn distance_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "km",
            UnitSystem::Imperial => "mil",
        }
    }
}

/// Convert Celsius to Fahrenheit
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Convert kilometres (or km/h) to miles (or mph)
pub fn km_to_miles(km: f64) -> f64 {
    km / KM_PER_MILE
}

/// Convert miles (or mph) to kilometres (or km/h)
pub fn miles_to_km(miles: f64) -> f64 {
    miles * KM_PER_MILE
}

/// Convert metres to kilometres
pub fn meters_to_km(m: f64) -> f64 {
    m / 1000.0
}

/// Convert a millisecond span to hours
pub fn ms_to_hours(ms: u64) -> f64 {
    ms as f64 / MS_PER_HOUR
}

/// Convert seconds to minutes
pub fn secs_to_minutes(secs: f64) -> f64 {
    secs / 60.0
}

/// Express a metric value (km or km/h) in the given unit system
pub fn from_metric(value: f64, unit: UnitSystem) -> f64 {
    match unit {
        UnitSystem::Metric => value,
        UnitSystem::Imperial => km_to_miles(value),
    }
}
