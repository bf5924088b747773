//! Speed estimation
//!
//! Speed is the distance covered over a fixed wall-clock window, so it is an
//! average over the window rather than an instantaneous value. The window
//! runs on its own cadence, independent of the rotation polling rate.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

use crate::rotation::DistanceState;
use crate::unit_conversion::{from_metric, meters_to_km, miles_to_km, ms_to_hours, UnitSystem};

/// A speed value tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    /// Speed in km/h or mph depending on `unit`
    pub value: f64,
    /// Unit of `value`
    pub unit: UnitSystem,
}

impl SpeedSample {
    /// A metric (km/h) sample
    pub fn metric(kmph: f64) -> Self {
        Self {
            value: kmph,
            unit: UnitSystem::Metric,
        }
    }

    /// The same speed expressed in `unit`
    pub fn in_unit(self, unit: UnitSystem) -> Self {
        let kmph = self.kmph();
        Self {
            value: from_metric(kmph, unit),
            unit,
        }
    }

    /// The speed in km/h regardless of the stored unit
    pub fn kmph(&self) -> f64 {
        match self.unit {
            UnitSystem::Metric => self.value,
            UnitSystem::Imperial => miles_to_km(self.value),
        }
    }
}

impl Default for SpeedSample {
    fn default() -> Self {
        Self::metric(0.0)
    }
}

/// Average speed in km/h for `distance_delta_m` covered in `window_ms`
pub fn speed_kmph(distance_delta_m: f64, window_ms: NonZeroU64) -> f64 {
    let distance_delta_km = meters_to_km(distance_delta_m);
    let hours = ms_to_hours(window_ms.get());
    distance_delta_km / hours
}

/// Derives speed from the distance covered in each window
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    window_ms: NonZeroU64,
    last: SpeedSample,
}

impl SpeedEstimator {
    /// Create an estimator for a fixed window length
    pub fn new(window_ms: NonZeroU64) -> Self {
        Self {
            window_ms,
            last: SpeedSample::default(),
        }
    }

    /// Window length in milliseconds
    pub fn window_ms(&self) -> NonZeroU64 {
        self.window_ms
    }

    /// Compute the speed over a closed window
    ///
    /// `window` is the distance state returned by
    /// [`RotationTracker::close_window`](crate::rotation::RotationTracker::close_window).
    pub fn tick(&mut self, window: &DistanceState) -> SpeedSample {
        self.last = SpeedSample::metric(speed_kmph(window.window_delta_m(), self.window_ms));
        self.last
    }

    /// Most recent sample (metric)
    pub fn last(&self) -> SpeedSample {
        self.last
    }

    /// Forget the last sample
    pub fn reset(&mut self) {
        self.last = SpeedSample::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(ms: u64) -> NonZeroU64 {
        NonZeroU64::new(ms).unwrap()
    }

    #[test]
    fn test_speed_over_one_second() {
        // 10 m in 1 s = 36 km/h
        let kmph = speed_kmph(10.0, window(1000));
        assert!((kmph - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimator_uses_window_delta() {
        let mut estimator = SpeedEstimator::new(window(500));
        let distance = DistanceState {
            cumulative_distance_m: 120.0,
            previous_distance_m: 115.0,
        };

        let sample = estimator.tick(&distance);
        assert!((sample.value - 36.0).abs() < 1e-9);
        assert_eq!(sample.unit, UnitSystem::Metric);
        assert_eq!(estimator.last(), sample);
    }

    #[test]
    fn test_imperial_conversion() {
        let sample = SpeedSample::metric(16.1).in_unit(UnitSystem::Imperial);
        assert!((sample.value - 10.0).abs() < 1e-9);
        assert!((sample.kmph() - 16.1).abs() < 1e-9);
        assert_eq!(sample.in_unit(UnitSystem::Metric).unit, UnitSystem::Metric);
    }

    #[test]
    fn test_standing_still() {
        let mut estimator = SpeedEstimator::new(window(1000));
        let sample = estimator.tick(&DistanceState::default());
        assert_eq!(sample.value, 0.0);
    }
}
