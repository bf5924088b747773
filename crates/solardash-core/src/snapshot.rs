//! Dashboard snapshot
//!
//! The latest display values, owned and written by the scheduler and read by
//! the rendering sink on every redraw.
//!
//! Each field is written by exactly one task and carries the sequence number
//! of the task invocation that wrote it. Fields are not updated together, so
//! a reader can see, say, a speed from one window next to a distance from a
//! later rotation tick. Compare the stamps to tell.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::geo::ScreenPoint;
use crate::health::HealthReport;
use crate::speed::SpeedSample;
use crate::thermal::ThermalReading;
use crate::unit_conversion::{from_metric, meters_to_km, secs_to_minutes, UnitSystem};
use crate::video::VideoFrame;

/// A value tagged with the task invocation that wrote it
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    /// The value
    pub value: T,
    /// Sequence number of the writing invocation (0 = initial value)
    pub seq: u64,
}

impl<T> Stamped<T> {
    /// An initial value that no task has written yet
    pub fn initial(value: T) -> Self {
        Self { value, seq: 0 }
    }

    /// Replace the value
    pub fn set(&mut self, value: T, seq: u64) {
        self.value = value;
        self.seq = seq;
    }
}

/// Shared aggregate of all sensor-derived display values
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    /// Wall-clock time the dashboard started (or was last reset)
    pub started_at: DateTime<Utc>,
    /// Latest speed sample, in the selected unit
    pub speed: Stamped<SpeedSample>,
    /// Distance readout
    pub distance: Stamped<String>,
    /// Latest temperature reading
    pub thermal: Stamped<ThermalReading>,
    /// Power telemetry readout
    pub telemetry: Stamped<String>,
    /// Elapsed time readout
    pub elapsed: Stamped<String>,
    /// Last successfully captured camera frame
    pub video: Stamped<Option<Arc<VideoFrame>>>,
    /// Projected vehicle position on the map surface
    pub position: Stamped<ScreenPoint>,
    /// Source health
    pub health: Stamped<HealthReport>,
}

impl DashboardSnapshot {
    /// Snapshot with every readout at its zero/unavailable value
    pub fn new(unit: UnitSystem, telemetry_text: String) -> Self {
        Self {
            started_at: Utc::now(),
            speed: Stamped::initial(SpeedSample::default().in_unit(unit)),
            distance: Stamped::initial(format_distance(0.0, unit)),
            thermal: Stamped::initial(ThermalReading::FAULT),
            telemetry: Stamped::initial(telemetry_text),
            elapsed: Stamped::initial(format_elapsed(Duration::ZERO)),
            video: Stamped::initial(None),
            position: Stamped::initial(ScreenPoint::ORIGIN),
            health: Stamped::initial(HealthReport::default()),
        }
    }

    /// Speed readout
    pub fn speed_text(&self) -> String {
        format_speed(&self.speed.value)
    }

    /// Temperature readout
    pub fn temperature_text(&self) -> String {
        format_temperature(&self.thermal.value)
    }

    /// All text readouts in display order
    pub fn lines(&self) -> Vec<String> {
        vec![
            self.speed_text(),
            self.distance.value.clone(),
            self.temperature_text(),
            self.elapsed.value.clone(),
            self.telemetry.value.clone(),
        ]
    }

    /// Whether the speed and distance readouts came from the same invocation
    ///
    /// They almost never do; the rendering sink must tolerate the mix.
    pub fn speed_and_distance_consistent(&self) -> bool {
        self.speed.seq == self.distance.seq
    }
}

/// `Speed: 12.34 kmph` or `Speed: 7.665 mph`
pub fn format_speed(sample: &SpeedSample) -> String {
    match sample.unit {
        UnitSystem::Metric => format!("Speed: {:.2} {}", sample.value, sample.unit.speed_label()),
        UnitSystem::Imperial => format!("Speed: {:.3} {}", sample.value, sample.unit.speed_label()),
    }
}

/// `Distance: 1.234 km` or `Distance: 0.766 mil`
pub fn format_distance(distance_m: f64, unit: UnitSystem) -> String {
    let value = from_metric(meters_to_km(distance_m), unit);
    format!("Distance: {:.3} {}", value, unit.distance_label())
}

/// `Temp: 21.50 C | 70.70 F`
pub fn format_temperature(reading: &ThermalReading) -> String {
    format!("Temp: {:.2} C | {:.2} F", reading.celsius, reading.fahrenheit)
}

/// `Time: 1.50 min`
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("Time: {:.2} min", secs_to_minutes(elapsed.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_speed_format() {
        assert_eq!(format_speed(&SpeedSample::metric(12.346)), "Speed: 12.35 kmph");
        assert_eq!(
            format_speed(&SpeedSample::metric(16.1).in_unit(UnitSystem::Imperial)),
            "Speed: 10.000 mph"
        );
    }

    #[test]
    fn test_distance_format() {
        assert_eq!(format_distance(1234.0, UnitSystem::Metric), "Distance: 1.234 km");
        assert_eq!(format_distance(1610.0, UnitSystem::Imperial), "Distance: 1.000 mil");
    }

    #[test]
    fn test_temperature_format() {
        assert_eq!(
            format_temperature(&ThermalReading::from_celsius(21.5)),
            "Temp: 21.50 C | 70.70 F"
        );
        assert_eq!(format_temperature(&ThermalReading::FAULT), "Temp: -1.00 C | -1.00 F");
    }

    #[test]
    fn test_elapsed_format() {
        assert_eq!(format_elapsed(Duration::from_secs(90)), "Time: 1.50 min");
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = DashboardSnapshot::new(UnitSystem::Metric, "V: NA | ".to_string());
        assert_eq!(
            snapshot.lines(),
            vec![
                "Speed: 0.00 kmph",
                "Distance: 0.000 km",
                "Temp: -1.00 C | -1.00 F",
                "Time: 0.00 min",
                "V: NA | ",
            ]
        );
        assert!(snapshot.speed_and_distance_consistent());
        assert!(snapshot.video.value.is_none());
    }
}
