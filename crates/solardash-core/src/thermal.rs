//! Ambient temperature monitoring

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sensors::{SensorError, TemperatureSource};
use crate::unit_conversion::celsius_to_fahrenheit;

/// Sentinel written to both temperature fields on a sensor fault
pub const FAULT_SENTINEL: f64 = -1.0;

/// One temperature reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalReading {
    /// Degrees Celsius
    pub celsius: f64,
    /// Degrees Fahrenheit
    pub fahrenheit: f64,
    /// False when the sensor read failed and the fields hold the sentinel
    pub valid: bool,
}

impl ThermalReading {
    /// Reading returned on any sensor failure
    pub const FAULT: ThermalReading = ThermalReading {
        celsius: FAULT_SENTINEL,
        fahrenheit: FAULT_SENTINEL,
        valid: false,
    };

    /// A valid reading
    pub fn from_celsius(celsius: f64) -> Self {
        Self {
            celsius,
            fahrenheit: celsius_to_fahrenheit(celsius),
            valid: true,
        }
    }
}

impl Default for ThermalReading {
    fn default() -> Self {
        Self::FAULT
    }
}

/// Wraps a temperature sensor with fault-sentinel fallback
///
/// A failed read is not retried within the same tick; the next scheduled
/// tick is the only retry. Only the first fault of a streak is logged at
/// `warn`.
pub struct ThermalMonitor<S> {
    source: S,
    last: ThermalReading,
    fault_streak: u32,
}

impl<S: TemperatureSource> ThermalMonitor<S> {
    /// Create a monitor over `source`
    pub fn new(source: S) -> Self {
        Self {
            source,
            last: ThermalReading::FAULT,
            fault_streak: 0,
        }
    }

    /// Read the sensor once
    pub fn tick(&mut self) -> ThermalReading {
        let result = self.source.read_celsius();
        self.record(result)
    }

    fn record(&mut self, result: Result<f64, SensorError>) -> ThermalReading {
        self.last = match result {
            Ok(celsius) if celsius.is_finite() => {
                if self.fault_streak > 0 {
                    info!("Temp sensor recovered after {} failed reads", self.fault_streak);
                    self.fault_streak = 0;
                }
                ThermalReading::from_celsius(celsius)
            }
            Ok(celsius) => {
                self.fault(format_args!("non-finite reading {celsius}"));
                ThermalReading::FAULT
            }
            Err(e) => {
                self.fault(format_args!("{e}"));
                ThermalReading::FAULT
            }
        };
        self.last
    }

    fn fault(&mut self, reason: std::fmt::Arguments<'_>) {
        if self.fault_streak == 0 {
            warn!("Temp sensor failure: {reason}");
        } else {
            debug!("Temp sensor failure: {reason}");
        }
        self.fault_streak = self.fault_streak.saturating_add(1);
    }

    /// Consecutive failed reads up to the last tick
    pub fn fault_streak(&self) -> u32 {
        self.fault_streak
    }

    /// Most recent reading
    pub fn last(&self) -> ThermalReading {
        self.last
    }
}
