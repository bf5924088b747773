//! Sensor errors

use thiserror::Error;

/// Errors reported by sensor sources
///
/// Every variant is non-fatal: the caller substitutes its sentinel value and
/// waits for the next scheduled tick.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The device answered with bad data
    #[error("Sensor fault: {0}")]
    Fault(String),

    /// The read missed its deadline
    #[error("{source_name} did not answer within {after_ms} ms")]
    Timeout {
        /// Source that stalled
        source_name: String,
        /// Deadline that was missed
        after_ms: u64,
    },

    /// A previous read is still stuck on the device
    #[error("{0} is still busy with the previous read")]
    Busy(String),

    /// The device is missing or closed
    #[error("Sensor unavailable: {0}")]
    Unavailable(String),

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SensorError {
    /// Whether the error is a timeout (treated like any other fault)
    pub fn is_timeout(&self) -> bool {
        matches!(self, SensorError::Timeout { .. })
    }
}
