//! Telemetry errors

use thiserror::Error;

/// Errors that can occur while parsing the telemetry stream
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The line is not a single `TAG<TAB>VALUE` pair
    #[error("Malformed telemetry frame: {0:?}")]
    MalformedFrame(String),

    /// The port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),
}
