//! Power Telemetry
//!
//! Parses the serial telemetry stream from the charge controller. Each line
//! carries one `TAG<TAB>VALUE` pair; only a small set of recognized channels
//! is kept and everything else is dropped silently.

mod error;
mod frame;
mod ingest;
pub mod serial;

pub use error::ParseError;
pub use frame::{ChannelScale, TelemetryFrame};
pub use ingest::{parse_line, TelemetryIngest, TelemetryRecord};
pub use serial::SerialLineSource;

/// Separator between tag and value
pub const SEPARATOR: char = '\t';

/// Marker shown for channels that have not been received yet
pub const NOT_AVAILABLE: &str = "NA";

/// Default recognized channels: battery voltage, current, panel power
pub const DEFAULT_CHANNELS: [&str; 3] = ["V", "I", "PPV"];

/// Channel displayed after scaling (millivolts to volts)
pub const DEFAULT_SCALED_CHANNEL: &str = "V";

/// Divisor applied to the scaled channel
pub const DEFAULT_SCALE_DIVISOR: f64 = 1000.0;

/// Default serial device
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default baud rate of the telemetry link
pub const DEFAULT_BAUD_RATE: u32 = 19200;
