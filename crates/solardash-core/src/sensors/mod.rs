//! Sensor Sources
//!
//! One trait per sensor capability. Concrete sources are chosen at startup:
//! real hardware, the simulated generators used for bench runs, or scripted
//! fakes that fail on demand in tests.

mod error;
pub mod hardware;
pub mod scripted;
pub mod simulated;
mod timed;

pub use error::SensorError;
pub use timed::Timed;

use crate::geo::GeoPoint;
use crate::video::VideoFrame;

/// Digital input carrying the wheel rotation sensor level
pub trait RotationSource: Send {
    /// Read the current electrical level
    fn read_level(&mut self) -> Result<bool, SensorError>;
}

/// Ambient temperature sensor
pub trait TemperatureSource: Send {
    /// Perform one temperature transaction, in degrees Celsius
    fn read_celsius(&mut self) -> Result<f64, SensorError>;
}

/// Newline-delimited text stream (the power telemetry serial link)
pub trait LineSource: Send {
    /// Block until the next complete line is available
    ///
    /// The returned line has its terminator removed.
    fn read_line(&mut self) -> Result<String, SensorError>;
}

/// Camera capture device
pub trait FrameSource: Send {
    /// Capture one raw frame
    fn capture(&mut self) -> Result<VideoFrame, SensorError>;
}

/// Position fix provider
pub trait PositionSource: Send {
    /// Current geographic position
    fn read_position(&mut self) -> Result<GeoPoint, SensorError>;
}

impl<T: RotationSource + ?Sized> RotationSource for Box<T> {
    fn read_level(&mut self) -> Result<bool, SensorError> {
        (**self).read_level()
    }
}

impl<T: TemperatureSource + ?Sized> TemperatureSource for Box<T> {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        (**self).read_celsius()
    }
}

impl<T: LineSource + ?Sized> LineSource for Box<T> {
    fn read_line(&mut self) -> Result<String, SensorError> {
        (**self).read_line()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn capture(&mut self) -> Result<VideoFrame, SensorError> {
        (**self).capture()
    }
}

impl<T: PositionSource + ?Sized> PositionSource for Box<T> {
    fn read_position(&mut self) -> Result<GeoPoint, SensorError> {
        (**self).read_position()
    }
}
