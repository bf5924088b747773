//! Dashboard configuration
//!
//! Stored as JSON. Every field has a default, so a partial file (or no file
//! at all) yields a working simulated setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::geo::{GeoBox, GeoError, SurfaceDims};
use crate::scheduler::TaskKind;
use crate::telemetry::{
    ChannelScale, DEFAULT_BAUD_RATE, DEFAULT_CHANNELS, DEFAULT_PORT, DEFAULT_SCALED_CHANNEL,
    DEFAULT_SCALE_DIVISOR,
};
use crate::unit_conversion::UnitSystem;

/// Errors loading or validating the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The file is not valid config JSON
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The geographic box is unusable
    #[error(transparent)]
    Geo(#[from] GeoError),
}

/// Complete dashboard configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Wheel and rotation sensor
    pub vehicle: VehicleSettings,
    /// Period of each scheduled task
    pub cadence: CadenceSettings,
    /// Region in which GPS positions are projected
    pub geo_box: GeoBoxSettings,
    /// Power telemetry link
    pub serial: SerialSettings,
    /// Timeouts and fault reporting for blocking sources
    pub io: IoSettings,
    /// Display resolution for camera frames
    pub video: VideoSettings,
    /// Initial unit system
    pub units: UnitSettings,
    /// Which sensor implementations to use
    pub source: SourceSettings,
}

/// Wheel and rotation sensor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSettings {
    /// Distance covered per wheel rotation, in metres
    pub wheel_circumference_m: f64,
    /// Sensor level while the magnet passes
    pub rotation_active_level: bool,
    /// Minimum interval between counted rotations (0 disables)
    pub debounce_ms: u64,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            wheel_circumference_m: 2.153412,
            rotation_active_level: true,
            debounce_ms: 0,
        }
    }
}

/// Period of every scheduled task, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceSettings {
    /// Rotation sensor poll
    pub rotation_ms: u64,
    /// Speed window length
    pub speed_ms: u64,
    /// Temperature read
    pub thermal_ms: u64,
    /// Serial line read, and retry delay after a failed read
    pub telemetry_ingest_ms: u64,
    /// Telemetry display refresh
    pub telemetry_display_ms: u64,
    /// Elapsed time refresh
    pub clock_ms: u64,
    /// Camera capture
    pub video_ms: u64,
    /// GPS marker update
    pub position_ms: u64,
}

impl Default for CadenceSettings {
    fn default() -> Self {
        Self {
            rotation_ms: 1,
            speed_ms: 1000,
            thermal_ms: 1000,
            telemetry_ingest_ms: 200,
            telemetry_display_ms: 1000,
            clock_ms: 500,
            video_ms: 10,
            position_ms: 1000,
        }
    }
}

impl CadenceSettings {
    /// Configured period of `kind` in milliseconds
    pub fn period_ms(&self, kind: TaskKind) -> u64 {
        match kind {
            TaskKind::Rotation => self.rotation_ms,
            TaskKind::Speed => self.speed_ms,
            TaskKind::Thermal => self.thermal_ms,
            TaskKind::TelemetryIngest => self.telemetry_ingest_ms,
            TaskKind::TelemetryDisplay => self.telemetry_display_ms,
            TaskKind::Clock => self.clock_ms,
            TaskKind::Video => self.video_ms,
            TaskKind::Position => self.position_ms,
        }
    }

    /// Configured period of `kind`
    pub fn period(&self, kind: TaskKind) -> Duration {
        Duration::from_millis(self.period_ms(kind))
    }

    /// Speed window length, which must be positive
    pub fn speed_window(&self) -> Result<NonZeroU64, ConfigError> {
        NonZeroU64::new(self.speed_ms)
            .ok_or_else(|| ConfigError::Invalid("cadence.speed_ms must be > 0".to_string()))
    }
}

/// Raw geographic box bounds, validated by [`DashboardConfig::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoBoxSettings {
    /// Southern edge
    pub min_lat: f64,
    /// Western edge
    pub min_lon: f64,
    /// Northern edge
    pub max_lat: f64,
    /// Eastern edge
    pub max_lon: f64,
}

impl Default for GeoBoxSettings {
    fn default() -> Self {
        Self {
            min_lat: 41.72454112609995,
            min_lon: -73.4811918422402,
            max_lat: 41.72635922342008,
            max_lon: -73.47515215049468,
        }
    }
}

impl GeoBoxSettings {
    /// Build the validated box
    pub fn build(&self) -> Result<GeoBox, GeoError> {
        GeoBox::new(self.min_lat, self.min_lon, self.max_lat, self.max_lon)
    }
}

/// Serial telemetry link settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Bound on each blocking read
    pub read_timeout_ms: u64,
    /// Recognized channel tags, in display order
    pub channels: Vec<String>,
    /// Channel displayed after scaling
    pub scaled_channel: Option<String>,
    /// Divisor for the scaled channel
    pub scale_divisor: f64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 200,
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            scaled_channel: Some(DEFAULT_SCALED_CHANNEL.to_string()),
            scale_divisor: DEFAULT_SCALE_DIVISOR,
        }
    }
}

impl SerialSettings {
    /// Scaling rule for the display string
    pub fn scale(&self) -> Option<ChannelScale> {
        self.scaled_channel
            .as_ref()
            .map(|channel| ChannelScale::new(channel.clone(), self.scale_divisor))
    }

    /// Read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Timeouts and fault reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoSettings {
    /// Deadline for a temperature or camera read
    pub sensor_timeout_ms: u64,
    /// Consecutive faults before a source is flagged (0 disables)
    pub fault_alert_threshold: u32,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            sensor_timeout_ms: 500,
            fault_alert_threshold: 5,
        }
    }
}

impl IoSettings {
    /// Sensor deadline as a duration
    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }
}

/// Display resolution for camera frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Width in pixels
    pub target_width: u32,
    /// Height in pixels
    pub target_height: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            target_width: 1920,
            target_height: 1080,
        }
    }
}

impl VideoSettings {
    /// Target resolution as surface dimensions
    pub fn surface(&self) -> SurfaceDims {
        SurfaceDims::new(self.target_width as f64, self.target_height as f64)
    }
}

/// Initial unit system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitSettings {
    /// Start in miles instead of kilometres
    pub imperial: bool,
}

impl UnitSettings {
    /// Unit system selected at startup
    pub fn system(&self) -> UnitSystem {
        if self.imperial {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }
}

/// Sensor implementation selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Generated data, no hardware needed
    #[default]
    Simulated,
    /// GPIO, sysfs temperature sensor and serial port
    Hardware,
}

/// Sensor implementation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Hardware or simulated sources
    pub mode: SourceMode,
    /// Rotation sensor line on the SoC pin controller (BCM number on a Pi)
    pub gpio_pin: u32,
    /// Sysfs file holding the temperature in millidegrees Celsius
    pub temperature_path: PathBuf,
    /// Wheel speed used by the simulated rotation sensor
    pub simulated_speed_kmph: f64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            mode: SourceMode::Simulated,
            gpio_pin: 27,
            temperature_path: PathBuf::from("/sys/bus/iio/devices/iio:device0/in_temp_input"),
            simulated_speed_kmph: 30.0,
        }
    }
}

impl DashboardConfig {
    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every invariant and build the geographic box
    ///
    /// An inverted box is a fatal configuration error: the scheduler needs
    /// the returned [`GeoBox`], so nothing can start without it.
    pub fn validate(&self) -> Result<GeoBox, ConfigError> {
        for kind in TaskKind::ALL {
            if self.cadence.period_ms(kind) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "cadence for {kind:?} must be > 0 ms"
                )));
            }
        }
        if !(self.vehicle.wheel_circumference_m.is_finite() && self.vehicle.wheel_circumference_m > 0.0) {
            return Err(ConfigError::Invalid(
                "vehicle.wheel_circumference_m must be a positive number".to_string(),
            ));
        }
        if self.serial.scaled_channel.is_some()
            && !(self.serial.scale_divisor.is_finite() && self.serial.scale_divisor != 0.0)
        {
            return Err(ConfigError::Invalid(
                "serial.scale_divisor must be a non-zero number".to_string(),
            ));
        }
        if self.serial.channels.is_empty() {
            return Err(ConfigError::Invalid(
                "serial.channels must name at least one channel".to_string(),
            ));
        }
        if self.video.target_width == 0 || self.video.target_height == 0 {
            return Err(ConfigError::Invalid(
                "video target resolution must be non-zero".to_string(),
            ));
        }

        Ok(self.geo_box.build()?)
    }
}
