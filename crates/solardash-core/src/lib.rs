//! # SolarDash Core Library
//!
//! Sensor polling and state aggregation for the SolarDash vehicle dashboard.

#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Wheel rotation counting and distance/speed estimation
//! - Ambient temperature monitoring with fault sentinels
//! - Parsing of the tab-separated serial power telemetry stream
//! - Projection of GPS coordinates onto the map surface
//! - Background workers for blocking sensors, handing off through single-slot mailboxes
//! - A cooperative multi-cadence scheduler that owns the dashboard snapshot
//!
//! ## Example
//!
//! ```rust,ignore
//! use solardash_core::prelude::*;
//!
//! let config = DashboardConfig::load("dashboard.json")?;
//! let geo_box = config.validate()?;
//!
//! let scheduler = Scheduler::new(&config, geo_box, inputs, sink, controls, health)?;
//! let scheduler = scheduler.run(cancel).await;
//! println!("{}", scheduler.snapshot().speed_text());
//! ```

pub mod config;
pub mod geo;
pub mod health;
pub mod mailbox;
pub mod render;
pub mod rotation;
pub mod scheduler;
pub mod sensors;
pub mod snapshot;
pub mod speed;
pub mod telemetry;
pub mod thermal;
pub mod unit_conversion;
pub mod video;
pub mod workers;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, DashboardConfig};
    pub use crate::geo::{GeoBox, GeoError, GeoPoint, ScreenPoint, SurfaceDims};
    pub use crate::health::{HealthBoard, HealthReport};
    pub use crate::mailbox::{mailbox, Latest, Publisher};
    pub use crate::render::RenderSink;
    pub use crate::rotation::{DistanceState, RotationState, RotationTracker};
    pub use crate::scheduler::{DashboardControls, Inputs, Scheduler, TaskKind};
    pub use crate::sensors::{
        FrameSource, LineSource, PositionSource, RotationSource, SensorError, TemperatureSource,
    };
    pub use crate::snapshot::{DashboardSnapshot, Stamped};
    pub use crate::speed::{SpeedEstimator, SpeedSample};
    pub use crate::telemetry::{ParseError, TelemetryFrame, TelemetryIngest};
    pub use crate::thermal::{ThermalMonitor, ThermalReading};
    pub use crate::unit_conversion::UnitSystem;
    pub use crate::video::VideoFrame;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
