//! Sensor source selection and worker startup

use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use solardash_core::config::{DashboardConfig, SourceMode};
use solardash_core::geo::GeoBox;
use solardash_core::health::HealthBoard;
use solardash_core::mailbox::mailbox;
use solardash_core::scheduler::{Inputs, TaskKind};
use solardash_core::sensors::hardware::{IioTemperature, SysfsGpio};
use solardash_core::sensors::simulated::{
    RandomPosition, SimulatedCamera, SimulatedTelemetry, SimulatedTemperature, SimulatedWheel,
};
use solardash_core::sensors::{LineSource, RotationSource, TemperatureSource, Timed};
use solardash_core::telemetry::{SerialLineSource, TelemetryFrame, TelemetryIngest};
use solardash_core::thermal::ThermalMonitor;
use solardash_core::workers::{spawn_camera, spawn_telemetry, spawn_thermal, WorkerSet};

/// Resolution of the simulated camera feed
const CAMERA_WIDTH: u32 = 640;
const CAMERA_HEIGHT: u32 = 480;

/// Starting temperature of the simulated sensor
const SIMULATED_AMBIENT_C: f64 = 21.0;

/// Interval between simulated charge controller blocks
const SIMULATED_BLOCK_INTERVAL: Duration = Duration::from_secs(1);

struct Devices {
    rotation: Box<dyn RotationSource>,
    temperature: Box<dyn TemperatureSource>,
    link: Box<dyn LineSource>,
    camera: Option<SimulatedCamera>,
}

/// The test pattern camera, only for simulated runs
///
/// No capture driver is bundled, so hardware runs have no camera feed
/// rather than a fake one.
fn camera_for(mode: SourceMode) -> Option<SimulatedCamera> {
    match mode {
        SourceMode::Simulated => Some(SimulatedCamera::new(CAMERA_WIDTH, CAMERA_HEIGHT)),
        SourceMode::Hardware => None,
    }
}

fn open_devices(config: &DashboardConfig) -> Result<Devices> {
    match config.source.mode {
        SourceMode::Hardware => {
            let pin = config.source.gpio_pin;
            let gpio = SysfsGpio::open(pin)
                .with_context(|| format!("Failed to configure GPIO line {} as input", pin))?;
            let link = SerialLineSource::open(
                &config.serial.port,
                config.serial.baud_rate,
                config.serial.read_timeout(),
            )
            .with_context(|| format!("Failed to open serial port {}", config.serial.port))?;
            info!(
                "Using hardware sources (GPIO {}, {}, {})",
                pin,
                config.serial.port,
                config.source.temperature_path.display()
            );

            Ok(Devices {
                rotation: Box::new(gpio),
                temperature: Box::new(IioTemperature::new(&config.source.temperature_path)),
                link: Box::new(link),
                camera: camera_for(SourceMode::Hardware),
            })
        }
        SourceMode::Simulated => {
            info!(
                "Using simulated sources ({:.1} km/h)",
                config.source.simulated_speed_kmph
            );
            Ok(Devices {
                rotation: Box::new(SimulatedWheel::new(
                    config.source.simulated_speed_kmph,
                    config.vehicle.wheel_circumference_m,
                    config.vehicle.rotation_active_level,
                )),
                temperature: Box::new(SimulatedTemperature::new(SIMULATED_AMBIENT_C)),
                link: Box::new(SimulatedTelemetry::new(SIMULATED_BLOCK_INTERVAL)),
                camera: camera_for(SourceMode::Simulated),
            })
        }
    }
}

/// Open the configured sources and start a worker for each blocking one
///
/// Workers are cancelled through child tokens of `cancel`.
pub fn start(
    config: &DashboardConfig,
    geo_box: GeoBox,
    health: &HealthBoard,
    cancel: &CancellationToken,
) -> Result<(Inputs, WorkerSet)> {
    let devices = open_devices(config)?;
    let timeout = config.io.sensor_timeout();

    let (thermal_tx, thermal) = mailbox();
    let (telemetry_tx, telemetry) = mailbox();
    let (video_tx, video) = mailbox();
    let mut workers = WorkerSet::new();

    let monitor = ThermalMonitor::new(Timed::new("temperature", devices.temperature, timeout));
    workers.push(
        spawn_thermal(
            monitor,
            config.cadence.period(TaskKind::Thermal),
            thermal_tx,
            health.source("temperature"),
            cancel.child_token(),
        )
        .context("Failed to start thermal worker")?,
    );

    let ingest = TelemetryIngest::new(
        TelemetryFrame::new(config.serial.channels.iter().cloned()),
        config.serial.scale(),
    );
    workers.push(
        spawn_telemetry(
            devices.link,
            ingest,
            config.cadence.period(TaskKind::TelemetryIngest),
            telemetry_tx,
            health.source("telemetry"),
            cancel.child_token(),
        )
        .context("Failed to start telemetry worker")?,
    );

    match devices.camera {
        Some(camera) => workers.push(
            spawn_camera(
                Timed::new("camera", camera, timeout),
                config.cadence.period(TaskKind::Video),
                video_tx,
                health.source("camera"),
                cancel.child_token(),
            )
            .context("Failed to start camera worker")?,
        ),
        None => warn!("No capture driver available, camera feed disabled"),
    }

    let inputs = Inputs {
        rotation: devices.rotation,
        position: Box::new(RandomPosition::new(geo_box)),
        thermal,
        telemetry,
        video,
    };
    Ok((inputs, workers))
}
