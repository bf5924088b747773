//! Cooperative scheduler
//!
//! A single loop that runs every task on its own fixed period and merges the
//! results into the [`DashboardSnapshot`]. Tasks never run concurrently and
//! never block on I/O: blocking sources run on background workers and the
//! scheduler only picks up the latest value they published.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, DashboardConfig};
use crate::geo::{project_or_origin, GeoBox};
use crate::health::{HealthBoard, SourceHealth};
use crate::mailbox::Latest;
use crate::render::RenderSink;
use crate::rotation::RotationTracker;
use crate::sensors::{PositionSource, RotationSource};
use crate::snapshot::{format_distance, format_elapsed, DashboardSnapshot};
use crate::speed::SpeedEstimator;
use crate::telemetry::{ChannelScale, TelemetryFrame};
use crate::thermal::ThermalReading;
use crate::unit_conversion::UnitSystem;
use crate::video::VideoFrame;

/// Scheduled task kinds, in the order they run within one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Poll the wheel sensor and update the distance readout
    Rotation,
    /// Close the speed window
    Speed,
    /// Pick up the latest temperature reading
    Thermal,
    /// Pick up the latest telemetry frame
    TelemetryIngest,
    /// Format the telemetry readout
    TelemetryDisplay,
    /// Update the elapsed time and health readouts
    Clock,
    /// Pick up the latest camera frame
    Video,
    /// Read and project the vehicle position
    Position,
}

impl TaskKind {
    /// Every task kind, in run order
    pub const ALL: [TaskKind; 8] = [
        TaskKind::Rotation,
        TaskKind::Speed,
        TaskKind::Thermal,
        TaskKind::TelemetryIngest,
        TaskKind::TelemetryDisplay,
        TaskKind::Clock,
        TaskKind::Video,
        TaskKind::Position,
    ];

    /// Whether running this task changes what is on screen
    pub fn affects_display(self) -> bool {
        !matches!(self, TaskKind::TelemetryIngest)
    }
}

#[derive(Debug, Default)]
struct ControlFlags {
    imperial: AtomicBool,
    reset: AtomicBool,
}

/// Switches the UI may flip while the scheduler runs
#[derive(Debug, Clone, Default)]
pub struct DashboardControls {
    flags: Arc<ControlFlags>,
}

impl DashboardControls {
    /// Create controls starting in `unit`
    pub fn new(unit: UnitSystem) -> Self {
        let controls = Self::default();
        controls.set_units(unit);
        controls
    }

    /// Currently selected unit system
    pub fn units(&self) -> UnitSystem {
        if self.flags.imperial.load(Ordering::SeqCst) {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }

    /// Select a unit system
    pub fn set_units(&self, unit: UnitSystem) {
        self.flags
            .imperial
            .store(unit == UnitSystem::Imperial, Ordering::SeqCst);
    }

    /// Flip between metric and imperial; returns the new selection
    pub fn toggle_units(&self) -> UnitSystem {
        let was_imperial = self.flags.imperial.fetch_xor(true, Ordering::SeqCst);
        if was_imperial {
            UnitSystem::Metric
        } else {
            UnitSystem::Imperial
        }
    }

    /// Ask the scheduler to zero distance, speed and elapsed time
    pub fn request_reset(&self) {
        self.flags.reset.store(true, Ordering::SeqCst);
    }

    fn take_reset(&self) -> bool {
        self.flags.reset.swap(false, Ordering::SeqCst)
    }
}

/// Sources the scheduler reads from
pub struct Inputs {
    /// Wheel sensor, polled in-loop (a GPIO read does not block)
    pub rotation: Box<dyn RotationSource>,
    /// Position provider, polled in-loop
    pub position: Box<dyn PositionSource>,
    /// Published by the thermal worker
    pub thermal: Latest<ThermalReading>,
    /// Published by the telemetry worker
    pub telemetry: Latest<TelemetryFrame>,
    /// Published by the camera worker
    pub video: Latest<Arc<VideoFrame>>,
}

#[derive(Debug, Clone)]
struct Cadence {
    kind: TaskKind,
    period: Duration,
    next_due: Duration,
}

/// Multi-cadence scheduler owning the dashboard state
pub struct Scheduler<R> {
    cadences: Vec<Cadence>,
    tracker: RotationTracker,
    estimator: SpeedEstimator,
    telemetry: TelemetryFrame,
    scale: Option<ChannelScale>,
    geo_box: GeoBox,
    inputs: Inputs,
    controls: DashboardControls,
    units: UnitSystem,
    health: HealthBoard,
    rotation_health: Arc<SourceHealth>,
    position_health: Arc<SourceHealth>,
    snapshot: DashboardSnapshot,
    sink: R,
    seq: u64,
    epoch: Duration,
}

impl<R: RenderSink> Scheduler<R> {
    /// Build a scheduler with every task due immediately
    ///
    /// Taking a [`GeoBox`] means the configuration has already been
    /// validated; see [`DashboardConfig::validate`].
    pub fn new(
        config: &DashboardConfig,
        geo_box: GeoBox,
        inputs: Inputs,
        sink: R,
        controls: DashboardControls,
        health: HealthBoard,
    ) -> Result<Self, ConfigError> {
        let mut cadences = Vec::with_capacity(TaskKind::ALL.len());
        for kind in TaskKind::ALL {
            let period = config.cadence.period(kind);
            if period.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "cadence for {kind:?} must be > 0 ms"
                )));
            }
            cadences.push(Cadence {
                kind,
                period,
                next_due: Duration::ZERO,
            });
        }

        let tracker = RotationTracker::new(
            config.vehicle.wheel_circumference_m,
            config.vehicle.rotation_active_level,
        )
        .with_debounce(Duration::from_millis(config.vehicle.debounce_ms));
        let estimator = SpeedEstimator::new(config.cadence.speed_window()?);
        let telemetry = TelemetryFrame::new(config.serial.channels.iter().cloned());
        let scale = config.serial.scale();
        let units = controls.units();
        let snapshot = DashboardSnapshot::new(units, telemetry.display_string(scale.as_ref()));

        Ok(Self {
            cadences,
            tracker,
            estimator,
            telemetry,
            scale,
            geo_box,
            inputs,
            rotation_health: health.source("rotation"),
            position_health: health.source("position"),
            health,
            controls,
            units,
            snapshot,
            sink,
            seq: 0,
            epoch: Duration::ZERO,
        })
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> &DashboardSnapshot {
        &self.snapshot
    }

    /// Handle for flipping units or requesting a reset
    pub fn controls(&self) -> DashboardControls {
        self.controls.clone()
    }

    /// Rotation tracker state
    pub fn tracker(&self) -> &RotationTracker {
        &self.tracker
    }

    /// The rendering sink
    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// Number of task invocations so far
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Period of `kind`
    pub fn period(&self, kind: TaskKind) -> Option<Duration> {
        self.cadences.iter().find(|c| c.kind == kind).map(|c| c.period)
    }

    /// Loop period: the greatest common divisor of all task periods
    pub fn tick_period(&self) -> Duration {
        let ms = self
            .cadences
            .iter()
            .map(|c| c.period.as_millis() as u64)
            .fold(0, gcd);
        Duration::from_millis(ms.max(1))
    }

    /// Run every task that is due at `now` (time since the scheduler started)
    ///
    /// Returns the tasks that ran, in run order. The sink is notified once
    /// if any of them affects the display.
    pub fn run_due(&mut self, now: Duration) -> Vec<TaskKind> {
        let mut display_changed = false;

        if self.controls.take_reset() {
            self.reset(now);
            display_changed = true;
        }

        let units = self.controls.units();
        if units != self.units {
            self.apply_units(units);
            display_changed = true;
        }

        let mut ran = Vec::new();
        for i in 0..self.cadences.len() {
            let cadence = &mut self.cadences[i];
            if now < cadence.next_due {
                continue;
            }
            cadence.next_due = now + cadence.period;
            let kind = cadence.kind;

            self.seq += 1;
            self.run_task(kind, now);
            display_changed |= kind.affects_display();
            ran.push(kind);
        }

        if display_changed {
            self.sink.redraw(&self.snapshot);
        }
        ran
    }

    fn run_task(&mut self, kind: TaskKind, now: Duration) {
        let seq = self.seq;
        match kind {
            TaskKind::Rotation => match self.inputs.rotation.read_level() {
                Ok(level) => {
                    self.rotation_health.record_ok();
                    self.tracker.tick_at(level, now);
                    let distance_m = self.tracker.distance().cumulative_distance_m;
                    self.snapshot
                        .distance
                        .set(format_distance(distance_m, self.units), seq);
                }
                Err(e) => report_fault(&self.rotation_health, "Rotation sensor", &e),
            },
            TaskKind::Speed => {
                let window = self.tracker.close_window();
                let sample = self.estimator.tick(&window);
                debug!(
                    "Speed window: {:.3} m -> {:.2} km/h",
                    window.window_delta_m(),
                    sample.value
                );
                self.snapshot.speed.set(sample.in_unit(self.units), seq);
            }
            TaskKind::Thermal => {
                if let Some(reading) = self.inputs.thermal.take_fresh() {
                    self.snapshot.thermal.set(reading, seq);
                }
            }
            TaskKind::TelemetryIngest => {
                if let Some(frame) = self.inputs.telemetry.take_fresh() {
                    self.telemetry = frame;
                }
            }
            TaskKind::TelemetryDisplay => {
                let text = self.telemetry.display_string(self.scale.as_ref());
                self.snapshot.telemetry.set(text, seq);
            }
            TaskKind::Clock => {
                let elapsed = now.saturating_sub(self.epoch);
                self.snapshot.elapsed.set(format_elapsed(elapsed), seq);
                self.snapshot.health.set(self.health.report(), seq);
            }
            TaskKind::Video => {
                if let Some(frame) = self.inputs.video.take_fresh() {
                    self.snapshot.video.set(Some(frame), seq);
                }
            }
            TaskKind::Position => match self.inputs.position.read_position() {
                Ok(point) => {
                    self.position_health.record_ok();
                    let dims = self.sink.surface_dims();
                    let screen = project_or_origin(point, &self.geo_box, dims);
                    self.snapshot.position.set(screen, seq);
                }
                Err(e) => report_fault(&self.position_health, "Position source", &e),
            },
        }
    }

    fn apply_units(&mut self, units: UnitSystem) {
        self.units = units;
        self.seq += 1;
        let seq = self.seq;
        let speed = self.snapshot.speed.value.in_unit(units);
        self.snapshot.speed.set(speed, seq);
        let distance_m = self.tracker.distance().cumulative_distance_m;
        self.snapshot.distance.set(format_distance(distance_m, units), seq);
    }

    fn reset(&mut self, now: Duration) {
        info!("Resetting distance, speed and elapsed time");
        self.tracker.reset();
        self.estimator.reset();
        self.epoch = now;
        self.seq += 1;
        let seq = self.seq;
        self.snapshot.started_at = Utc::now();
        self.snapshot
            .speed
            .set(self.estimator.last().in_unit(self.units), seq);
        self.snapshot.distance.set(format_distance(0.0, self.units), seq);
        self.snapshot.elapsed.set(format_elapsed(Duration::ZERO), seq);
    }

    /// Drive the scheduler until `cancel` fires, then hand it back
    pub async fn run(mut self, cancel: CancellationToken) -> Self {
        let period = self.tick_period();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let start = Instant::now();
        info!("Scheduler started, loop period {:?}", period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_due(start.elapsed());
                }
            }
        }

        info!("Scheduler stopped after {} task runs", self.seq);
        self
    }
}

fn report_fault(health: &SourceHealth, what: &str, error: &crate::sensors::SensorError) {
    if health.consecutive_faults() == 0 {
        warn!("{what} failure: {error}");
    } else {
        debug!("{what} failure: {error}");
    }
    health.record_fault();
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
