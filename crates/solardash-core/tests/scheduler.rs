use pretty_assertions::assert_eq;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use solardash_core::config::DashboardConfig;
use solardash_core::geo::{GeoPoint, ScreenPoint, SurfaceDims};
use solardash_core::health::HealthBoard;
use solardash_core::mailbox::{mailbox, Publisher};
use solardash_core::render::RenderSink;
use solardash_core::scheduler::{DashboardControls, Inputs, Scheduler, TaskKind};
use solardash_core::sensors::scripted::{FailSwitch, Scripted};
use solardash_core::snapshot::DashboardSnapshot;
use solardash_core::speed::speed_kmph;
use solardash_core::telemetry::{TelemetryFrame, TelemetryIngest};
use solardash_core::thermal::ThermalReading;
use solardash_core::unit_conversion::UnitSystem;
use solardash_core::video::{PixelFormat, VideoFrame};

/// Sink that remembers what it was asked to draw
struct RecordingSink {
    dims: SurfaceDims,
    redraws: usize,
    lines: Vec<String>,
}

impl RecordingSink {
    fn new(width: f64, height: f64) -> Self {
        Self {
            dims: SurfaceDims::new(width, height),
            redraws: 0,
            lines: Vec::new(),
        }
    }
}

impl RenderSink for RecordingSink {
    fn surface_dims(&self) -> SurfaceDims {
        self.dims
    }

    fn redraw(&mut self, snapshot: &DashboardSnapshot) {
        self.redraws += 1;
        self.lines = snapshot.lines();
    }
}

/// Everything a test needs to poke at a running scheduler
struct Rig {
    scheduler: Scheduler<RecordingSink>,
    controls: DashboardControls,
    health: HealthBoard,
    rotation_fault: FailSwitch,
    thermal: Publisher<ThermalReading>,
    telemetry: Publisher<TelemetryFrame>,
    video: Publisher<Arc<VideoFrame>>,
}

fn rig_with(config: DashboardConfig, levels: Vec<bool>, positions: Vec<GeoPoint>) -> Rig {
    let geo_box = config.validate().unwrap();
    let rotation = Scripted::values(levels);
    let rotation_fault = rotation.fail_switch();
    let (thermal, thermal_rx) = mailbox();
    let (telemetry, telemetry_rx) = mailbox();
    let (video, video_rx) = mailbox();
    let controls = DashboardControls::new(config.units.system());
    let health = HealthBoard::new(3);

    let inputs = Inputs {
        rotation: Box::new(rotation),
        position: Box::new(Scripted::values(positions)),
        thermal: thermal_rx,
        telemetry: telemetry_rx,
        video: video_rx,
    };
    let scheduler = Scheduler::new(
        &config,
        geo_box,
        inputs,
        RecordingSink::new(200.0, 100.0),
        controls.clone(),
        health.clone(),
    )
    .unwrap();

    Rig {
        scheduler,
        controls,
        health,
        rotation_fault,
        thermal,
        telemetry,
        video,
    }
}

fn rig(levels: Vec<bool>) -> Rig {
    let config = DashboardConfig::default();
    let center = GeoPoint::new(41.7254, -73.4781);
    rig_with(config, levels, vec![center])
}

/// Levels producing `n` falling edges on ticks 1, 3, 5, ...
fn pulses(n: usize) -> Vec<bool> {
    let mut levels = vec![true];
    for _ in 0..n {
        levels.push(false);
        levels.push(true);
    }
    levels
}

fn run_until(scheduler: &mut Scheduler<RecordingSink>, from_ms: u64, to_ms: u64) {
    for ms in from_ms..=to_ms {
        scheduler.run_due(Duration::from_millis(ms));
    }
}

#[test]
fn test_speed_over_first_window() {
    let mut rig = rig(pulses(5));
    run_until(&mut rig.scheduler, 0, 1000);

    let snapshot = rig.scheduler.snapshot();
    let expected = speed_kmph(5.0 * 2.153412, NonZeroU64::new(1000).unwrap());
    assert_eq!(rig.scheduler.tracker().state().count, 5);
    assert!((snapshot.speed.value.value - expected).abs() < 1e-9);
    assert_eq!(snapshot.distance.value, "Distance: 0.011 km");
}

#[test]
fn test_speed_drops_to_zero_when_wheel_stops() {
    let mut rig = rig(pulses(3));
    run_until(&mut rig.scheduler, 0, 2000);
    assert_eq!(rig.scheduler.snapshot().speed.value.value, 0.0);
    assert_eq!(rig.scheduler.snapshot().speed_text(), "Speed: 0.00 kmph");
}

#[test]
fn test_fields_carry_their_own_stamps() {
    let mut rig = rig(pulses(2));
    rig.scheduler.run_due(Duration::ZERO);

    let snapshot = rig.scheduler.snapshot();
    assert!(!snapshot.speed_and_distance_consistent());
    let speed_seq = snapshot.speed.seq;
    let distance_seq = snapshot.distance.seq;

    assert_eq!(rig.scheduler.run_due(Duration::from_millis(1)), vec![TaskKind::Rotation]);
    let snapshot = rig.scheduler.snapshot();
    assert_eq!(snapshot.speed.seq, speed_seq);
    assert!(snapshot.distance.seq > distance_seq);
}

#[test]
fn test_unit_toggle_rerenders_readouts() {
    let mut rig = rig(pulses(5));
    run_until(&mut rig.scheduler, 0, 1000);
    let kmph = rig.scheduler.snapshot().speed.value.kmph();

    assert_eq!(rig.controls.toggle_units(), UnitSystem::Imperial);
    rig.scheduler.run_due(Duration::from_millis(1001));

    let snapshot = rig.scheduler.snapshot();
    assert_eq!(snapshot.speed.value.unit, UnitSystem::Imperial);
    assert!((snapshot.speed.value.value - kmph / 1.61).abs() < 1e-9);
    assert!(snapshot.distance.value.ends_with(" mil"));
    assert!(snapshot.speed_text().ends_with(" mph"));
}

#[test]
fn test_reset_zeroes_trip() {
    let mut rig = rig(pulses(4));
    run_until(&mut rig.scheduler, 0, 1500);
    assert_eq!(rig.scheduler.tracker().state().count, 4);

    rig.controls.request_reset();
    rig.scheduler.run_due(Duration::from_millis(1501));

    let snapshot = rig.scheduler.snapshot();
    assert_eq!(rig.scheduler.tracker().state().count, 0);
    assert_eq!(snapshot.distance.value, "Distance: 0.000 km");
    assert_eq!(snapshot.speed_text(), "Speed: 0.00 kmph");
    assert_eq!(snapshot.elapsed.value, "Time: 0.00 min");

    // Elapsed time counts from the reset
    run_until(&mut rig.scheduler, 1502, 31501);
    assert_eq!(rig.scheduler.snapshot().elapsed.value, "Time: 0.50 min");
}

#[test]
fn test_rotation_faults_raise_alert() {
    let mut rig = rig(pulses(2));
    rig.rotation_fault.trip();
    run_until(&mut rig.scheduler, 0, 500);

    assert_eq!(rig.scheduler.tracker().state().count, 0);
    let report = &rig.scheduler.snapshot().health.value;
    assert_eq!(report.alerting().collect::<Vec<_>>(), vec!["rotation"]);

    rig.rotation_fault.clear();
    run_until(&mut rig.scheduler, 501, 510);
    assert!(rig.health.report().alerting().next().is_none());
    assert!(rig.scheduler.tracker().state().count > 0);
}

#[test]
fn test_thermal_reading_and_fault_sentinel() {
    let mut rig = rig(pulses(0));
    rig.thermal.publish(ThermalReading::from_celsius(21.5));
    rig.scheduler.run_due(Duration::ZERO);
    assert_eq!(rig.scheduler.snapshot().temperature_text(), "Temp: 21.50 C | 70.70 F");

    rig.thermal.publish(ThermalReading::FAULT);
    run_until(&mut rig.scheduler, 1, 1000);
    assert_eq!(rig.scheduler.snapshot().temperature_text(), "Temp: -1.00 C | -1.00 F");
}

#[test]
fn test_stale_thermal_keeps_last_value() {
    let mut rig = rig(pulses(0));
    rig.thermal.publish(ThermalReading::from_celsius(30.0));
    rig.scheduler.run_due(Duration::ZERO);
    let seq = rig.scheduler.snapshot().thermal.seq;

    run_until(&mut rig.scheduler, 1, 1000);
    assert_eq!(rig.scheduler.snapshot().thermal.seq, seq);
    assert!(rig.scheduler.snapshot().thermal.value.valid);
}

#[test]
fn test_telemetry_frame_displayed() {
    let mut rig = rig(pulses(0));
    assert_eq!(rig.scheduler.snapshot().telemetry.value, "V: NA | I: NA | PPV: NA | ");

    let mut ingest = TelemetryIngest::default();
    ingest.ingest("V\t12000").unwrap();
    ingest.ingest("PPV\t45").unwrap();
    rig.telemetry.publish(ingest.frame().clone());

    rig.scheduler.run_due(Duration::ZERO);
    assert_eq!(rig.scheduler.snapshot().telemetry.value, "V: 12.0 | I: NA | PPV: 45 | ");
}

#[test]
fn test_failed_capture_keeps_previous_frame() {
    let mut rig = rig(pulses(0));
    let frame = Arc::new(VideoFrame::new(2, 1, PixelFormat::Bgr8, vec![1, 2, 3, 4, 5, 6]).unwrap());
    rig.video.publish(Arc::clone(&frame));

    rig.scheduler.run_due(Duration::ZERO);
    let seq = rig.scheduler.snapshot().video.seq;
    run_until(&mut rig.scheduler, 1, 50);

    let video = &rig.scheduler.snapshot().video;
    assert_eq!(video.seq, seq);
    assert!(Arc::ptr_eq(video.value.as_ref().unwrap(), &frame));
}

#[test]
fn test_position_projection_and_out_of_bounds() {
    let config = DashboardConfig::default();
    let max = config.geo_box.build().unwrap().max();
    let mut rig = rig_with(config, pulses(0), vec![max, GeoPoint::new(0.0, 0.0)]);

    rig.scheduler.run_due(Duration::ZERO);
    assert_eq!(rig.scheduler.snapshot().position.value, ScreenPoint { x: 200.0, y: 100.0 });

    run_until(&mut rig.scheduler, 1, 1000);
    assert_eq!(rig.scheduler.snapshot().position.value, ScreenPoint::ORIGIN);
}

#[test]
fn test_redraw_only_when_display_changes() {
    let mut config = DashboardConfig::default();
    config.cadence.rotation_ms = 1000;
    config.cadence.video_ms = 1000;
    config.cadence.clock_ms = 1000;
    let center = GeoPoint::new(41.7254, -73.4781);
    let mut rig = rig_with(config, pulses(0), vec![center]);

    assert_eq!(rig.scheduler.tick_period(), Duration::from_millis(200));
    rig.scheduler.run_due(Duration::ZERO);
    assert_eq!(rig.scheduler.sink().redraws, 1);
    assert_eq!(rig.scheduler.sink().lines[0], "Speed: 0.00 kmph");

    assert_eq!(
        rig.scheduler.run_due(Duration::from_millis(200)),
        vec![TaskKind::TelemetryIngest]
    );
    assert_eq!(rig.scheduler.sink().redraws, 1);

    assert!(rig.scheduler.run_due(Duration::from_millis(300)).is_empty());
    rig.scheduler.run_due(Duration::from_millis(1000));
    assert_eq!(rig.scheduler.sink().redraws, 2);
}

#[test]
fn test_imperial_start() {
    let mut config = DashboardConfig::default();
    config.units.imperial = true;
    let center = GeoPoint::new(41.7254, -73.4781);
    let mut rig = rig_with(config, pulses(0), vec![center]);

    rig.scheduler.run_due(Duration::ZERO);
    assert_eq!(rig.scheduler.snapshot().speed_text(), "Speed: 0.000 mph");
    assert_eq!(rig.scheduler.snapshot().distance.value, "Distance: 0.000 mil");
}

#[tokio::test(start_paused = true)]
async fn test_run_until_cancelled() {
    let rig = rig(pulses(3));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(rig.scheduler.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(2100)).await;
    cancel.cancel();
    let scheduler = handle.await.unwrap();

    assert_eq!(scheduler.tracker().state().count, 3);
    assert!(scheduler.snapshot().elapsed.seq > 0);
    assert_eq!(scheduler.snapshot().elapsed.value, "Time: 0.03 min");
    assert!(scheduler.sink().redraws > 0);
}
