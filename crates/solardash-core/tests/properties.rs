use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroU64;

use solardash_core::config::{ConfigError, DashboardConfig};
use solardash_core::geo::{project, project_or_origin, GeoBox, GeoError, GeoPoint, ScreenPoint, SurfaceDims};
use solardash_core::rotation::RotationTracker;
use solardash_core::sensors::scripted::Scripted;
use solardash_core::speed::{speed_kmph, SpeedEstimator, SpeedSample};
use solardash_core::telemetry::{ParseError, TelemetryIngest};
use solardash_core::thermal::{ThermalMonitor, ThermalReading};
use solardash_core::unit_conversion::UnitSystem;

const CIRCUMFERENCE_M: f64 = 2.153412;

fn falling_edges(levels: &[bool], active: bool) -> u64 {
    let mut previous = active;
    let mut edges = 0;
    for &level in levels {
        if previous == active && level != active {
            edges += 1;
        }
        previous = level;
    }
    edges
}

#[test]
fn test_count_matches_falling_edges() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let active = rng.gen_bool(0.5);
        let levels: Vec<bool> = (0..500).map(|_| rng.gen_bool(0.3)).collect();

        let mut tracker = RotationTracker::new(CIRCUMFERENCE_M, active);
        let mut last_count = 0;
        for &level in &levels {
            let state = tracker.tick(level);
            assert!(state.count >= last_count, "count went backwards");
            last_count = state.count;
        }

        assert_eq!(tracker.state().count, falling_edges(&levels, active));
        assert_eq!(
            tracker.distance().cumulative_distance_m,
            tracker.state().count as f64 * CIRCUMFERENCE_M
        );
    }
}

#[test]
fn test_speed_formula() {
    let window = NonZeroU64::new(1000).unwrap();
    for delta_m in [0.0, 2.153412, 10.0, 123.4] {
        let expected = (delta_m / 1000.0) * 3_600_000.0 / 1000.0;
        assert!((speed_kmph(delta_m, window) - expected).abs() < 1e-9);
    }

    let window = NonZeroU64::new(250).unwrap();
    assert!((speed_kmph(5.0, window) - 72.0).abs() < 1e-9);
}

#[test]
fn test_imperial_speed_divides_by_1_61() {
    let kmph = 48.3;
    let mph = SpeedSample::metric(kmph).in_unit(UnitSystem::Imperial);
    assert_eq!(mph.unit, UnitSystem::Imperial);
    assert!((mph.value - kmph / 1.61).abs() < 1e-9);
    assert!((mph.kmph() - kmph).abs() < 1e-9);
}

#[test]
fn test_speed_uses_window_delta_only() {
    let mut tracker = RotationTracker::new(CIRCUMFERENCE_M, true);
    let mut estimator = SpeedEstimator::new(NonZeroU64::new(1000).unwrap());

    for level in [false, true, false, true, false] {
        tracker.tick(level);
    }
    let first = estimator.tick(&tracker.close_window());
    assert!((first.value - speed_kmph(3.0 * CIRCUMFERENCE_M, estimator.window_ms())).abs() < 1e-9);

    tracker.tick(true);
    tracker.tick(false);
    let second = estimator.tick(&tracker.close_window());
    assert!((second.value - speed_kmph(CIRCUMFERENCE_M, estimator.window_ms())).abs() < 1e-9);

    let idle = estimator.tick(&tracker.close_window());
    assert_eq!(idle.value, 0.0);
}

#[test]
fn test_voltage_scaled_for_display() {
    let mut ingest = TelemetryIngest::default();
    ingest.ingest("V\t12000").unwrap();
    assert_eq!(ingest.display_string(), "V: 12.0 | I: NA | PPV: NA | ");
}

#[test]
fn test_unknown_tag_leaves_frame_unchanged() {
    let mut ingest = TelemetryIngest::default();
    ingest.ingest("V\t12000").unwrap();
    let before = ingest.frame().clone();

    let record = ingest.ingest("X\t5").unwrap();
    assert!(!record.stored);
    assert_eq!(ingest.frame(), &before);
}

#[test]
fn test_malformed_line_leaves_frame_unchanged() {
    let mut ingest = TelemetryIngest::default();
    ingest.ingest("I\t350").unwrap();
    let before = ingest.frame().clone();

    assert_eq!(
        ingest.ingest("no-separator-here"),
        Err(ParseError::MalformedFrame("no-separator-here".to_string()))
    );
    assert!(matches!(ingest.ingest("A\tB\tC"), Err(ParseError::MalformedFrame(_))));
    assert_eq!(ingest.frame(), &before);
}

fn track_box() -> GeoBox {
    DashboardConfig::default().validate().unwrap()
}

#[test]
fn test_projection_corners() {
    let geo_box = track_box();
    let dims = SurfaceDims::new(640.0, 480.0);

    assert_eq!(project(geo_box.min(), &geo_box, dims).unwrap(), ScreenPoint { x: 0.0, y: 0.0 });
    assert_eq!(
        project(geo_box.max(), &geo_box, dims).unwrap(),
        ScreenPoint { x: 640.0, y: 480.0 }
    );
}

#[test]
fn test_out_of_box_projects_to_origin() {
    let geo_box = track_box();
    let dims = SurfaceDims::new(640.0, 480.0);
    let outside = GeoPoint::new(0.0, 0.0);

    assert!(matches!(
        project(outside, &geo_box, dims),
        Err(GeoError::OutOfBounds { .. })
    ));
    assert_eq!(project_or_origin(outside, &geo_box, dims), ScreenPoint::ORIGIN);
}

#[test]
fn test_inverted_box_fails_construction() {
    assert!(matches!(
        GeoBox::new(42.0, -73.0, 41.0, -72.0),
        Err(GeoError::InvertedBox { .. })
    ));

    let mut config = DashboardConfig::default();
    config.geo_box.max_lon = config.geo_box.min_lon - 1.0;
    assert!(matches!(config.validate(), Err(ConfigError::Geo(_))));
}

#[test]
fn test_temperature_failure_yields_sentinel() {
    let sensor: Scripted<f64> = Scripted::new([Err("no response".to_string())]);
    let mut monitor = ThermalMonitor::new(sensor);

    let reading = monitor.tick();
    assert_eq!(
        reading,
        ThermalReading {
            celsius: -1.0,
            fahrenheit: -1.0,
            valid: false
        }
    );
}
