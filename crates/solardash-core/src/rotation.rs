//! Wheel rotation tracking
//!
//! Counts falling edges of the wheel sensor level and derives the distance
//! covered from the wheel circumference.
//!
//! The edge rule is deliberately simple: a rotation is counted whenever the
//! previous level was the active level and the current one is not. There is
//! no hysteresis, so a sensor that bounces faster than the polling cadence
//! can double count. An optional debounce interval suppresses edges that
//! arrive too soon after the last counted one; it is disabled by default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rotation counter state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Number of counted rotations (never decreases until reset)
    pub count: u64,
    /// Sensor level seen on the previous tick
    pub previous_level: bool,
}

/// Distance covered, in metres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistanceState {
    /// Total distance since start (or last reset)
    pub cumulative_distance_m: f64,
    /// Cumulative distance at the start of the current speed window
    pub previous_distance_m: f64,
}

impl DistanceState {
    /// Distance covered during the current speed window
    pub fn window_delta_m(&self) -> f64 {
        self.cumulative_distance_m - self.previous_distance_m
    }
}

/// Converts the wheel sensor level stream into a rotation count and distance
#[derive(Debug, Clone)]
pub struct RotationTracker {
    state: RotationState,
    distance: DistanceState,
    active_level: bool,
    circumference_m: f64,
    debounce: Duration,
    last_counted_at: Option<Duration>,
}

impl RotationTracker {
    /// Create a tracker for a wheel with the given circumference
    ///
    /// `active_level` is the level the sensor reports while the magnet (or
    /// contact) is in front of it. The tracker starts as if it had just seen
    /// the active level.
    pub fn new(circumference_m: f64, active_level: bool) -> Self {
        Self {
            state: RotationState {
                count: 0,
                previous_level: active_level,
            },
            distance: DistanceState::default(),
            active_level,
            circumference_m,
            debounce: Duration::ZERO,
            last_counted_at: None,
        }
    }

    /// Set the minimum interval between two counted edges (zero disables)
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Feed one sensor level using the plain edge rule
    pub fn tick(&mut self, level: bool) -> RotationState {
        self.step(level, None)
    }

    /// Feed one sensor level sampled at `now` (time since start)
    ///
    /// Applies the debounce interval when one is configured.
    pub fn tick_at(&mut self, level: bool, now: Duration) -> RotationState {
        self.step(level, Some(now))
    }

    fn step(&mut self, level: bool, now: Option<Duration>) -> RotationState {
        let falling = self.state.previous_level == self.active_level && level != self.active_level;

        if falling && !self.bouncing(now) {
            self.state.count += 1;
            self.last_counted_at = now;
            self.distance.cumulative_distance_m = self.state.count as f64 * self.circumference_m;
        }

        self.state.previous_level = level;
        self.state
    }

    fn bouncing(&self, now: Option<Duration>) -> bool {
        if self.debounce.is_zero() {
            return false;
        }
        match (now, self.last_counted_at) {
            (Some(now), Some(last)) => now.saturating_sub(last) < self.debounce,
            _ => false,
        }
    }

    /// Current counter state
    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Current distance state
    pub fn distance(&self) -> DistanceState {
        self.distance
    }

    /// Close the current speed window
    ///
    /// Returns the distance state as it was over the window, then moves
    /// `previous_distance_m` up to the cumulative distance.
    pub fn close_window(&mut self) -> DistanceState {
        let window = self.distance;
        self.distance.previous_distance_m = self.distance.cumulative_distance_m;
        window
    }

    /// Wheel circumference in metres
    pub fn circumference_m(&self) -> f64 {
        self.circumference_m
    }

    /// Configured debounce interval
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Zero the counter and distance
    pub fn reset(&mut self) {
        self.state = RotationState {
            count: 0,
            previous_level: self.active_level,
        };
        self.distance = DistanceState::default();
        self.last_counted_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_falling_edges_only() {
        let mut tracker = RotationTracker::new(2.0, true);

        // starts "active", so the first low level is a falling edge
        assert_eq!(tracker.tick(false).count, 1);
        assert_eq!(tracker.tick(false).count, 1);
        assert_eq!(tracker.tick(true).count, 1);
        assert_eq!(tracker.tick(true).count, 1);
        assert_eq!(tracker.tick(false).count, 2);
        assert_eq!(tracker.distance().cumulative_distance_m, 4.0);
    }

    #[test]
    fn test_active_low_sensor() {
        let mut tracker = RotationTracker::new(1.5, false);

        tracker.tick(false);
        tracker.tick(true);
        tracker.tick(false);
        let state = tracker.tick(true);

        assert_eq!(state.count, 2);
        assert!(state.previous_level);
    }

    #[test]
    fn test_debounce_suppresses_bounce() {
        let mut tracker = RotationTracker::new(1.0, true).with_debounce(Duration::from_millis(20));

        tracker.tick_at(false, Duration::from_millis(0));
        tracker.tick_at(true, Duration::from_millis(2));
        // bounce 4ms after the counted edge
        tracker.tick_at(false, Duration::from_millis(4));
        assert_eq!(tracker.state().count, 1);

        tracker.tick_at(true, Duration::from_millis(30));
        tracker.tick_at(false, Duration::from_millis(40));
        assert_eq!(tracker.state().count, 2);
    }

    #[test]
    fn test_without_debounce_bounce_double_counts() {
        let mut tracker = RotationTracker::new(1.0, true);

        tracker.tick_at(false, Duration::from_millis(0));
        tracker.tick_at(true, Duration::from_millis(1));
        tracker.tick_at(false, Duration::from_millis(2));

        assert_eq!(tracker.state().count, 2);
    }

    #[test]
    fn test_close_window() {
        let mut tracker = RotationTracker::new(2.5, true);
        tracker.tick(false);
        tracker.tick(true);
        tracker.tick(false);

        let window = tracker.close_window();
        assert_eq!(window.window_delta_m(), 5.0);
        assert_eq!(tracker.distance().window_delta_m(), 0.0);
        assert_eq!(tracker.distance().previous_distance_m, 5.0);
    }

    #[test]
    fn test_reset() {
        let mut tracker = RotationTracker::new(2.0, true);
        tracker.tick(false);
        tracker.close_window();
        tracker.reset();

        assert_eq!(tracker.state().count, 0);
        assert!(tracker.state().previous_level);
        assert_eq!(tracker.distance(), DistanceState::default());
    }
}
