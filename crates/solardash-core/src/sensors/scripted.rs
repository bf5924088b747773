//! Scripted sources for tests
//!
//! A [`Scripted`] source replays a fixed list of results, then keeps
//! returning the last successful value. A shared [`FailSwitch`] forces every
//! read to fail while it is on, which makes each fault path triggerable
//! independently of the script.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{
    FrameSource, LineSource, PositionSource, RotationSource, SensorError, TemperatureSource,
};
use crate::geo::GeoPoint;
use crate::video::VideoFrame;

/// Shared on/off switch that makes a scripted source fail
#[derive(Debug, Clone, Default)]
pub struct FailSwitch(Arc<AtomicBool>);

impl FailSwitch {
    /// Create a switch in the "off" position
    pub fn new() -> Self {
        Self::default()
    }

    /// Start failing reads
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Stop failing reads
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether reads currently fail
    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A source that replays scripted results
#[derive(Debug)]
pub struct Scripted<T> {
    script: VecDeque<Result<T, String>>,
    last: Option<T>,
    delay: Duration,
    fail: FailSwitch,
    reads: Arc<AtomicUsize>,
}

impl<T: Clone> Scripted<T> {
    /// Create a source from a list of results (`Err` entries become faults)
    pub fn new(script: impl IntoIterator<Item = Result<T, String>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            delay: Duration::ZERO,
            fail: FailSwitch::new(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a source from plain values
    pub fn values(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(values.into_iter().map(Ok))
    }

    /// Make every read take at least `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Switch that forces reads to fail
    pub fn fail_switch(&self) -> FailSwitch {
        self.fail.clone()
    }

    /// Shared counter of reads performed
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }

    fn next(&mut self) -> Result<T, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.fail.is_tripped() {
            return Err(SensorError::Fault("scripted fault".to_string()));
        }
        match self.script.pop_front() {
            Some(Ok(value)) => {
                self.last = Some(value.clone());
                Ok(value)
            }
            Some(Err(reason)) => Err(SensorError::Fault(reason)),
            None => self
                .last
                .clone()
                .ok_or_else(|| SensorError::Unavailable("script is empty".to_string())),
        }
    }
}

impl RotationSource for Scripted<bool> {
    fn read_level(&mut self) -> Result<bool, SensorError> {
        self.next()
    }
}

impl TemperatureSource for Scripted<f64> {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        self.next()
    }
}

impl LineSource for Scripted<String> {
    fn read_line(&mut self) -> Result<String, SensorError> {
        self.next()
    }
}

impl FrameSource for Scripted<VideoFrame> {
    fn capture(&mut self) -> Result<VideoFrame, SensorError> {
        self.next()
    }
}

impl PositionSource for Scripted<GeoPoint> {
    fn read_position(&mut self) -> Result<GeoPoint, SensorError> {
        self.next()
    }
}
