//! Simulated sensors for bench runs without hardware
//!
//! Produces plausible data for every source: a wheel turning at a fixed
//! speed, a slowly drifting temperature with occasional checksum failures,
//! a charge controller streaming `TAG<TAB>VALUE` blocks, random positions
//! inside the track box and a moving test pattern from the camera.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use super::{
    FrameSource, LineSource, PositionSource, RotationSource, SensorError, TemperatureSource,
};
use crate::geo::{GeoBox, GeoPoint};
use crate::video::{PixelFormat, VideoFrame};

/// Fraction of each rotation during which the magnet is over the sensor
const MAGNET_DUTY: f64 = 0.1;

/// Wheel sensor for a vehicle moving at a constant speed
pub struct SimulatedWheel {
    started: Instant,
    speed_mps: f64,
    circumference_m: f64,
    active_level: bool,
}

impl SimulatedWheel {
    /// Wheel turning at `speed_kmph`
    pub fn new(speed_kmph: f64, circumference_m: f64, active_level: bool) -> Self {
        Self {
            started: Instant::now(),
            speed_mps: speed_kmph / 3.6,
            circumference_m,
            active_level,
        }
    }

    fn level_at(&self, elapsed: Duration) -> bool {
        if self.circumference_m <= 0.0 {
            return !self.active_level;
        }
        let turns = self.speed_mps * elapsed.as_secs_f64() / self.circumference_m;
        if turns.fract() < MAGNET_DUTY {
            self.active_level
        } else {
            !self.active_level
        }
    }
}

impl RotationSource for SimulatedWheel {
    fn read_level(&mut self) -> Result<bool, SensorError> {
        Ok(self.level_at(self.started.elapsed()))
    }
}

/// Ambient temperature doing a bounded random walk
pub struct SimulatedTemperature {
    rng: StdRng,
    celsius: f64,
    /// Probability that a read fails like a bad sensor transaction
    failure_rate: f64,
}

impl SimulatedTemperature {
    /// Start at `celsius` with a random seed
    pub fn new(celsius: f64) -> Self {
        Self::with_rng(celsius, StdRng::from_entropy())
    }

    /// Start at `celsius` with a fixed seed
    pub fn with_seed(celsius: f64, seed: u64) -> Self {
        Self::with_rng(celsius, StdRng::seed_from_u64(seed))
    }

    fn with_rng(celsius: f64, rng: StdRng) -> Self {
        Self {
            rng,
            celsius,
            failure_rate: 0.02,
        }
    }

    /// Change how often reads fail (0.0 never, 1.0 always)
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }
}

impl TemperatureSource for SimulatedTemperature {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        if self.rng.gen_bool(self.failure_rate) {
            return Err(SensorError::Fault("checksum mismatch".to_string()));
        }
        self.celsius = (self.celsius + self.rng.gen_range(-0.2..0.2)).clamp(-10.0, 50.0);
        Ok(self.celsius)
    }
}

/// Charge controller streaming one block of readings per interval
pub struct SimulatedTelemetry {
    rng: StdRng,
    block_interval: Duration,
    queue: VecDeque<String>,
    battery_mv: f64,
    panel_w: f64,
}

impl SimulatedTelemetry {
    /// Emit a block every `block_interval`
    pub fn new(block_interval: Duration) -> Self {
        Self::with_rng(block_interval, StdRng::from_entropy())
    }

    /// Same as [`SimulatedTelemetry::new`] with a fixed seed
    pub fn with_seed(block_interval: Duration, seed: u64) -> Self {
        Self::with_rng(block_interval, StdRng::seed_from_u64(seed))
    }

    fn with_rng(block_interval: Duration, rng: StdRng) -> Self {
        Self {
            rng,
            block_interval,
            queue: VecDeque::new(),
            battery_mv: 12_600.0,
            panel_w: 80.0,
        }
    }

    fn next_block(&mut self) {
        self.panel_w = (self.panel_w + self.rng.gen_range(-5.0..5.0)).clamp(0.0, 200.0);
        self.battery_mv = (self.battery_mv + self.rng.gen_range(-20.0..20.0)).clamp(11_000.0, 14_400.0);
        let current_ma = self.panel_w / (self.battery_mv / 1000.0) * 1000.0;

        self.queue.extend([
            "PID\t0xA053".to_string(),
            format!("V\t{:.0}", self.battery_mv),
            format!("I\t{:.0}", current_ma),
            format!("VPV\t{:.0}", self.battery_mv + 5_000.0),
            format!("PPV\t{:.0}", self.panel_w),
            "CS\t3".to_string(),
        ]);
    }
}

impl LineSource for SimulatedTelemetry {
    fn read_line(&mut self) -> Result<String, SensorError> {
        if self.queue.is_empty() {
            thread::sleep(self.block_interval);
            self.next_block();
        }
        self.queue
            .pop_front()
            .ok_or_else(|| SensorError::Unavailable("telemetry block empty".to_string()))
    }
}

/// Position drawn uniformly from a geographic box
pub struct RandomPosition {
    rng: StdRng,
    geo_box: GeoBox,
}

impl RandomPosition {
    /// Random positions inside `geo_box`
    pub fn new(geo_box: GeoBox) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            geo_box,
        }
    }

    /// Same as [`RandomPosition::new`] with a fixed seed
    pub fn with_seed(geo_box: GeoBox, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            geo_box,
        }
    }
}

impl PositionSource for RandomPosition {
    fn read_position(&mut self) -> Result<GeoPoint, SensorError> {
        let (min, max) = (self.geo_box.min(), self.geo_box.max());
        let lat = min.lat + self.rng.gen::<f64>() * (max.lat - min.lat);
        let lon = min.lon + self.rng.gen::<f64>() * (max.lon - min.lon);
        Ok(GeoPoint::new(lat, lon))
    }
}

/// Camera producing a scrolling BGR gradient
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    frame: u32,
}

impl SimulatedCamera {
    /// Camera with the given sensor resolution
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
        }
    }
}

impl FrameSource for SimulatedCamera {
    fn capture(&mut self) -> Result<VideoFrame, SensorError> {
        let offset = self.frame;
        self.frame = self.frame.wrapping_add(1);

        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x.wrapping_add(offset) % 256) as u8);
                data.push((y % 256) as u8);
                data.push((offset % 256) as u8);
            }
        }
        VideoFrame::new(self.width, self.height, PixelFormat::Bgr8, data)
            .map_err(|e| SensorError::Fault(e.to_string()))
    }
}
