//! Headless rendering sink that writes readout changes to the log

use tracing::{debug, info, warn};

use solardash_core::geo::SurfaceDims;
use solardash_core::render::RenderSink;
use solardash_core::snapshot::DashboardSnapshot;

/// Logs each readout when its text changes
pub struct LogSink {
    dims: SurfaceDims,
    lines: Vec<String>,
    alerting: Vec<String>,
    frame_seq: u64,
    frames: u64,
}

impl LogSink {
    /// Sink presenting a map surface of `dims`
    pub fn new(dims: SurfaceDims) -> Self {
        Self {
            dims,
            lines: Vec::new(),
            alerting: Vec::new(),
            frame_seq: 0,
            frames: 0,
        }
    }

    /// Readouts as last drawn
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of distinct camera frames seen
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderSink for LogSink {
    fn surface_dims(&self) -> SurfaceDims {
        self.dims
    }

    fn redraw(&mut self, snapshot: &DashboardSnapshot) {
        let lines = snapshot.lines();
        for (i, line) in lines.iter().enumerate() {
            if self.lines.get(i) != Some(line) {
                info!("{}", line);
            }
        }
        self.lines = lines;

        let alerting: Vec<String> = snapshot.health.value.alerting().map(str::to_string).collect();
        if alerting != self.alerting {
            if alerting.is_empty() {
                info!("All sources healthy");
            } else {
                warn!("Failing sources: {}", alerting.join(", "));
            }
            self.alerting = alerting;
        }

        if snapshot.video.seq != self.frame_seq && snapshot.video.value.is_some() {
            self.frame_seq = snapshot.video.seq;
            self.frames += 1;
            debug!("Camera frame #{}", self.frames);
        }
    }
}
