//! Deadline wrapper for blocking sources
//!
//! Each wrapped source lives on its own reader thread, started on the first
//! read. Reads are handed to that thread over a channel and the caller waits
//! for the answer with `recv_timeout`. A read that misses the deadline is
//! reported as [`SensorError::Timeout`]; while the reader is still stuck in
//! it, further reads fail fast with [`SensorError::Busy`] instead of queueing
//! behind it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{FrameSource, LineSource, SensorError, TemperatureSource};
use crate::video::VideoFrame;

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Clears the in-flight flag when a read finishes or unwinds
struct ReadGuard(Arc<AtomicBool>);

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A source whose reads are bounded by a timeout
pub struct Timed<S> {
    name: String,
    timeout: Duration,
    source: Option<S>,
    jobs: Option<Sender<Job<S>>>,
    in_flight: Arc<AtomicBool>,
}

impl<S: Send + 'static> Timed<S> {
    /// Wrap `source`, naming it for logs and the reader thread
    pub fn new(name: impl Into<String>, source: S, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
            source: Some(source),
            jobs: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn reader(&mut self) -> Result<Sender<Job<S>>, SensorError> {
        if let Some(jobs) = &self.jobs {
            return Ok(jobs.clone());
        }

        let mut source = self.source.take().ok_or_else(|| {
            SensorError::Fault(format!("{} reader thread could not be started", self.name))
        })?;
        let (tx, rx) = mpsc::channel::<Job<S>>();
        thread::Builder::new()
            .name(format!("{}-read", self.name))
            .spawn(move || {
                for job in rx {
                    job(&mut source);
                }
            })?;
        self.jobs = Some(tx.clone());
        Ok(tx)
    }

    fn call<T: Send + 'static>(
        &mut self,
        op: fn(&mut S) -> Result<T, SensorError>,
    ) -> Result<T, SensorError> {
        if self.in_flight.load(Ordering::Acquire) {
            return Err(SensorError::Busy(self.name.clone()));
        }
        let jobs = self.reader()?;

        let (tx, rx) = mpsc::channel();
        let guard = ReadGuard(Arc::clone(&self.in_flight));
        self.in_flight.store(true, Ordering::Release);
        let job: Job<S> = Box::new(move |source| {
            let result = op(source);
            drop(guard);
            let _ = tx.send(result);
        });
        if jobs.send(job).is_err() {
            return Err(SensorError::Fault(format!("{} reader thread exited", self.name)));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SensorError::Timeout {
                source_name: self.name.clone(),
                after_ms: self.timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(SensorError::Fault(format!(
                "{} reader thread exited without a result",
                self.name
            ))),
        }
    }
}

impl<S: TemperatureSource + 'static> TemperatureSource for Timed<S> {
    fn read_celsius(&mut self) -> Result<f64, SensorError> {
        self.call(|source| source.read_celsius())
    }
}

impl<S: FrameSource + 'static> FrameSource for Timed<S> {
    fn capture(&mut self) -> Result<VideoFrame, SensorError> {
        self.call(|source| source.capture())
    }
}

impl<S: LineSource + 'static> LineSource for Timed<S> {
    fn read_line(&mut self) -> Result<String, SensorError> {
        self.call(|source| source.read_line())
    }
}
