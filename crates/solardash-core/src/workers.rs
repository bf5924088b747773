//! Background workers for blocking sources
//!
//! Each blocking source (temperature sensor, serial link, camera) gets its own
//! OS thread. The thread performs the blocking reads and publishes results
//! into a [`Publisher`], so the scheduler never waits on hardware.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::health::SourceHealth;
use crate::mailbox::Publisher;
use crate::sensors::{FrameSource, LineSource, SensorError, TemperatureSource};
use crate::telemetry::{TelemetryFrame, TelemetryIngest};
use crate::thermal::{ThermalMonitor, ThermalReading};
use crate::video::VideoFrame;

/// Longest single sleep between cancellation checks
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// What a worker step wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Run the next step right away
    Immediately,
    /// Wait out the rest of the period first
    NextPeriod,
}

/// A running background worker
///
/// Dropping the handle cancels the worker without waiting for it.
pub struct Worker {
    name: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Worker (and thread) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Cancel the worker and wait for its thread
    ///
    /// A read already in progress is allowed to finish (or time out) first.
    pub fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} worker panicked", self.name);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run `step` every `period` on a dedicated thread until `cancel` fires
///
/// The period is measured from the start of one step to the start of the
/// next. A step that overruns is followed immediately by the next one.
pub fn spawn_periodic<F>(
    name: &str,
    period: Duration,
    cancel: CancellationToken,
    mut step: F,
) -> io::Result<Worker>
where
    F: FnMut() -> Pace + Send + 'static,
{
    let token = cancel.clone();
    let thread_name = name.to_string();
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            debug!("{} worker started", thread_name);
            while !token.is_cancelled() {
                let started = Instant::now();
                if step() == Pace::NextPeriod {
                    pause(&token, period.saturating_sub(started.elapsed()));
                }
            }
            debug!("{} worker stopped", thread_name);
        })?;

    info!("Started {} worker (period {:?})", name, period);
    Ok(Worker {
        name: name.to_string(),
        cancel,
        handle: Some(handle),
    })
}

fn pause(token: &CancellationToken, mut remaining: Duration) {
    while !remaining.is_zero() && !token.is_cancelled() {
        let slice = remaining.min(CANCEL_POLL);
        thread::sleep(slice);
        remaining -= slice;
    }
}

/// Poll the temperature sensor once per `period`
///
/// Every reading is published, including the fault sentinel.
pub fn spawn_thermal<S>(
    mut monitor: ThermalMonitor<S>,
    period: Duration,
    publisher: Publisher<ThermalReading>,
    health: Arc<SourceHealth>,
    cancel: CancellationToken,
) -> io::Result<Worker>
where
    S: TemperatureSource + 'static,
{
    spawn_periodic("thermal", period, cancel, move || {
        let reading = monitor.tick();
        if reading.valid {
            health.record_ok();
        } else {
            health.record_fault();
        }
        publisher.publish(reading);
        Pace::NextPeriod
    })
}

/// Read telemetry lines as fast as they arrive
///
/// The worker owns the frame; every line that updates a recognized channel
/// publishes a copy. After a read error the worker waits `retry_period`
/// before reading again.
pub fn spawn_telemetry<L>(
    mut source: L,
    mut ingest: TelemetryIngest,
    retry_period: Duration,
    publisher: Publisher<TelemetryFrame>,
    health: Arc<SourceHealth>,
    cancel: CancellationToken,
) -> io::Result<Worker>
where
    L: LineSource + 'static,
{
    spawn_periodic("telemetry", retry_period, cancel, move || {
        match source.read_line() {
            Ok(line) => {
                health.record_ok();
                match ingest.ingest(&line) {
                    Ok(record) if record.stored => publisher.publish(ingest.frame().clone()),
                    Ok(_) => {}
                    Err(e) => warn!("Failed to read data from serial port: {}", e),
                }
                Pace::Immediately
            }
            Err(e) => {
                report(&health, "Serial telemetry", &e);
                Pace::NextPeriod
            }
        }
    })
}

/// Capture a camera frame once per `period`
///
/// A failed capture publishes nothing, so the previous frame stays current.
pub fn spawn_camera<F>(
    mut source: F,
    period: Duration,
    publisher: Publisher<Arc<VideoFrame>>,
    health: Arc<SourceHealth>,
    cancel: CancellationToken,
) -> io::Result<Worker>
where
    F: FrameSource + 'static,
{
    spawn_periodic("camera", period, cancel, move || {
        match source.capture() {
            Ok(frame) => {
                health.record_ok();
                publisher.publish(Arc::new(frame));
            }
            Err(e) => report(&health, "Camera capture", &e),
        }
        Pace::NextPeriod
    })
}

fn report(health: &SourceHealth, what: &str, error: &SensorError) {
    if health.consecutive_faults() == 0 && !error.is_timeout() {
        warn!("{} failed: {}", what, error);
    } else {
        debug!("{} failed: {}", what, error);
    }
    health.record_fault();
}

/// Every worker started for one dashboard session
#[derive(Default)]
pub struct WorkerSet {
    workers: Vec<Worker>,
}

impl WorkerSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a worker
    pub fn push(&mut self, worker: Worker) {
        self.workers.push(worker);
    }

    /// Names of the workers in the set
    pub fn names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name()).collect()
    }

    /// Number of workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stop every worker, waiting for each thread
    pub fn shutdown(self) {
        for worker in self.workers {
            let name = worker.name().to_string();
            worker.stop();
            debug!("{} worker joined", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_periodic_runs_until_stopped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let worker = spawn_periodic("counter", Duration::from_millis(5), CancellationToken::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Pace::NextPeriod
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        worker.stop();
        let after_stop = runs.load(Ordering::SeqCst);
        assert!(after_stop >= 2);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(runs.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_shared_token_stops_worker() {
        let cancel = CancellationToken::new();
        let worker = spawn_periodic("idle", Duration::from_secs(10), cancel.clone(), || Pace::NextPeriod)
            .unwrap();
        cancel.cancel();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(worker.is_finished());
    }

    #[test]
    fn test_worker_set_shutdown() {
        let mut set = WorkerSet::new();
        let cancel = CancellationToken::new();
        set.push(spawn_periodic("a", Duration::from_millis(5), cancel.child_token(), || Pace::NextPeriod).unwrap());
        set.push(spawn_periodic("b", Duration::from_millis(5), cancel.child_token(), || Pace::NextPeriod).unwrap());

        assert_eq!(set.names(), vec!["a", "b"]);
        assert_eq!(set.len(), 2);
        set.shutdown();
    }
}
