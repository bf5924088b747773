//! Source health tracking
//!
//! Every sensor source records its successes and faults here. A source whose
//! run of consecutive faults reaches the alert threshold is flagged in the
//! snapshot until its next successful read.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Fault counters for a single source
#[derive(Debug)]
pub struct SourceHealth {
    name: String,
    threshold: u32,
    consecutive_faults: AtomicU32,
    total_faults: AtomicU64,
}

impl SourceHealth {
    fn new(name: &str, threshold: u32) -> Self {
        Self {
            name: name.to_string(),
            threshold,
            consecutive_faults: AtomicU32::new(0),
            total_faults: AtomicU64::new(0),
        }
    }

    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a successful read
    pub fn record_ok(&self) {
        self.consecutive_faults.store(0, Ordering::Relaxed);
    }

    /// Record a failed read; returns true when this fault raises the alert
    pub fn record_fault(&self) -> bool {
        self.total_faults.fetch_add(1, Ordering::Relaxed);
        let streak = self.consecutive_faults.fetch_add(1, Ordering::Relaxed) + 1;
        let raised = streak == self.threshold;
        if raised {
            warn!("{} has failed {} times in a row", self.name, streak);
        }
        raised
    }

    /// Faults since the last successful read
    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults.load(Ordering::Relaxed)
    }

    /// Faults since startup
    pub fn total_faults(&self) -> u64 {
        self.total_faults.load(Ordering::Relaxed)
    }

    /// Whether the consecutive fault run has reached the threshold
    pub fn is_alerting(&self) -> bool {
        self.threshold > 0 && self.consecutive_faults() >= self.threshold
    }
}

/// Point-in-time view of one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    /// Source name
    pub name: String,
    /// Faults since the last successful read
    pub consecutive_faults: u32,
    /// Faults since startup
    pub total_faults: u64,
    /// Whether the source is flagged
    pub alerting: bool,
}

/// Point-in-time view of every registered source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Per-source status in registration order
    pub sources: Vec<SourceStatus>,
}

impl HealthReport {
    /// Names of the flagged sources
    pub fn alerting(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().filter(|s| s.alerting).map(|s| s.name.as_str())
    }

    /// Status of one source
    pub fn get(&self, name: &str) -> Option<&SourceStatus> {
        self.sources.iter().find(|s| s.name == name)
    }
}

/// Registry of source health shared between workers and the scheduler
#[derive(Debug, Clone)]
pub struct HealthBoard {
    threshold: u32,
    sources: Arc<Mutex<Vec<Arc<SourceHealth>>>>,
}

impl HealthBoard {
    /// Create a board; a threshold of 0 disables alerts
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            sources: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get (or register) the counters for `name`
    pub fn source(&self, name: &str) -> Arc<SourceHealth> {
        let mut sources = match self.sources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = sources.iter().find(|s| s.name == name) {
            return Arc::clone(existing);
        }
        let health = Arc::new(SourceHealth::new(name, self.threshold));
        sources.push(Arc::clone(&health));
        health
    }

    /// Snapshot every registered source
    pub fn report(&self) -> HealthReport {
        let sources = match self.sources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        HealthReport {
            sources: sources
                .iter()
                .map(|s| SourceStatus {
                    name: s.name.clone(),
                    consecutive_faults: s.consecutive_faults(),
                    total_faults: s.total_faults(),
                    alerting: s.is_alerting(),
                })
                .collect(),
        }
    }
}
