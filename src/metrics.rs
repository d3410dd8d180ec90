//! Dispatch and frame metrics for monitoring and observability.
//!
//! The collector is updated by every bridge entry point and can be exported
//! in Prometheus text format.

use crate::alloc::AllocatorStats;
use crate::dispatch::DispatchOutcome;
use crate::error::DispatchError;
use crate::registry::EventKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Snapshot of bridge activity
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStats {
    /// Dispatches that invoked a callback successfully
    pub handled: u64,
    /// Dispatches with no registered callback
    pub no_handler: u64,
    /// Dispatches that raised
    pub failed: u64,
    /// Frames run
    pub frames: u64,
    /// Total bytes handed to the host across all frames
    pub bytes_handed_off: u64,
    /// Average dispatch time in microseconds
    pub avg_dispatch_time_us: f64,
    /// Allocation counters of the scripting context
    pub memory: AllocatorStats,
}

/// Metrics collector shared by the bridge entry points
#[derive(Debug)]
pub struct BridgeMetrics {
    handled: AtomicU64,
    no_handler: AtomicU64,
    failed: AtomicU64,
    frames: AtomicU64,
    bytes_handed_off: AtomicU64,
    total_dispatch_time_us: AtomicU64,
    dispatches_by_event: parking_lot::Mutex<BTreeMap<EventKind, u64>>,
    error_counts: parking_lot::Mutex<BTreeMap<String, u64>>,
}

impl BridgeMetrics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self {
            handled: AtomicU64::new(0),
            no_handler: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            bytes_handed_off: AtomicU64::new(0),
            total_dispatch_time_us: AtomicU64::new(0),
            dispatches_by_event: parking_lot::Mutex::new(BTreeMap::new()),
            error_counts: parking_lot::Mutex::new(BTreeMap::new()),
        }
    }

    /// Record one dispatch of `kind`
    pub fn record_dispatch(
        &self,
        kind: EventKind,
        outcome: &Result<DispatchOutcome, DispatchError>,
        elapsed: Duration,
    ) {
        match outcome {
            Ok(DispatchOutcome::Handled) => self.handled.fetch_add(1, Ordering::Relaxed),
            Ok(DispatchOutcome::NoHandler) => self.no_handler.fetch_add(1, Ordering::Relaxed),
            Err(err) => {
                self.record_error(&err.code.to_string());
                self.failed.fetch_add(1, Ordering::Relaxed)
            }
        };

        self.total_dispatch_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        *self.dispatches_by_event.lock().entry(kind).or_insert(0) += 1;
    }

    /// Record a finished frame
    pub fn record_frame(&self, bytes_handed_off: usize) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes_handed_off
            .fetch_add(bytes_handed_off as u64, Ordering::Relaxed);
    }

    /// Record an error by code
    pub fn record_error(&self, error_code: &str) {
        let mut counts = self.error_counts.lock();
        *counts.entry(error_code.to_string()).or_insert(0) += 1;
    }

    /// Successful dispatches
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Dispatches without a callback
    pub fn no_handler(&self) -> u64 {
        self.no_handler.load(Ordering::Relaxed)
    }

    /// Failed dispatches
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// All dispatches
    pub fn total_dispatches(&self) -> u64 {
        self.handled() + self.no_handler() + self.failed()
    }

    /// Frames run
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Average dispatch time in microseconds
    pub fn avg_dispatch_time_us(&self) -> f64 {
        let total = self.total_dispatches();
        if total == 0 {
            0.0
        } else {
            self.total_dispatch_time_us.load(Ordering::Relaxed) as f64 / total as f64
        }
    }

    /// Dispatch counts per event
    pub fn dispatches_by_event(&self) -> BTreeMap<EventKind, u64> {
        self.dispatches_by_event.lock().clone()
    }

    /// Error counts per code
    pub fn error_counts(&self) -> BTreeMap<String, u64> {
        self.error_counts.lock().clone()
    }

    /// Snapshot combined with the context's allocation counters
    pub fn snapshot(&self, memory: AllocatorStats) -> BridgeStats {
        BridgeStats {
            handled: self.handled(),
            no_handler: self.no_handler(),
            failed: self.failed(),
            frames: self.frames(),
            bytes_handed_off: self.bytes_handed_off.load(Ordering::Relaxed),
            avg_dispatch_time_us: self.avg_dispatch_time_us(),
            memory,
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.handled.store(0, Ordering::Relaxed);
        self.no_handler.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.frames.store(0, Ordering::Relaxed);
        self.bytes_handed_off.store(0, Ordering::Relaxed);
        self.total_dispatch_time_us.store(0, Ordering::Relaxed);
        self.dispatches_by_event.lock().clear();
        self.error_counts.lock().clear();
    }

    /// Export Prometheus-format metrics
    pub fn to_prometheus(&self, memory: &AllocatorStats) -> String {
        let mut output = String::new();

        output.push_str("# HELP driver_bridge_dispatches_total Event dispatches by result\n");
        output.push_str("# TYPE driver_bridge_dispatches_total counter\n");
        output.push_str(&format!(
            "driver_bridge_dispatches_total{{result=\"handled\"}} {}\n",
            self.handled()
        ));
        output.push_str(&format!(
            "driver_bridge_dispatches_total{{result=\"no_handler\"}} {}\n",
            self.no_handler()
        ));
        output.push_str(&format!(
            "driver_bridge_dispatches_total{{result=\"error\"}} {}\n",
            self.failed()
        ));

        output.push_str("\n# HELP driver_bridge_event_dispatches_total Dispatches by event\n");
        output.push_str("# TYPE driver_bridge_event_dispatches_total counter\n");
        for (kind, count) in self.dispatches_by_event() {
            output.push_str(&format!(
                "driver_bridge_event_dispatches_total{{event=\"{}\"}} {}\n",
                kind, count
            ));
        }

        output.push_str("\n# HELP driver_bridge_dispatch_time_us Average dispatch time\n");
        output.push_str("# TYPE driver_bridge_dispatch_time_us gauge\n");
        output.push_str(&format!(
            "driver_bridge_dispatch_time_us {:.2}\n",
            self.avg_dispatch_time_us()
        ));

        output.push_str("\n# HELP driver_bridge_frames_total Frames run\n");
        output.push_str("# TYPE driver_bridge_frames_total counter\n");
        output.push_str(&format!("driver_bridge_frames_total {}\n", self.frames()));

        output.push_str("\n# HELP driver_bridge_frame_bytes_total Bytes handed to the host\n");
        output.push_str("# TYPE driver_bridge_frame_bytes_total counter\n");
        output.push_str(&format!(
            "driver_bridge_frame_bytes_total {}\n",
            self.bytes_handed_off.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP driver_bridge_memory_used_bytes Script memory in use\n");
        output.push_str("# TYPE driver_bridge_memory_used_bytes gauge\n");
        output.push_str(&format!(
            "driver_bridge_memory_used_bytes {}\n",
            memory.used_bytes
        ));

        output.push_str("\n# HELP driver_bridge_memory_peak_bytes Peak script memory\n");
        output.push_str("# TYPE driver_bridge_memory_peak_bytes gauge\n");
        output.push_str(&format!(
            "driver_bridge_memory_peak_bytes {}\n",
            memory.peak_bytes
        ));

        output.push_str("\n# HELP driver_bridge_errors_total Error counts by code\n");
        output.push_str("# TYPE driver_bridge_errors_total counter\n");
        for (code, count) in self.error_counts() {
            output.push_str(&format!(
                "driver_bridge_errors_total{{code=\"{}\"}} {}\n",
                code, count
            ));
        }

        output
    }
}

impl Default for BridgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer for measuring one dispatch
pub struct DispatchTimer {
    start: Instant,
}

impl DispatchTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
