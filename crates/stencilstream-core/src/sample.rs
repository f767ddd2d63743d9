//! Runtime samples.
//!
//! A [`RuntimeSample`] is an immutable snapshot of one measured execution
//! window: the total time spent in passes and the mean speed in cells per
//! second. Executors feed a [`RuntimeRecorder`] while they run; the recorder is
//! shared with the caller, who can take a snapshot or reset it at any time.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Snapshot of the runtime of a sequence of passes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeSample {
    /// Total wall time of all recorded passes in seconds.
    pub total_runtime: f64,
    /// Number of recorded passes.
    pub n_passes: u64,
    /// Number of cell updates performed (domain area times generations).
    pub cells_processed: u64,
}

impl RuntimeSample {
    /// Total wall time of all recorded passes.
    pub fn get_total_runtime(&self) -> f64 {
        self.total_runtime
    }

    /// Mean speed in cell updates per second.
    ///
    /// Zero if nothing has been recorded.
    pub fn get_mean_speed(&self) -> f64 {
        if self.total_runtime > 0.0 {
            self.cells_processed as f64 / self.total_runtime
        } else {
            0.0
        }
    }

    /// Mean wall time of one pass in seconds.
    pub fn get_mean_pass_runtime(&self) -> f64 {
        if self.n_passes > 0 {
            self.total_runtime / self.n_passes as f64
        } else {
            0.0
        }
    }

    /// Number of recorded passes.
    pub fn get_n_passes(&self) -> u64 {
        self.n_passes
    }
}

/// Shared accumulator for runtime samples.
#[derive(Debug, Clone, Default)]
pub struct RuntimeRecorder {
    inner: Arc<Mutex<RuntimeSample>>,
}

impl RuntimeRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one pass.
    pub fn add_pass(&self, runtime: Duration, cells_processed: u64) {
        let mut sample = self.inner.lock();
        sample.total_runtime += runtime.as_secs_f64();
        sample.n_passes += 1;
        sample.cells_processed += cells_processed;
    }

    /// Take a snapshot of everything recorded since the last reset.
    pub fn sample(&self) -> RuntimeSample {
        *self.inner.lock()
    }

    /// Forget all recorded passes.
    pub fn reset(&self) {
        *self.inner.lock() = RuntimeSample::default();
    }
}
