//! Single execution queue.
//!
//! Every executor owns exactly one queue. Jobs are executed by a dedicated
//! worker thread in submission order; no job starts before the previous one
//! has finished. Each submission returns a [`QueueEvent`], which completes
//! once the job has run. The event is a `Future` for async callers and has a
//! blocking [`QueueEvent::wait`] for everyone else.
//!
//! A job that panics resolves its event to [`StencilError::JobPanicked`];
//! the worker survives and keeps draining the queue.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::error::{Result, StencilError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// What a job sends back: its value, or the message of its panic.
type Outcome<R> = std::result::Result<R, String>;

/// Statistics for an execution queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Total jobs submitted.
    pub submitted: u64,
    /// Total jobs that have finished, panicked ones included.
    pub completed: u64,
    /// Jobs submitted but not yet completed.
    pub depth: u64,
    /// Maximum depth observed.
    pub max_depth: u64,
}

/// Internal statistics with atomics.
#[derive(Default)]
struct QueueStatsInner {
    submitted: AtomicU64,
    completed: AtomicU64,
    max_depth: AtomicU64,
}

impl QueueStatsInner {
    fn depth(&self) -> u64 {
        let submitted = self.submitted.load(Ordering::Acquire);
        let completed = self.completed.load(Ordering::Acquire);
        submitted.saturating_sub(completed)
    }

    fn update_max_depth(&self) {
        let depth = self.depth();
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while depth > max {
            match self.max_depth.compare_exchange_weak(
                max,
                depth,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => max = current,
            }
        }
    }
}

/// In-order execution queue backed by one worker thread.
pub struct ExecutionQueue {
    name: String,
    sender: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<QueueStatsInner>,
}

impl ExecutionQueue {
    /// Start a new queue with its worker thread.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let worker = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    job();
                }
            })
            .map_err(|e| StencilError::QueueSpawn(e.to_string()))?;

        debug!("Started execution queue '{}'", name);

        Ok(Self {
            name,
            sender: Some(sender),
            worker: Some(worker),
            stats: Arc::new(QueueStatsInner::default()),
        })
    }

    /// Name of the queue (also the worker thread name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a job. It runs after every previously submitted job.
    pub fn submit<R, F>(&self, job: F) -> Result<QueueEvent<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(StencilError::QueueClosed)?;
        let (done_tx, done_rx) = oneshot::channel();
        let stats = Arc::clone(&self.stats);
        let name = self.name.clone();

        let boxed: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
                let message = panic_message(payload.as_ref());
                error!("Job on '{}' panicked: {}", name, message);
                message
            });
            stats.completed.fetch_add(1, Ordering::AcqRel);
            // The caller may have dropped the event; the job still counts.
            let _ = done_tx.send(outcome);
        });

        self.stats.submitted.fetch_add(1, Ordering::AcqRel);
        if sender.send(boxed).is_err() {
            self.stats.submitted.fetch_sub(1, Ordering::AcqRel);
            return Err(StencilError::QueueClosed);
        }
        self.stats.update_max_depth();
        trace!("Job submitted to '{}' (depth={})", self.name, self.stats.depth());

        Ok(QueueEvent { receiver: done_rx })
    }

    /// Block until every job submitted so far has completed.
    pub fn wait_idle(&self) -> Result<()> {
        self.submit(|| ())?.wait()
    }

    /// Get queue statistics.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.stats.submitted.load(Ordering::Acquire),
            completed: self.stats.completed.load(Ordering::Acquire),
            depth: self.stats.depth(),
            max_depth: self.stats.max_depth.load(Ordering::Relaxed),
        }
    }

    /// Reset queue statistics.
    ///
    /// Only meaningful while the queue is idle.
    pub fn reset_stats(&self) {
        self.stats.submitted.store(0, Ordering::Release);
        self.stats.completed.store(0, Ordering::Release);
        self.stats.max_depth.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionQueue")
            .field("name", &self.name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Drop for ExecutionQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain pending jobs and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Execution queue '{}' worker panicked", self.name);
            }
        }
        debug!("Stopped execution queue '{}'", self.name);
    }
}

/// Text of a panic payload, as passed to `panic!`.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Completion handle of a submitted job.
#[derive(Debug)]
#[must_use = "a queue event does nothing unless awaited or waited on"]
pub struct QueueEvent<R> {
    receiver: oneshot::Receiver<Outcome<R>>,
}

impl<R> QueueEvent<R> {
    /// Block the current thread until the job has completed.
    ///
    /// Must not be called from within an async runtime; await the event there.
    pub fn wait(self) -> Result<R> {
        settle(self.receiver.blocking_recv())
    }
}

fn settle<R>(received: std::result::Result<Outcome<R>, oneshot::error::RecvError>) -> Result<R> {
    match received {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(message)) => Err(StencilError::JobPanicked(message)),
        Err(_) => Err(StencilError::QueueClosed),
    }
}

impl<R> Future for QueueEvent<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(settle)
    }
}
