//! Executor driven through a single in-order queue.

use std::sync::Arc;

use parking_lot::Mutex;
use stencilstream_core::config::{StencilConfig, StrategyKind};
use stencilstream_core::error::Result;
use stencilstream_core::index::Uid;
use stencilstream_core::queue::{ExecutionQueue, QueueEvent};
use stencilstream_core::sample::{RuntimeRecorder, RuntimeSample};
use tracing::{debug, info};

use super::{ExecutionStrategy, Executor};
use crate::stencil::{Cell, TransitionFunction};
use crate::tiling::Grid;

/// Stencil executor that runs every call on one execution queue.
///
/// Runs and input replacements are submitted to the queue and execute
/// strictly in submission order. A run holds the strategy for its whole
/// duration, so accessors called meanwhile observe the state before or after
/// the run, never in between. They do not wait for queued work;
/// [`submit_copy_output`](Self::submit_copy_output) does.
///
/// # Example
///
/// ```
/// use stencilstream::prelude::*;
///
/// let config = StencilConfig::builder().tile(16, 16).burst_length(4).build().unwrap();
/// let grid = Grid::filled(8, 8, 1.0f32, config.geometry).unwrap();
/// let blur = |s: &Stencil<f32>| {
///     (s[Id::new(-1, 0)] + s[Id::new(1, 0)] + s[Id::new(0, -1)] + s[Id::new(0, 1)]) / 4.0
/// };
///
/// let executor = SingleQueueExecutor::new(config, grid, blur, 0.0).unwrap();
/// executor.run_blocking(10).unwrap();
/// assert_eq!(executor.get_i_generation(), 10);
/// ```
pub struct SingleQueueExecutor<T, F> {
    strategy: Arc<Mutex<ExecutionStrategy<T, F>>>,
    queue: ExecutionQueue,
    recorder: RuntimeRecorder,
    kind: StrategyKind,
}

impl<T, F> SingleQueueExecutor<T, F>
where
    T: Cell,
    F: TransitionFunction<T> + 'static,
{
    /// Create an executor and select its strategy.
    pub fn new(config: StencilConfig, grid: Grid<T>, trans_func: F, halo_value: T) -> Result<Self> {
        let range = grid.get_grid_range();
        let strategy = ExecutionStrategy::select(config, grid, trans_func, halo_value)?;
        let kind = strategy.kind();
        let recorder = strategy.recorder();
        let queue = ExecutionQueue::new("stencil-queue")?;

        info!(
            "Stencil executor created: grid {}x{}, {:?} strategy",
            range.c, range.r, kind
        );

        Ok(Self {
            strategy: Arc::new(Mutex::new(strategy)),
            queue,
            recorder,
            kind,
        })
    }

    /// Create an executor from cells indexed `[column][row]`.
    pub fn from_columns(config: StencilConfig, columns: Vec<Vec<T>>, trans_func: F, halo_value: T) -> Result<Self> {
        let grid = Grid::from_columns(columns, config.geometry)?;
        Self::new(config, grid, trans_func, halo_value)
    }

    /// Submit a run and return its completion event.
    ///
    /// The event resolves to the result of the run once it has been
    /// committed or rejected.
    pub fn submit_run(&self, n_generations: i64) -> Result<QueueEvent<Result<()>>> {
        let strategy = Arc::clone(&self.strategy);
        self.queue.submit(move || {
            let mut strategy = strategy.lock();
            let result = strategy.run(n_generations);
            debug!(
                "Run of {} generations finished at generation {}: {:?}",
                n_generations,
                strategy.get_i_generation(),
                result
            );
            result
        })
    }

    /// Advance the grid by `n_generations` and wait for the run to commit.
    ///
    /// Negative counts fail with `InvalidArgument` and leave the grid
    /// untouched.
    pub async fn run(&self, n_generations: i64) -> Result<()> {
        self.submit_run(n_generations)?.await?
    }

    /// Blocking variant of [`run`](Self::run).
    ///
    /// Must not be called from within an async runtime.
    pub fn run_blocking(&self, n_generations: i64) -> Result<()> {
        self.submit_run(n_generations)?.wait()?
    }

    /// The execution queue, for diagnostics.
    pub fn get_queue(&self) -> &ExecutionQueue {
        &self.queue
    }

    /// The strategy selected at construction.
    pub fn strategy_kind(&self) -> StrategyKind {
        self.kind
    }

    /// Snapshot of every pass since the last reset.
    pub fn get_runtime_sample(&self) -> RuntimeSample {
        self.recorder.sample()
    }

    /// Forget all recorded passes.
    pub fn reset_runtime_sample(&self) {
        self.recorder.reset()
    }

    /// Dimensions of the grid.
    pub fn get_grid_range(&self) -> Uid {
        self.strategy.lock().get_grid_range()
    }

    /// Value of every cell outside the grid.
    pub fn get_halo_value(&self) -> T {
        self.strategy.lock().get_halo_value()
    }

    /// Number of generations committed so far.
    pub fn get_i_generation(&self) -> u64 {
        self.strategy.lock().get_i_generation()
    }

    /// Copy of the transition function.
    pub fn get_trans_func(&self) -> F
    where
        F: Clone,
    {
        self.strategy.lock().get_trans_func().clone()
    }

    /// Copy of the grid as committed by the last completed run.
    ///
    /// This is a snapshot; runs still waiting in the queue are not awaited.
    pub fn copy_output(&self) -> Grid<T> {
        self.strategy.lock().copy_output()
    }

    /// Queue a copy of the grid behind every job submitted so far.
    pub fn submit_copy_output(&self) -> Result<QueueEvent<Grid<T>>> {
        let strategy = Arc::clone(&self.strategy);
        self.queue.submit(move || strategy.lock().copy_output())
    }

    /// Queue a replacement of the grid. The generation index is kept.
    pub fn submit_set_input(&self, grid: Grid<T>) -> Result<QueueEvent<Result<()>>> {
        let strategy = Arc::clone(&self.strategy);
        self.queue.submit(move || strategy.lock().set_input(grid))
    }

    /// Replace the grid once every previously submitted run has committed.
    ///
    /// Must not be called from within an async runtime; await
    /// [`submit_set_input`](Self::submit_set_input) there.
    pub fn set_input(&self, grid: Grid<T>) -> Result<()> {
        self.submit_set_input(grid)?.wait()?
    }
}

impl<T, F> std::fmt::Debug for SingleQueueExecutor<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleQueueExecutor")
            .field("kind", &self.kind)
            .field("queue", &self.queue)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::Stencil;
    use stencilstream_core::error::StencilError;
    use stencilstream_core::index::Id;

    fn config() -> StencilConfig {
        StencilConfig::builder()
            .tile(4, 4)
            .burst_length(4)
            .build()
            .unwrap()
    }

    fn add_one(stencil: &Stencil<u32>) -> u32 {
        stencil[Id::new(0, 0)] + 1
    }

    #[test]
    fn test_blocking_run() {
        let grid: Grid<u32> = Grid::new(6, 6, config().geometry).unwrap();
        let executor = SingleQueueExecutor::new(config(), grid, add_one, 0).unwrap();
        assert_eq!(executor.strategy_kind(), StrategyKind::Tiling);

        executor.run_blocking(3).unwrap();
        assert_eq!(executor.get_i_generation(), 3);
        assert!(executor.copy_output().as_slice().iter().all(|&v| v == 3));
        assert_eq!(executor.get_queue().stats().completed, 1);
    }

    #[tokio::test]
    async fn test_async_run() {
        let grid: Grid<u32> = Grid::new(3, 3, config().geometry).unwrap();
        let executor = SingleQueueExecutor::new(config(), grid, add_one, 0).unwrap();
        assert_eq!(executor.strategy_kind(), StrategyKind::Monotile);

        executor.run(2).await.unwrap();
        executor.run(5).await.unwrap();
        assert_eq!(executor.get_i_generation(), 7);
        assert!(executor.copy_output().as_slice().iter().all(|&v| v == 7));
    }

    #[tokio::test]
    async fn test_negative_run_leaves_grid() {
        let grid = Grid::filled(3, 3, 9u32, config().geometry).unwrap();
        let executor = SingleQueueExecutor::new(config(), grid.clone(), add_one, 0).unwrap();

        let result = executor.run(-4).await;
        assert!(matches!(result, Err(StencilError::InvalidArgument(_))));
        assert_eq!(executor.copy_output(), grid);
        assert_eq!(executor.get_i_generation(), 0);
    }

    #[test]
    fn test_submitted_runs_complete_in_order() {
        let grid: Grid<u32> = Grid::new(5, 5, config().geometry).unwrap();
        let executor = SingleQueueExecutor::new(config(), grid, add_one, 0).unwrap();

        let events: Vec<_> = (1..=4).map(|n| executor.submit_run(n).unwrap()).collect();
        for event in events {
            event.wait().unwrap().unwrap();
        }

        assert_eq!(executor.get_i_generation(), 10);
        assert!(executor.copy_output().as_slice().iter().all(|&v| v == 10));
        assert_eq!(executor.get_queue().stats().submitted, 4);
    }

    /// Keep the worker busy so later submissions stay queued.
    fn occupy(executor: &SingleQueueExecutor<u32, fn(&Stencil<u32>) -> u32>) -> QueueEvent<()> {
        executor
            .get_queue()
            .submit(|| std::thread::sleep(std::time::Duration::from_millis(200)))
            .unwrap()
    }

    #[test]
    fn test_set_input_waits_for_queued_run() {
        let grid: Grid<u32> = Grid::new(5, 5, config().geometry).unwrap();
        let trans: fn(&Stencil<u32>) -> u32 = add_one;
        let executor = SingleQueueExecutor::new(config(), grid, trans, 0).unwrap();

        let busy = occupy(&executor);
        let run = executor.submit_run(1).unwrap();
        // Applied after the run, so the run sees the old grid.
        executor
            .set_input(Grid::filled(5, 5, 100, config().geometry).unwrap())
            .unwrap();
        busy.wait().unwrap();
        run.wait().unwrap().unwrap();

        assert_eq!(executor.get_i_generation(), 1);
        assert!(executor.copy_output().as_slice().iter().all(|&v| v == 100));
    }

    #[tokio::test]
    async fn test_queued_output_sees_queued_runs() {
        let grid: Grid<u32> = Grid::new(5, 5, config().geometry).unwrap();
        let trans: fn(&Stencil<u32>) -> u32 = add_one;
        let executor = SingleQueueExecutor::new(config(), grid.clone(), trans, 0).unwrap();

        let busy = occupy(&executor);
        let run = executor.submit_run(2).unwrap();
        let queued = executor.submit_copy_output().unwrap();

        // The snapshot does not wait for the run.
        assert_eq!(executor.copy_output(), grid);

        let output = queued.await.unwrap();
        assert!(output.as_slice().iter().all(|&v| v == 2));
        busy.await.unwrap();
        run.await.unwrap().unwrap();

        executor
            .submit_set_input(Grid::filled(5, 5, 40, config().geometry).unwrap())
            .unwrap()
            .await
            .unwrap()
            .unwrap();
        executor.run(1).await.unwrap();
        assert!(executor.copy_output().as_slice().iter().all(|&v| v == 41));
    }

    #[test]
    fn test_panicking_run_keeps_grid() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let armed = Arc::new(AtomicBool::new(true));
        let trigger = Arc::clone(&armed);
        let fragile = move |stencil: &Stencil<u32>| {
            if trigger.load(Ordering::SeqCst) {
                panic!("transition failed");
            }
            stencil[Id::new(0, 0)] + 1
        };

        for size in [3, 6] {
            armed.store(true, Ordering::SeqCst);
            let grid: Grid<u32> = Grid::new(size, size, config().geometry).unwrap();
            let executor = SingleQueueExecutor::new(config(), grid.clone(), fragile.clone(), 0).unwrap();

            let result = executor.run_blocking(3);
            assert!(matches!(result, Err(StencilError::JobPanicked(_))));
            assert_eq!(executor.copy_output(), grid);
            assert_eq!(executor.get_i_generation(), 0);

            armed.store(false, Ordering::SeqCst);
            executor.run_blocking(2).unwrap();
            assert_eq!(executor.get_i_generation(), 2);
            assert!(executor.copy_output().as_slice().iter().all(|&v| v == 2));
        }
    }

    #[test]
    fn test_runtime_sample_spans_runs() {
        let grid: Grid<u32> = Grid::new(6, 6, config().geometry).unwrap();
        let executor = SingleQueueExecutor::new(config(), grid, add_one, 0).unwrap();

        executor.run_blocking(2).unwrap();
        executor.run_blocking(3).unwrap();
        let sample = executor.get_runtime_sample();
        assert_eq!(sample.get_n_passes(), 5);
        assert_eq!(sample.cells_processed, 5 * 36);

        executor.reset_runtime_sample();
        assert_eq!(executor.get_runtime_sample().get_n_passes(), 0);
    }
}
