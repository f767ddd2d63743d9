//! Heat diffusion benchmark for the stencil executors.
//!
//! Runs a 5-point averaging stencil on a grid with a hot spot in its center
//! and reports the runtime sample.
//!
//! ```text
//! stencil_bench --width 4096 --height 4096 --tile 1024 --generations 100
//! stencil_bench --strategy monotile --width 512 --height 512 --json
//! ```

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use stencilstream::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stencil_bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid width in cells
    #[arg(long, default_value_t = 2048)]
    width: usize,

    /// Grid height in cells
    #[arg(long, default_value_t = 2048)]
    height: usize,

    /// Tile width and height in cells
    #[arg(long, default_value_t = 512)]
    tile: usize,

    /// Halo radius in cells
    #[arg(long, default_value_t = 4)]
    halo: usize,

    /// Burst length in cells
    #[arg(long, default_value_t = 64)]
    burst: usize,

    /// Maximum number of generations per pass
    #[arg(long)]
    pipeline: Option<usize>,

    /// Number of generations to compute
    #[arg(short, long, default_value_t = 64)]
    generations: i64,

    /// Execution strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Auto)]
    strategy: Strategy,

    /// Print the runtime sample as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Auto,
    Monotile,
    Tiling,
}

impl From<Strategy> for StrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Auto => StrategyKind::Auto,
            Strategy::Monotile => StrategyKind::Monotile,
            Strategy::Tiling => StrategyKind::Tiling,
        }
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Mean of the four direct neighbors.
fn diffuse(stencil: &Stencil<f32>) -> f32 {
    (stencil[Id::new(-1, 0)]
        + stencil[Id::new(1, 0)]
        + stencil[Id::new(0, -1)]
        + stencil[Id::new(0, 1)])
        * 0.25
}

async fn execute(cli: &Cli) -> Result<RuntimeSample> {
    let mut builder = StencilConfig::builder()
        .tile(cli.tile, cli.tile)
        .halo_radius(cli.halo)
        .burst_length(cli.burst)
        .strategy(cli.strategy.into());
    if let Some(pipeline) = cli.pipeline {
        builder = builder.pipeline_length(pipeline);
    }
    let config = builder.build()?;

    let center = Uid::new(cli.width / 2, cli.height / 2);
    let area = cli.width.checked_mul(cli.height).ok_or_else(|| {
        StencilError::invalid_argument(format!("{}x{} grid is too large", cli.width, cli.height))
    })?;
    let mut cells = vec![0.0f32; area];
    if let Some(cell) = cells.get_mut(center.linear(cli.height)) {
        *cell = 1_000.0;
    }
    let grid = Grid::from_vec(cli.width, cli.height, cells, config.geometry)?;

    let executor = SingleQueueExecutor::new(config, grid, diffuse, 0.0)?;
    info!(
        "Running {} generations on {}x{} ({:?})",
        cli.generations,
        cli.width,
        cli.height,
        executor.strategy_kind()
    );

    executor.run(cli.generations).await?;

    let output = executor.copy_output();
    let heat: f64 = output.as_slice().iter().map(|&v| f64::from(v)).sum();
    info!("Remaining heat: {:.3}", heat);

    Ok(executor.get_runtime_sample())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match execute(&cli).await {
        Ok(sample) => {
            if cli.json {
                match serde_json::to_string_pretty(&sample) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else if !cli.quiet {
                println!("Passes:        {}", sample.get_n_passes());
                println!("Total runtime: {:.6} s", sample.get_total_runtime());
                println!("Pass runtime:  {:.6} s", sample.get_mean_pass_runtime());
                println!("Mean speed:    {:.3e} cells/s", sample.get_mean_speed());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
