use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use shortrange::app;
use shortrange::backend::Backend;
use shortrange::config::{self, RunOptions};
use shortrange::scenario;

#[derive(Parser, Debug)]
#[command(about = "Short-range particle interaction simulator")]
struct Args {
    /// Number of particles
    #[arg(short = 'n', long)]
    particles: Option<usize>,

    /// Number of simulation steps
    #[arg(short = 's', long)]
    steps: Option<usize>,

    /// Worker threads (threads/loop backends) or ranks (replicated)
    #[arg(short = 'p', long)]
    workers: Option<usize>,

    /// Concurrency backend: serial, threads, loop, replicated
    #[arg(short = 'b', long)]
    backend: Option<String>,

    /// Trajectory output file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Write a trajectory frame every this many steps
    #[arg(long)]
    save_every: Option<usize>,

    /// Placement RNG seed (wall clock when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// TOML run file supplying any of the above; flags win
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Write the final state to this snapshot file
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Start from a snapshot instead of a fresh placement
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file = match &args.config {
        Some(path) => config::RunFile::load(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("reading run file {}", path.display()))?
            .options(),
        None => RunOptions::default(),
    };

    let particles = args
        .particles
        .or(file.particles)
        .unwrap_or(config::DEFAULT_PARTICLES);
    let steps = args.steps.or(file.steps).unwrap_or(config::DEFAULT_STEPS);
    let save_every = args
        .save_every
        .or(file.save_every)
        .unwrap_or(config::DEFAULT_SAVE_EVERY);
    let workers = args
        .workers
        .or(file.workers)
        .unwrap_or(config::DEFAULT_WORKERS);
    let backend: Backend = args
        .backend
        .or(file.backend)
        .as_deref()
        .unwrap_or("serial")
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let seed = args.seed.or(file.seed).unwrap_or_else(scenario::clock_seed);
    let output = args.output.or(file.output.map(PathBuf::from));

    // reject before anything is allocated
    if particles == 0 && args.resume.is_none() {
        bail!("particle count must be positive");
    }
    if workers == 0 {
        bail!("worker count must be positive");
    }
    if save_every == 0 {
        bail!("save interval must be positive");
    }

    let report = app::run(app::RunPlan {
        particles,
        steps,
        save_every,
        workers,
        backend,
        seed,
        output,
        checkpoint: args.checkpoint,
        resume: args.resume,
    })?;

    println!(
        "n = {}, workers = {}, backend = {}, simulation time = {} seconds",
        report.particles, report.workers, report.backend, report.seconds
    );
    Ok(())
}
