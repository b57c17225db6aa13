//! Run orchestration: state construction (fresh or resumed), backend
//! dispatch, wall-clock timing, and final checkpointing.

use crate::backend::{self, Backend, RunSettings};
use crate::io::{self, SimulationState, TrajectoryWriter};
use crate::simulation::Simulation;
use std::path::PathBuf;
use std::time::Instant;

/// Everything a run needs, fully resolved (CLI over run file over
/// defaults).
pub struct RunPlan {
    pub particles: usize,
    pub steps: usize,
    pub save_every: usize,
    pub workers: usize,
    pub backend: Backend,
    pub seed: u64,
    pub output: Option<PathBuf>,
    pub checkpoint: Option<PathBuf>,
    pub resume: Option<PathBuf>,
}

pub struct RunReport {
    pub particles: usize,
    pub workers: usize,
    pub backend: Backend,
    pub seconds: f64,
}

pub fn run(plan: RunPlan) -> std::io::Result<RunReport> {
    let mut sim = match &plan.resume {
        Some(path) => io::load_state(path)?.into_simulation(),
        None => Simulation::new(plan.particles, plan.seed),
    };
    let particles = sim.len();

    let mut sink = match &plan.output {
        Some(path) => Some(TrajectoryWriter::create(path)?),
        None => None,
    };

    let settings = RunSettings {
        steps: plan.steps,
        save_every: plan.save_every,
        workers: plan.workers,
    };

    let start = Instant::now();
    backend::run(plan.backend, &settings, &mut sim, &mut sink)?;
    let seconds = start.elapsed().as_secs_f64();

    if let Some(writer) = sink {
        writer.finish()?;
    }
    if let Some(path) = &plan.checkpoint {
        io::save_state(path, &SimulationState::from_simulation(&sim, plan.steps))?;
    }

    #[cfg(feature = "profiling")]
    crate::PROFILER.lock().print_and_clear();

    Ok(RunReport {
        particles,
        workers: plan.workers,
        backend: plan.backend,
        seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shortrange_app_{}_{}", std::process::id(), name))
    }

    fn plan(n: usize, steps: usize) -> RunPlan {
        RunPlan {
            particles: n,
            steps,
            save_every: 10,
            workers: 2,
            backend: Backend::Serial,
            seed: 42,
            output: None,
            checkpoint: None,
            resume: None,
        }
    }

    #[test]
    fn run_reports_the_actual_particle_count() {
        let report = run(plan(64, 5)).unwrap();
        assert_eq!(report.particles, 64);
        assert_eq!(report.backend, Backend::Serial);
        assert!(report.seconds >= 0.0);
    }

    #[test]
    fn checkpoint_then_resume_continues_from_saved_positions() {
        let snapshot = temp_path("checkpoint.json");
        let mut first = plan(50, 8);
        first.checkpoint = Some(snapshot.clone());
        run(first).unwrap();

        let mut second = plan(50, 0);
        second.resume = Some(snapshot.clone());
        let report = run(second).unwrap();
        assert_eq!(report.particles, 50);

        // the resumed zero-step run leaves exactly the saved positions
        let saved = io::load_state(&snapshot).unwrap().into_simulation();
        let direct = {
            let mut sim = Simulation::new(50, 42);
            let settings = RunSettings {
                steps: 8,
                save_every: 10,
                workers: 1,
            };
            backend::run(Backend::Serial, &settings, &mut sim, &mut None).unwrap();
            sim
        };
        for (a, b) in saved.particles.iter().zip(&direct.particles) {
            assert_eq!(a.pos, b.pos);
        }
        std::fs::remove_file(&snapshot).ok();
    }

    #[test]
    fn trajectory_sampling_counts_frames() {
        let out = temp_path("traj.txt");
        let mut p = plan(10, 25);
        p.output = Some(out.clone());
        run(p).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        // steps 0, 10, 20 sampled: header + 3 frames of 10 particles
        assert_eq!(text.lines().count(), 1 + 3 * 10);
        std::fs::remove_file(&out).ok();
    }
}
