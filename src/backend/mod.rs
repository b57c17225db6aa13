//! Per-step drivers: the same four-phase step — reset accelerations,
//! traverse cells, integrate and re-map, rebuild bins — executed under four
//! different concurrency disciplines.

pub mod loop_parallel;
pub mod replicated;
pub mod serial;
pub mod threads;


use crate::io::TrajectoryWriter;
use crate::simulation::Simulation;
use std::fmt;
use std::io;
use std::str::FromStr;

/// Which concurrency discipline runs the step loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// One sequential pass, no synchronization.
    Serial,
    /// Range-partitioned workers over shared memory, barrier-separated.
    Threads,
    /// One rayon parallel loop per phase.
    LoopParallel,
    /// Rank-per-thread full-state replication, message passing only.
    Replicated,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "serial" => Ok(Self::Serial),
            "threads" => Ok(Self::Threads),
            "loop" | "rayon" => Ok(Self::LoopParallel),
            "replicated" => Ok(Self::Replicated),
            other => Err(format!(
                "unknown backend `{other}` (expected serial, threads, loop, or replicated)"
            )),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serial => "serial",
            Self::Threads => "threads",
            Self::LoopParallel => "loop",
            Self::Replicated => "replicated",
        })
    }
}

/// Step-loop parameters shared by every driver.
#[derive(Clone, Copy, Debug)]
pub struct RunSettings {
    pub steps: usize,
    /// Write a trajectory frame every this many steps when a sink is given.
    pub save_every: usize,
    /// Worker threads (threads / loop) or ranks (replicated). Ignored by
    /// the serial driver.
    pub workers: usize,
}

/// Advance `sim` by `settings.steps` steps under the chosen driver,
/// sampling frames into `sink` when one is present.
pub fn run(
    backend: Backend,
    settings: &RunSettings,
    sim: &mut Simulation,
    sink: &mut Option<TrajectoryWriter>,
) -> io::Result<()> {
    match backend {
        Backend::Serial => serial::run(settings, sim, sink),
        Backend::Threads => threads::run(settings, sim, sink),
        Backend::LoopParallel => loop_parallel::run(settings, sim, sink),
        Backend::Replicated => replicated::run(settings, sim, sink),
    }
}

/// Raw pointer the barrier-synchronized drivers share across workers.
///
/// Soundness rests on the phase protocol, not on this type: between
/// barriers a worker writes only elements its range (or home cell) owns,
/// and reads never overlap writes to the same element.
pub(crate) struct SharedPtr<T>(pub *mut T);

impl<T> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SharedPtr<T> {}

unsafe impl<T> Send for SharedPtr<T> {}
unsafe impl<T> Sync for SharedPtr<T> {}

impl<T> SharedPtr<T> {
    pub fn get(self) -> *mut T {
        self.0
    }
}
