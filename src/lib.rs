pub mod app;
pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod forces;
pub mod grid;
pub mod io;
pub mod particle;
pub mod partition;
pub mod profiler;
pub mod scenario;
pub mod simulation;

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
