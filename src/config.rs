// Centralized configuration: tuned physics constants, run defaults, and
// the optional TOML run file.

use serde::Deserialize;
use std::fs;
use std::path::Path;

// ====================
// Tuned physics constants
// ====================
/// Particles per unit area; the domain side is chosen from the particle
/// count so this stays constant across runs.
pub const DENSITY: f64 = 0.0005;
/// Particle mass.
pub const MASS: f64 = 0.01;
/// Interaction cutoff radius. Also the cell edge length, which is what
/// guarantees that interacting pairs are never more than one cell apart.
pub const CUTOFF: f64 = 0.01;
/// Minimum interaction radius; floors 1/r for nearly coincident pairs.
pub const MIN_R: f64 = CUTOFF / 100.0;
/// Integration time step.
pub const DT: f64 = 0.0005;

// ====================
// Run defaults
// ====================
pub const DEFAULT_PARTICLES: usize = 1000;
pub const DEFAULT_STEPS: usize = 1000;
pub const DEFAULT_SAVE_EVERY: usize = 10;
pub const DEFAULT_WORKERS: usize = 2;

/// Optional `[run]` table loaded from a TOML file. Every field may be
/// omitted; command-line flags win over file values and both fall back to
/// the defaults above.
#[derive(Debug, Default, Deserialize)]
pub struct RunFile {
    pub run: Option<RunOptions>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunOptions {
    pub particles: Option<usize>,
    pub steps: Option<usize>,
    pub save_every: Option<usize>,
    pub workers: Option<usize>,
    pub backend: Option<String>,
    pub seed: Option<u64>,
    pub output: Option<String>,
}

impl RunFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let file: RunFile = toml::from_str(&content)?;
        Ok(file)
    }

    pub fn options(self) -> RunOptions {
        self.run.unwrap_or_default()
    }
}
