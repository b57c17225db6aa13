//! Initial particle placement.

use crate::particle::Particle;
use std::time::{SystemTime, UNIX_EPOCH};
use ultraviolet::DVec2;

/// Seed used when the caller supplies none: wall-clock nanos, so repeated
/// unseeded runs differ.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Distribute `n` particles over an evenly spaced lattice inside the
/// domain, drawing lattice sites in shuffled order so the array is not
/// spatially sorted, with velocity components uniform in [-1, 1).
pub fn place(n: usize, size: f64, seed: u64) -> Vec<Particle> {
    fastrand::seed(seed);

    let sx = (n as f64).sqrt().ceil() as usize;
    let sy = (n + sx.max(1) - 1) / sx.max(1);

    let mut shuffle: Vec<usize> = (0..n).collect();
    let mut particles = Vec::with_capacity(n);
    for i in 0..n {
        // draw one of the remaining lattice sites
        let j = fastrand::usize(..n - i);
        let k = shuffle[j];
        shuffle[j] = shuffle[n - i - 1];

        let pos = DVec2::new(
            size * (1.0 + (k % sx) as f64) / (1.0 + sx as f64),
            size * (1.0 + (k / sx) as f64) / (1.0 + sy as f64),
        );
        let vel = DVec2::new(fastrand::f64() * 2.0 - 1.0, fastrand::f64() * 2.0 - 1.0);
        particles.push(Particle::new(pos, vel));
    }
    particles
}
