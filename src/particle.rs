// Defines the particle struct (position, velocity, accumulated
// acceleration) and the two per-step kernels that touch a single particle:
// the pairwise repulsion and the Verlet-style advance.

use crate::config;
use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pos: DVec2,
    pub vel: DVec2,
    pub acc: DVec2,
}

impl Particle {
    pub fn new(pos: DVec2, vel: DVec2) -> Self {
        Self {
            pos,
            vel,
            acc: DVec2::zero(),
        }
    }

    /// Accumulate the short-range repulsion exerted by `other` onto this
    /// particle's acceleration.
    ///
    /// A no-op past the cutoff. The squared distance is floored at
    /// `MIN_R²` so the coefficient stays finite for overlapping pairs.
    /// One-sided: the mirror-image contribution lands when the traversal
    /// visits `other` as a target.
    pub fn apply_force(&mut self, other: &Particle) {
        let d = other.pos - self.pos;
        let mut r2 = d.mag_sq();
        if r2 > config::CUTOFF * config::CUTOFF {
            return;
        }
        r2 = r2.max(config::MIN_R * config::MIN_R);
        let r = r2.sqrt();

        // very simple short-range repulsive force
        let coef = (1.0 - config::CUTOFF / r) / r2 / config::MASS;
        self.acc += d * coef;
    }

    /// Slightly simplified velocity Verlet update, then elastic reflection
    /// off the domain walls. The loops keep folding the coordinate back
    /// until it lands in `[0, size]`, which covers particles that overshoot
    /// the domain by more than one width in a single step. The
    /// acceleration is zeroed after use.
    pub fn advance(&mut self, size: f64) {
        self.vel += self.acc * config::DT;
        self.pos += self.vel * config::DT;

        while self.pos.x < 0.0 || self.pos.x > size {
            self.pos.x = if self.pos.x < 0.0 {
                -self.pos.x
            } else {
                2.0 * size - self.pos.x
            };
            self.vel.x = -self.vel.x;
        }
        while self.pos.y < 0.0 || self.pos.y > size {
            self.pos.y = if self.pos.y < 0.0 {
                -self.pos.y
            } else {
                2.0 * size - self.pos.y
            };
            self.vel.y = -self.vel.y;
        }

        self.acc = DVec2::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_force_past_cutoff() {
        let mut p = Particle::new(DVec2::zero(), DVec2::zero());
        let q = Particle::new(DVec2::new(config::CUTOFF * 1.5, 0.0), DVec2::zero());
        p.apply_force(&q);
        assert_eq!(p.acc, DVec2::zero());
    }

    #[test]
    fn force_is_repulsive_inside_cutoff() {
        let mut p = Particle::new(DVec2::zero(), DVec2::zero());
        let q = Particle::new(DVec2::new(config::CUTOFF * 0.5, 0.0), DVec2::zero());
        p.apply_force(&q);
        // q sits to the right, so p must be pushed left
        assert!(p.acc.x < 0.0);
        assert_eq!(p.acc.y, 0.0);
    }

    #[test]
    fn coincident_pair_stays_finite() {
        let mut p = Particle::new(DVec2::new(0.3, 0.3), DVec2::zero());
        let q = Particle::new(DVec2::new(0.3, 0.3), DVec2::zero());
        p.apply_force(&q);
        // the separation vector is zero, so the clamped coefficient
        // multiplies into a zero update
        assert!(p.acc.x.is_finite() && p.acc.y.is_finite());
        assert_eq!(p.acc, DVec2::zero());
    }

    #[test]
    fn wall_reflects_position_and_velocity() {
        let size = 1.0;
        let mut p = Particle::new(DVec2::new(size - 1.0e-4, 0.5), DVec2::new(0.5, 0.0));
        p.advance(size);
        // crossed by delta = 0.5 * DT - 1e-4 = 1.5e-4, comes back by as much
        let delta = 0.5 * config::DT - 1.0e-4;
        assert!((p.pos.x - (size - delta)).abs() < 1.0e-12);
        assert_eq!(p.vel.x, -0.5);
        assert_eq!(p.vel.y, 0.0);
    }

    #[test]
    fn reflection_handles_multi_domain_overshoot() {
        let size = 1.0;
        let mut p = Particle::new(DVec2::new(0.5, 0.5), DVec2::new(10_000.0, -7_000.0));
        p.advance(size);
        assert!(p.pos.x >= 0.0 && p.pos.x <= size);
        assert!(p.pos.y >= 0.0 && p.pos.y <= size);
    }

    #[test]
    fn advance_zeroes_acceleration() {
        let mut p = Particle::new(DVec2::new(0.5, 0.5), DVec2::zero());
        p.acc = DVec2::new(1.0, -2.0);
        p.advance(1.0);
        assert_eq!(p.acc, DVec2::zero());
    }
}
