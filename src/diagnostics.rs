// diagnostics.rs
// Aggregate quantities backing the simulator's checkable properties.

use crate::config;
use crate::particle::Particle;
use ultraviolet::DVec2;

/// Net momentum of the particle set. With symmetric pairwise forces and no
/// wall contact this stays at zero up to floating-point noise.
pub fn total_momentum(particles: &[Particle]) -> DVec2 {
    particles.iter().fold(DVec2::zero(), |acc, p| acc + p.vel) * config::MASS
}

/// Total kinetic energy, ½ m Σ |v|².
pub fn kinetic_energy(particles: &[Particle]) -> f64 {
    0.5 * config::MASS * particles.iter().map(|p| p.vel.mag_sq()).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_velocities_cancel() {
        let particles = vec![
            Particle::new(DVec2::new(0.1, 0.1), DVec2::new(1.0, -0.5)),
            Particle::new(DVec2::new(0.2, 0.2), DVec2::new(-1.0, 0.5)),
        ];
        assert_eq!(total_momentum(&particles), DVec2::zero());
        assert!(kinetic_energy(&particles) > 0.0);
    }

    #[test]
    fn kinetic_energy_of_resting_set_is_zero() {
        let particles = vec![Particle::new(DVec2::new(0.1, 0.1), DVec2::zero())];
        assert_eq!(kinetic_energy(&particles), 0.0);
    }
}
