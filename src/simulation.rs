//! Owned simulation state: the particle array, the particle→cell map, and
//! the bin lattice. Every step phase borrows this struct instead of
//! touching process-wide globals, which keeps the hand-off to the single
//! rebuilding worker explicit.

use crate::grid::CellGrid;
use crate::particle::Particle;
use crate::scenario;

#[derive(Clone)]
pub struct Simulation {
    pub particles: Vec<Particle>,
    /// One entry per particle: the cell it currently occupies. Refreshed
    /// from the post-move position every step, consumed by the rebuild.
    pub cell_ids: Vec<usize>,
    pub grid: CellGrid,
}

impl Simulation {
    /// Fresh state: geometry from the particle count, lattice placement,
    /// initial binning.
    pub fn new(n: usize, seed: u64) -> Self {
        let grid = CellGrid::new(n);
        let particles = scenario::place(n, grid.size(), seed);
        Self::from_particles(particles)
    }

    /// State wrapped around an existing particle set (snapshot resume, test
    /// fixtures). Geometry depends only on the count, so it is re-derived.
    pub fn from_particles(particles: Vec<Particle>) -> Self {
        let grid = CellGrid::new(particles.len());
        let mut sim = Self {
            cell_ids: vec![0; particles.len()],
            particles,
            grid,
        };
        sim.refresh_cell_ids();
        sim.grid.rebuild(&sim.cell_ids);
        sim
    }

    /// Recompute every map entry from the current positions.
    pub fn refresh_cell_ids(&mut self) {
        for (p, id) in self.particles.iter().zip(self.cell_ids.iter_mut()) {
            *id = self.grid.cell_index(p.pos);
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_fully_binned() {
        let sim = Simulation::new(250, 4);
        assert_eq!(sim.len(), 250);
        assert_eq!(sim.cell_ids.len(), 250);
        assert_eq!(sim.grid.population(), 250);
    }

    #[test]
    fn map_matches_positions_after_refresh() {
        let mut sim = Simulation::new(120, 8);
        sim.refresh_cell_ids();
        for (p, &id) in sim.particles.iter().zip(&sim.cell_ids) {
            assert_eq!(sim.grid.cell_index(p.pos), id);
        }
    }
}
