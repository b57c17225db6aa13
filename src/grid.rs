//! Uniform cell lattice over the square simulation domain.
//!
//! The cell edge equals the interaction cutoff, so two particles within
//! cutoff distance always sit in the same or an adjacent cell. That bound
//! is what lets the force pass inspect at most nine cells per particle
//! instead of the whole array.

use crate::config;
use smallvec::SmallVec;
use ultraviolet::DVec2;

/// One square bin: the indices of the particles currently inside it plus
/// the precomputed ids of its neighborhood (itself and every in-bounds
/// adjacent cell, at most nine).
#[derive(Clone)]
pub struct Cell {
    members: Vec<usize>,
    neighbors: SmallVec<[usize; 9]>,
}

impl Cell {
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }
}

#[derive(Clone)]
pub struct CellGrid {
    size: f64,
    rows: usize,
    cells: Vec<Cell>,
}

impl CellGrid {
    /// Fix the geometry from the particle count: the domain side keeps the
    /// density constant, and the lattice is `rows × rows` with
    /// `rows = ceil(size / cutoff)`. Neighborhoods are precomputed here and
    /// never change.
    pub fn new(n: usize) -> Self {
        let size = (config::DENSITY * n as f64).sqrt();
        let rows = ((size / config::CUTOFF).ceil() as usize).max(1);
        let cells = (0..rows * rows)
            .map(|id| Cell {
                members: Vec::new(),
                neighbors: neighbor_ids(id, rows),
            })
            .collect();
        Self { size, rows, cells }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, id: usize) -> &Cell {
        &self.cells[id]
    }

    /// Cell id for an in-domain position. A coordinate exactly on the far
    /// wall falls into the last row/column; positions outside `[0, size]`
    /// are an integrator bug, not something the grid repairs.
    pub fn cell_index(&self, pos: DVec2) -> usize {
        debug_assert!(
            pos.x >= 0.0 && pos.x <= self.size && pos.y >= 0.0 && pos.y <= self.size,
            "position ({}, {}) escaped the domain",
            pos.x,
            pos.y
        );
        let row = ((pos.x / config::CUTOFF) as usize).min(self.rows - 1);
        let col = ((pos.y / config::CUTOFF) as usize).min(self.rows - 1);
        row * self.rows + col
    }

    /// Drop all membership and refill it from the particle→cell map. The
    /// member vectors keep their capacity, so steady-state rebuilds do not
    /// allocate.
    pub fn rebuild(&mut self, cell_ids: &[usize]) {
        for cell in &mut self.cells {
            cell.members.clear();
        }
        for (i, &id) in cell_ids.iter().enumerate() {
            self.cells[id].members.push(i);
        }
        debug_assert_eq!(self.population(), cell_ids.len());
    }

    /// Total number of binned particles across all cells.
    pub fn population(&self) -> usize {
        self.cells.iter().map(|c| c.members.len()).sum()
    }

    /// Clone of every cell's member list, for workers that share no memory
    /// and receive membership by message instead.
    pub fn export_members(&self) -> Vec<Vec<usize>> {
        self.cells.iter().map(|c| c.members.clone()).collect()
    }

    pub fn import_members(&mut self, members: Vec<Vec<usize>>) {
        debug_assert_eq!(members.len(), self.cells.len());
        for (cell, m) in self.cells.iter_mut().zip(members) {
            cell.members = m;
        }
    }
}

/// Self plus every in-bounds adjacent cell, ascending scan order. The fixed
/// order keeps per-particle force summation deterministic.
fn neighbor_ids(id: usize, rows: usize) -> SmallVec<[usize; 9]> {
    let col = (id % rows) as isize;
    let row = (id / rows) as isize;
    let mut ids = SmallVec::new();
    for dr in -1..=1isize {
        for dc in -1..=1isize {
            let (r, c) = (row + dr, col + dc);
            if r >= 0 && c >= 0 && r < rows as isize && c < rows as isize {
                ids.push((r * rows as isize + c) as usize);
            }
        }
    }
    ids
}
