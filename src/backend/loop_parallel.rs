//! Data-parallel driver: each phase is one rayon parallel loop with its
//! implicit barrier at the end; the rebuild runs on the calling thread
//! between loops, playing the elected worker.

use super::{RunSettings, SharedPtr};
use crate::forces;
use crate::io::TrajectoryWriter;
use crate::simulation::Simulation;
use rayon::prelude::*;
use std::io;
use ultraviolet::DVec2;

pub fn run(
    settings: &RunSettings,
    sim: &mut Simulation,
    sink: &mut Option<TrajectoryWriter>,
) -> io::Result<()> {
    let save_every = settings.save_every.max(1);
    let size = sim.grid.size();
    let n = sim.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.workers.max(1))
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    pool.install(|| {
        for step in 0..settings.steps {
            sim.particles
                .par_iter_mut()
                .for_each(|p| p.acc = DVec2::zero());

            {
                let particles = SharedPtr(sim.particles.as_mut_ptr());
                let grid = &sim.grid;
                (0..grid.cell_count()).into_par_iter().for_each(|cell| {
                    // SAFETY: a particle's acceleration is written only
                    // while its home cell is visited, each cell is visited
                    // by exactly one task, and this loop writes no
                    // position.
                    unsafe { forces::accumulate_cell(grid, cell, particles.get(), 0..n) };
                });
            }

            {
                let grid = &sim.grid;
                sim.particles
                    .par_iter_mut()
                    .zip(sim.cell_ids.par_iter_mut())
                    .for_each(|(p, id)| {
                        p.advance(size);
                        *id = grid.cell_index(p.pos);
                    });
            }

            // the pool is quiescent between parallel loops
            sim.grid.rebuild(&sim.cell_ids);
            debug_assert_eq!(sim.grid.population(), n);

            if let Some(writer) = sink.as_mut() {
                if step % save_every == 0 {
                    writer.write_frame(&sim.particles, size)?;
                }
            }
        }
        Ok(())
    })
}
