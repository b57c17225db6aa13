//! Sequential driver: one pass through the four phases per step.

use super::RunSettings;
use crate::forces;
use crate::io::TrajectoryWriter;
use crate::profile_scope;
use crate::simulation::Simulation;
use std::io;
use ultraviolet::DVec2;

pub fn run(
    settings: &RunSettings,
    sim: &mut Simulation,
    sink: &mut Option<TrajectoryWriter>,
) -> io::Result<()> {
    let save_every = settings.save_every.max(1);
    let size = sim.grid.size();

    for step in 0..settings.steps {
        {
            profile_scope!("reset");
            for p in &mut sim.particles {
                p.acc = DVec2::zero();
            }
        }
        {
            profile_scope!("traverse");
            forces::accumulate_all(&sim.grid, &mut sim.particles);
        }
        {
            profile_scope!("integrate");
            for (p, id) in sim.particles.iter_mut().zip(sim.cell_ids.iter_mut()) {
                p.advance(size);
                *id = sim.grid.cell_index(p.pos);
            }
        }
        {
            profile_scope!("rebuild");
            sim.grid.rebuild(&sim.cell_ids);
        }
        debug_assert_eq!(sim.grid.population(), sim.len());

        if let Some(writer) = sink.as_mut() {
            if step % save_every == 0 {
                writer.write_frame(&sim.particles, size)?;
            }
        }
    }
    Ok(())
}
