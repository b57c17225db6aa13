//! Shared-memory driver: statically range-partitioned workers on scoped
//! threads, phase-separated by one reusable counting barrier.
//!
//! Worker 0 runs on the calling thread and is the designated rebuilder and
//! frame writer. The step protocol is: every worker resets and traverses
//! its own targets, barrier; every worker integrates and re-maps its own
//! range, barrier; worker 0 alone rebuilds the bins (and samples a frame)
//! while the rest wait, barrier. Between two barriers no worker writes
//! outside its owned range, and membership is only written inside worker
//! 0's exclusive window — that protocol is the safety argument for the raw
//! sharing below.

use super::{RunSettings, SharedPtr};
use crate::forces;
use crate::grid::CellGrid;
use crate::io::TrajectoryWriter;
use crate::particle::Particle;
use crate::partition;
use crate::simulation::Simulation;
use std::io;
use std::ops::Range;
use std::sync::Barrier;
use ultraviolet::DVec2;

#[derive(Clone, Copy)]
struct Shared {
    particles: SharedPtr<Particle>,
    cell_ids: SharedPtr<usize>,
    grid: SharedPtr<CellGrid>,
    n: usize,
}

pub fn run(
    settings: &RunSettings,
    sim: &mut Simulation,
    sink: &mut Option<TrajectoryWriter>,
) -> io::Result<()> {
    let workers = settings.workers.max(1);
    let ranges = partition::ranges(sim.len(), workers);
    let barrier = Barrier::new(workers);
    let shared = Shared {
        particles: SharedPtr(sim.particles.as_mut_ptr()),
        cell_ids: SharedPtr(sim.cell_ids.as_mut_ptr()),
        grid: SharedPtr(&mut sim.grid as *mut CellGrid),
        n: sim.len(),
    };
    let settings = *settings;

    std::thread::scope(|s| {
        for id in 1..workers {
            let range = ranges[id].clone();
            let barrier = &barrier;
            s.spawn(move || {
                // only worker 0 carries a sink, so this result is always Ok
                let _ = worker(id, range, shared, settings, barrier, &mut None);
            });
        }
        // worker 0 on the calling thread, owning the sink
        worker(0, ranges[0].clone(), shared, settings, &barrier, sink)
    })
}

fn worker(
    id: usize,
    range: Range<usize>,
    shared: Shared,
    settings: RunSettings,
    barrier: &Barrier,
    sink: &mut Option<TrajectoryWriter>,
) -> io::Result<()> {
    let save_every = settings.save_every.max(1);
    // Geometry is fixed after construction; only membership changes.
    let size = unsafe { (*shared.grid.get()).size() };
    let mut io_result = Ok(());

    for step in 0..settings.steps {
        // Reset: own accelerations only.
        for i in range.clone() {
            // SAFETY: `range` is this worker's exclusive slice.
            unsafe { (*shared.particles.get().add(i)).acc = DVec2::zero() };
        }

        // Traverse: every cell, own targets only. No position is written
        // by anyone until the barrier below has passed.
        {
            // SAFETY: membership is stable between rebuild windows.
            let grid = unsafe { &*shared.grid.get() };
            for cell in 0..grid.cell_count() {
                // SAFETY: writes are confined to `range`.
                unsafe {
                    forces::accumulate_cell(grid, cell, shared.particles.get(), range.clone())
                };
            }
        }
        barrier.wait();

        // Integrate and re-map: own particles, own map slots.
        {
            // SAFETY: membership is stable between rebuild windows.
            let grid = unsafe { &*shared.grid.get() };
            for i in range.clone() {
                // SAFETY: `range` is this worker's exclusive slice.
                unsafe {
                    let p = &mut *shared.particles.get().add(i);
                    p.advance(size);
                    *shared.cell_ids.get().add(i) = grid.cell_index(p.pos);
                }
            }
        }
        barrier.wait();

        // Rebuild (and sample): worker 0 alone, everyone else parked at
        // the next barrier.
        if id == 0 {
            // SAFETY: all other workers sit between the surrounding
            // barriers; nothing reads membership or positions here.
            unsafe {
                let grid = &mut *shared.grid.get();
                let cell_ids = std::slice::from_raw_parts(shared.cell_ids.get(), shared.n);
                grid.rebuild(cell_ids);
                debug_assert_eq!(grid.population(), shared.n);
            }

            if step % save_every == 0 {
                if let Some(writer) = sink.as_mut() {
                    if io_result.is_ok() {
                        // SAFETY: exclusive window, see above.
                        let all =
                            unsafe { std::slice::from_raw_parts(shared.particles.get(), shared.n) };
                        io_result = writer.write_frame(all, size);
                    }
                }
            }
        }
        barrier.wait();
    }
    io_result
}
