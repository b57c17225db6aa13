//! Replicated driver: lockstep full-state replication across ranks that
//! share no memory, built from allgather/broadcast-style collective
//! exchanges.
//!
//! Every rank owns a contiguous slice of the particle array and a private
//! replica of the whole state. Each step the ranks exchange owned chunks so
//! every replica is fully consistent, rank 0 re-derives the particle→cell
//! map from the gathered positions, rebuilds its bins and broadcasts the
//! membership, and only then does each rank compute on its own slice.
//! Communication volume is O(n) per rank per step regardless of rank count
//! — correctness over scale, kept exactly as documented.

use super::RunSettings;
use crate::forces;
use crate::io::TrajectoryWriter;
use crate::particle::Particle;
use crate::partition;
use crate::simulation::Simulation;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::collections::VecDeque;
use std::io;
use std::ops::Range;
use ultraviolet::DVec2;

#[derive(Clone)]
enum Message {
    /// One rank's owned particles for a step (the allgather leg).
    Chunk {
        step: usize,
        rank: usize,
        particles: Vec<Particle>,
    },
    /// Rank 0's freshly rebuilt membership (the broadcast leg).
    Membership {
        step: usize,
        cells: Vec<Vec<usize>>,
    },
}

/// Step-ordered mailbox over a rank's receiver. Channels are FIFO per
/// sender only, so a chunk from a rank that already raced ahead one step is
/// parked until its step comes up.
struct Mailbox {
    rx: Receiver<Message>,
    parked: VecDeque<Message>,
}

impl Mailbox {
    fn new(rx: Receiver<Message>) -> Self {
        Self {
            rx,
            parked: VecDeque::new(),
        }
    }

    /// Collect the owned chunk of every peer rank for `step`.
    fn gather_chunks(&mut self, step: usize, peers: usize, into: &mut Vec<(usize, Vec<Particle>)>) {
        into.clear();
        let mut parked_left = self.parked.len();
        while into.len() < peers {
            let msg = if parked_left > 0 {
                parked_left -= 1;
                self.parked.pop_front().expect("parked message count")
            } else {
                self.rx.recv().expect("peer rank hung up mid-step")
            };
            match msg {
                Message::Chunk {
                    step: s,
                    rank,
                    particles,
                } if s == step => into.push((rank, particles)),
                other => self.parked.push_back(other),
            }
        }
    }

    fn recv_membership(&mut self, step: usize) -> Vec<Vec<usize>> {
        let mut parked_left = self.parked.len();
        loop {
            let msg = if parked_left > 0 {
                parked_left -= 1;
                self.parked.pop_front().expect("parked message count")
            } else {
                self.rx.recv().expect("rank 0 hung up mid-step")
            };
            match msg {
                Message::Membership { step: s, cells } if s == step => return cells,
                other => self.parked.push_back(other),
            }
        }
    }
}

pub fn run(
    settings: &RunSettings,
    sim: &mut Simulation,
    sink: &mut Option<TrajectoryWriter>,
) -> io::Result<()> {
    let ranks = settings.workers.max(1);
    let all_ranges = partition::ranges(sim.len(), ranks);
    let settings = *settings;

    let (txs, rxs): (Vec<Sender<Message>>, Vec<Receiver<Message>>) =
        (0..ranks).map(|_| unbounded()).unzip();

    std::thread::scope(|s| {
        let mut rx_iter = rxs.into_iter();
        let rank0_mailbox = Mailbox::new(rx_iter.next().expect("rank 0 receiver"));

        for (id, rx) in rx_iter.enumerate().map(|(i, rx)| (i + 1, rx)) {
            // every rank starts from an identical replica, the moral
            // equivalent of the initial scatter + broadcast
            let mut replica = sim.clone();
            let peers = txs.clone();
            let ranges = all_ranges.clone();
            s.spawn(move || {
                // non-zero ranks carry no sink, so the result is always Ok
                let _ = rank_loop(
                    id,
                    ranks,
                    &ranges,
                    &mut replica,
                    peers,
                    Mailbox::new(rx),
                    settings,
                    &mut None,
                );
            });
        }

        rank_loop(
            0,
            ranks,
            &all_ranges,
            sim,
            txs.clone(),
            rank0_mailbox,
            settings,
            sink,
        )
    })
}

#[allow(clippy::too_many_arguments)]
fn rank_loop(
    id: usize,
    ranks: usize,
    all_ranges: &[Range<usize>],
    sim: &mut Simulation,
    peers: Vec<Sender<Message>>,
    mut mailbox: Mailbox,
    settings: RunSettings,
    sink: &mut Option<TrajectoryWriter>,
) -> io::Result<()> {
    let save_every = settings.save_every.max(1);
    let size = sim.grid.size();
    let n = sim.len();
    let range = all_ranges[id].clone();
    let mut io_result = Ok(());
    let mut gathered = Vec::new();

    for step in 0..settings.steps {
        // Allgather: publish the owned chunk, splice in everyone else's.
        if ranks > 1 {
            let own = sim.particles[range.clone()].to_vec();
            for (peer, tx) in peers.iter().enumerate() {
                if peer != id {
                    let _ = tx.send(Message::Chunk {
                        step,
                        rank: id,
                        particles: own.clone(),
                    });
                }
            }
            mailbox.gather_chunks(step, ranks - 1, &mut gathered);
            for (peer, chunk) in gathered.drain(..) {
                sim.particles[all_ranges[peer].clone()].copy_from_slice(&chunk);
            }
        }

        // Rank 0 re-derives the map from the gathered positions, rebuilds,
        // and broadcasts the membership; the rest install its copy.
        if id == 0 {
            sim.refresh_cell_ids();
            sim.grid.rebuild(&sim.cell_ids);
            if ranks > 1 {
                let cells = sim.grid.export_members();
                for (peer, tx) in peers.iter().enumerate() {
                    if peer != 0 {
                        let _ = tx.send(Message::Membership {
                            step,
                            cells: cells.clone(),
                        });
                    }
                }
            }
        } else {
            let cells = mailbox.recv_membership(step);
            sim.grid.import_members(cells);
        }
        debug_assert_eq!(sim.grid.population(), n);

        // Frame sampled from the gathered array before this step's
        // compute, so written frames lag the shared-memory drivers by one
        // integration.
        if id == 0 && step % save_every == 0 {
            if let Some(writer) = sink.as_mut() {
                if io_result.is_ok() {
                    io_result = writer.write_frame(&sim.particles, size);
                }
            }
        }

        // Local compute on the owned slice only.
        for p in &mut sim.particles[range.clone()] {
            p.acc = DVec2::zero();
        }
        {
            let ptr = sim.particles.as_mut_ptr();
            let grid = &sim.grid;
            for cell in 0..grid.cell_count() {
                // SAFETY: private replica, single thread.
                unsafe { forces::accumulate_cell(grid, cell, ptr, range.clone()) };
            }
        }
        {
            let grid = &sim.grid;
            let ids = &mut sim.cell_ids[range.clone()];
            for (p, id_slot) in sim.particles[range.clone()].iter_mut().zip(ids.iter_mut()) {
                p.advance(size);
                *id_slot = grid.cell_index(p.pos);
            }
        }
    }

    // Final collection so the returned state holds every rank's last
    // integration, not just rank 0's.
    if id == 0 {
        if ranks > 1 {
            mailbox.gather_chunks(settings.steps, ranks - 1, &mut gathered);
            for (peer, chunk) in gathered.drain(..) {
                sim.particles[all_ranges[peer].clone()].copy_from_slice(&chunk);
            }
        }
        sim.refresh_cell_ids();
        sim.grid.rebuild(&sim.cell_ids);
    } else {
        let own = sim.particles[range.clone()].to_vec();
        let _ = peers[0].send(Message::Chunk {
            step: settings.steps,
            rank: id,
            particles: own,
        });
    }

    io_result
}
