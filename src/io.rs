//! Trajectory output and whole-state snapshots.

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::particle::Particle;
use crate::simulation::Simulation;

/// Plain-text trajectory sink: a single `n size` header line on the first
/// frame, then one `x y` line per particle per sampled frame.
pub struct TrajectoryWriter {
    out: BufWriter<File>,
    wrote_header: bool,
}

impl TrajectoryWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
            wrote_header: false,
        })
    }

    pub fn write_frame(&mut self, particles: &[Particle], size: f64) -> io::Result<()> {
        if !self.wrote_header {
            writeln!(self.out, "{} {}", particles.len(), size)?;
            self.wrote_header = true;
        }
        for p in particles {
            writeln!(self.out, "{} {}", p.pos.x, p.pos.y)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Serializable capture of a run's particle state.
#[derive(Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub particles: Vec<Particle>,
    /// Step count the capture was taken at.
    pub step: usize,
}

impl SimulationState {
    pub fn from_simulation(sim: &Simulation, step: usize) -> Self {
        Self {
            particles: sim.particles.clone(),
            step,
        }
    }

    /// Rehydrate: geometry and binning are re-derived from the particles.
    pub fn into_simulation(self) -> Simulation {
        Simulation::from_particles(self.particles)
    }
}

/// Write a snapshot. A `.json` / `.json.gz` path selects a JSON body,
/// anything else bincode; a trailing `.gz` wraps the body in gzip. The
/// bytes go through a temporary file and a rename so an interrupted save
/// cannot truncate an existing snapshot.
pub fn save_state<P: AsRef<Path>>(path: P, state: &SimulationState) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let name = path.to_string_lossy();
    let gzip = name.ends_with(".gz");
    let json = name.trim_end_matches(".gz").ends_with(".json");

    let tmp_path = path.with_extension({
        let mut os = path.extension().map(|e| e.to_os_string()).unwrap_or_default();
        os.push(".tmp");
        os
    });
    {
        let writer = BufWriter::new(File::create(&tmp_path)?);
        match (json, gzip) {
            (true, false) => serde_json::to_writer(writer, state).map_err(into_io_error)?,
            (true, true) => {
                let mut encoder = GzEncoder::new(writer, Compression::fast());
                serde_json::to_writer(&mut encoder, state).map_err(into_io_error)?;
                encoder.finish()?.flush()?;
            }
            (false, false) => bincode::serialize_into(writer, state).map_err(into_io_error)?,
            (false, true) => {
                let mut encoder = GzEncoder::new(writer, Compression::fast());
                bincode::serialize_into(&mut encoder, state).map_err(into_io_error)?;
                encoder.finish()?.flush()?;
            }
        }
    }
    std::fs::rename(&tmp_path, path)
}

/// Read a snapshot written by [`save_state`], sniffing gzip by magic bytes
/// and trying JSON before falling back to bincode.
pub fn load_state<P: AsRef<Path>>(path: P) -> io::Result<SimulationState> {
    let data = std::fs::read(path.as_ref())?;
    let body = match maybe_decompress_gzip(&data)? {
        Some(decoded) => decoded,
        None => data,
    };
    if let Ok(state) = serde_json::from_slice::<SimulationState>(&body) {
        return Ok(state);
    }
    bincode::deserialize(&body).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "snapshot is neither JSON nor bincode",
        )
    })
}

fn maybe_decompress_gzip(data: &[u8]) -> io::Result<Option<Vec<u8>>> {
    if data.len() < 2 || data[0] != 0x1f || data[1] != 0x8b {
        return Ok(None);
    }
    let mut decoder = GzDecoder::new(Cursor::new(data));
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(Some(decoded))
}

fn into_io_error<E: Into<Box<dyn std::error::Error + Send + Sync>>>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("shortrange_{}_{}", std::process::id(), name))
    }

    #[test]
    fn trajectory_has_header_then_one_line_per_particle_per_frame() {
        let path = temp_path("traj.txt");
        let sim = Simulation::new(3, 2);
        {
            let mut writer = TrajectoryWriter::create(&path).unwrap();
            writer.write_frame(&sim.particles, sim.grid.size()).unwrap();
            writer.write_frame(&sim.particles, sim.grid.size()).unwrap();
            writer.finish().unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 2 * 3);
        assert!(lines[0].starts_with("3 "));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn json_snapshot_round_trips() {
        let path = temp_path("state.json");
        let sim = Simulation::new(40, 6);
        save_state(&path, &SimulationState::from_simulation(&sim, 17)).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded.step, 17);
        assert_eq!(loaded.particles, sim.particles);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn gzipped_bincode_snapshot_round_trips() {
        let path = temp_path("state.bin.gz");
        let sim = Simulation::new(25, 13);
        save_state(&path, &SimulationState::from_simulation(&sim, 0)).unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b][..]);
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded.particles, sim.particles);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn rehydrated_state_is_rebinned() {
        let sim = Simulation::new(30, 21);
        let state = SimulationState::from_simulation(&sim, 5);
        let restored = state.into_simulation();
        assert_eq!(restored.grid.population(), 30);
        assert_eq!(restored.particles, sim.particles);
    }
}
