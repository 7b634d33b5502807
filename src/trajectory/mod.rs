//! Append-only trajectory recording and replay
//!
//! Snapshots are persisted as JSON Lines: one snapshot object per line,
//! appended and flushed as the run progresses so a failed run keeps every
//! completed step on disk.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;
use thiserror::Error;

use crate::atom::Element;
use crate::configuration::AtomicConfiguration;

/// Errors that can occur while recording or replaying a trajectory
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One accepted configuration along a relaxation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Step counter at which this configuration was evaluated
    pub step: usize,

    /// Potential energy (in eV)
    pub energy: f64,

    /// Maximum per-atom force magnitude after constraint projection
    pub fmax: f64,

    /// Species labels, in atom order
    pub species: Vec<Element>,

    /// Positions, in atom order (in Angstroms)
    pub positions: Vec<Vector3<f64>>,
}

impl Snapshot {
    /// Capture the current state of a configuration
    pub fn of(step: usize, energy: f64, fmax: f64, configuration: &AtomicConfiguration) -> Self {
        Self {
            step,
            energy,
            fmax,
            species: configuration.species(),
            positions: configuration.positions(),
        }
    }
}

/// Ordered, append-only log of snapshots, optionally teed to a file
pub struct TrajectoryRecorder {
    snapshots: Vec<Snapshot>,
    sink: Option<BufWriter<File>>,
}

impl TrajectoryRecorder {
    /// Record snapshots in memory only
    pub fn in_memory() -> Self {
        Self {
            snapshots: Vec::new(),
            sink: None,
        }
    }

    /// Record snapshots in memory and append each one to a file as it arrives
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let file = File::create(path)?;
        Ok(Self {
            snapshots: Vec::new(),
            sink: Some(BufWriter::new(file)),
        })
    }

    /// Append a snapshot to the tail of the log
    pub fn append(&mut self, snapshot: Snapshot) -> Result<(), TrajectoryError> {
        if let Some(sink) = &mut self.sink {
            serde_json::to_writer(&mut *sink, &snapshot)?;
            sink.write_all(b"\n")?;
            sink.flush()?;
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Number of recorded snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Iterate over the recorded snapshots in append order
    pub fn read_all(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// All recorded snapshots, in append order
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// The most recently recorded snapshot
    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

/// Lazy, sequential reader for a stored trajectory file
pub struct TrajectoryReader {
    lines: Lines<BufReader<File>>,
}

impl TrajectoryReader {
    /// Open a trajectory file written by [`TrajectoryRecorder::create`]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl Iterator for TrajectoryReader {
    type Item = Result<Snapshot, TrajectoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(&line).map_err(TrajectoryError::from));
                }
                Err(e) => return Some(Err(TrajectoryError::from(e))),
            }
        }
    }
}
