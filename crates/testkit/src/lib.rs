#![warn(missing_docs)]
//! Deterministic testing surfaces: event stream, boundary transfer log and
//! metrics reports for headless lighting runs.

mod metrics;

use anyhow::Result;
use seamlight_core::{ChunkPos, Direction, SimTick};
use seamlight_world::BoundaryTracker;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub use metrics::*;

/// Primary event record captured by headless tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Free-form payload.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// One boundary flag word moved between chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundaryTransfer {
    /// Chunk the word was taken from, as `[x, z]`.
    pub chunk: [i32; 2],
    /// Direction of the OUT group it was taken from.
    pub direction: &'static str,
    /// Offset inside the OUT group.
    pub offset: i32,
    /// Packed section masks.
    pub flags: u32,
}

/// Boundary tracker that keeps every transfer for later inspection.
#[derive(Debug, Default)]
pub struct TransferLog {
    transfers: Vec<BoundaryTransfer>,
}

impl TransferLog {
    /// Transfers recorded so far, oldest first.
    pub fn transfers(&self) -> &[BoundaryTransfer] {
        &self.transfers
    }

    /// Total number of section bits moved.
    pub fn bits_moved(&self) -> u64 {
        self.transfers
            .iter()
            .map(|t| u64::from(t.flags.count_ones()))
            .sum()
    }

    /// Forget recorded transfers without writing them anywhere.
    pub fn clear(&mut self) {
        self.transfers.clear();
    }

    /// Write every transfer to `sink` as a `boundary_transfer` event.
    pub fn flush_to(&mut self, sink: &mut JsonlSink, tick: SimTick) -> Result<()> {
        for transfer in self.transfers.drain(..) {
            let payload = serde_json::to_string(&transfer)?;
            sink.write(&EventRecord {
                tick,
                kind: "boundary_transfer",
                payload: &payload,
            })?;
        }
        Ok(())
    }
}

impl BoundaryTracker for TransferLog {
    fn track_transfer(&mut self, chunk: ChunkPos, dir: Direction, offset: i32, flags: u32) {
        self.transfers.push(BoundaryTransfer {
            chunk: [chunk.x, chunk.z],
            direction: dir.as_str(),
            offset,
            flags,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "{name}-{}.jsonl",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    #[test]
    fn transfer_log_records_and_flushes() {
        let mut log = TransferLog::default();
        log.track_transfer(ChunkPos::new(2, -1), Direction::East, 1, 0b1011);
        assert_eq!(log.bits_moved(), 3);
        assert_eq!(log.transfers()[0].direction, "east");

        let path = temp_path("transfers");
        let mut sink = JsonlSink::create(&path).expect("sink create");
        log.flush_to(&mut sink, SimTick(7)).expect("flush");
        assert!(log.transfers().is_empty());

        let contents = fs::read_to_string(&path).expect("file readable");
        assert!(contents.contains("boundary_transfer"));
        assert!(contents.contains("\"tick\":7"));
        fs::remove_file(&path).ok();
    }
}
