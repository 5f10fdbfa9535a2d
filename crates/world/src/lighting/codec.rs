//! Persisted boundary record.
//!
//! Only authoritative chunks carry flags across save and load. Anything that
//! does not fit the current layout is logged and dropped; the worst outcome
//! of losing a flag is a stale light value, never a corrupt chunk.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::{ChunkLightState, LightMode, PendingNeighborInit};
use crate::chunk::Chunk;

/// Boundary lighting fields of a chunk record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    /// Flag words, absent when every slot is zero.
    #[serde(rename = "NeighborLightChecks", default)]
    pub neighbor_light_checks: Option<Vec<u32>>,
    /// Initial seeding state, absent when zero.
    #[serde(rename = "PendingNeighborLightInits", default)]
    pub pending_neighbor_light_inits: Option<u16>,
}

/// Reasons a persisted boundary field is discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoundaryCodecError {
    #[error("boundary flag array has {found} words, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("boundary flags are not persisted for client chunks")]
    ClientLayout,
    #[error("invalid pending neighbor init state {0:#x}")]
    InvalidInitState(u16),
}

/// Build the record for `chunk`, dropping an all-zero flag array first.
pub fn write_boundary_record(chunk: &mut Chunk) -> BoundaryRecord {
    let light = chunk.light_mut();
    light.flags.release_if_empty();
    let neighbor_light_checks = if light.mode().is_client() {
        None
    } else {
        light.flags.words().map(<[u32]>::to_vec)
    };
    let pending = light.pending_init.bits();
    BoundaryRecord {
        neighbor_light_checks,
        pending_neighbor_light_inits: (pending != 0).then_some(u16::from(pending)),
    }
}

/// Restore boundary state from a record. Invalid fields are logged and
/// skipped; the rest of the record is still applied.
pub fn read_boundary_record(chunk: &mut Chunk, record: BoundaryRecord) {
    let pos = chunk.position();
    let light = chunk.light_mut();
    if let Some(words) = record.neighbor_light_checks {
        if let Err(err) = restore_flags(light, words) {
            warn!(%pos, %err, "discarding persisted boundary flags");
        }
    }
    if let Some(raw) = record.pending_neighbor_light_inits {
        match decode_init_state(raw) {
            Ok(state) => light.pending_init = state,
            Err(err) => warn!(%pos, %err, "discarding persisted init state"),
        }
    }
}

fn restore_flags(light: &mut ChunkLightState, words: Vec<u32>) -> Result<(), BoundaryCodecError> {
    if light.mode().is_client() {
        return Err(BoundaryCodecError::ClientLayout);
    }
    light
        .flags
        .set_words(words)
        .map_err(|found| BoundaryCodecError::LengthMismatch {
            expected: LightMode::Authoritative.flag_count(),
            found,
        })
}

fn decode_init_state(raw: u16) -> Result<PendingNeighborInit, BoundaryCodecError> {
    u8::try_from(raw)
        .ok()
        .and_then(PendingNeighborInit::from_bits)
        .ok_or(BoundaryCodecError::InvalidInitState(raw))
}
