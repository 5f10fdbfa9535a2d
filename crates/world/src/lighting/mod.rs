//! Boundary light-check bookkeeping.
//!
//! Light changes close to a chunk edge must be re-checked on the other side
//! of the edge, but the neighbor may not be loaded yet. Each chunk keeps a
//! small table of packed section masks ([`BoundaryFlags`]) recording those
//! obligations. They are moved between chunks when neighbors load
//! ([`merge`]), replayed as recheck requests ([`schedule`]) and persisted
//! with the chunk ([`codec`]). The one-time initial skylight seeding across
//! chunk edges lives in [`init`]; [`hooks`] wires everything to the chunk
//! lifecycle.
//!
//! Light propagation itself is not done here. Rechecks are handed to a
//! [`RelightEngine`].

pub mod boundary;
pub mod codec;
pub mod flags;
pub mod hooks;
pub mod init;
pub mod merge;
pub mod queue;
pub mod region;
pub mod schedule;
mod state;

use seamlight_core::{BlockPos, ChunkPos, Direction, LightChannel};
use serde::{Deserialize, Serialize};

use crate::chunk::{BlockId, Chunk, BLOCK_AIR, BLOCK_GLOWSTONE};

pub use boundary::{
    flag_exterior, flag_exterior_block, flag_horizontal_client, flag_interior,
    flag_interior_block, flag_vertical, pack_section_mask,
};
pub use codec::{read_boundary_record, write_boundary_record, BoundaryCodecError, BoundaryRecord};
pub use flags::BoundaryFlags;
pub use hooks::{on_load, on_tick, on_unload};
pub use init::{
    check_neighbors_loaded, fill_skylight_column, init_chunk_lighting, init_neighbor_light,
};
pub use merge::merge_flags;
pub use queue::{RecheckRequest, RelightQueue};
pub use schedule::{schedule_boundaries_authoritative, schedule_boundaries_local};
pub use state::{ChunkLightState, PendingNeighborInit};

/// Which side of a client/server split a world runs on.
///
/// Resolved once per chunk at creation; it fixes the length of the chunk's
/// flag table for the chunk's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    /// Render-side replica: only replays checks locally.
    Client,
    /// Owns the world: hands checks to neighbors and persists them.
    #[default]
    Authoritative,
}

impl LightMode {
    /// Number of flag words a chunk in this mode carries.
    pub const fn flag_count(self) -> usize {
        match self {
            Self::Client => region::FLAG_COUNT_CLIENT,
            Self::Authoritative => region::FLAG_COUNT_AUTHORITATIVE,
        }
    }

    /// True for client-side worlds.
    pub const fn is_client(self) -> bool {
        matches!(self, Self::Client)
    }
}

/// Access to the currently loaded chunks of one world.
pub trait ChunkGrid {
    /// Mode every chunk of this world is created with.
    fn mode(&self) -> LightMode;

    /// Whether the world has a sky light channel at all.
    fn has_sky_light(&self) -> bool;

    /// A loaded chunk, or `None` when not loaded.
    fn loaded_chunk(&self, pos: ChunkPos) -> Option<&Chunk>;

    /// Mutable access to a loaded chunk.
    fn loaded_chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk>;

    /// Convenience wrapper around [`ChunkGrid::loaded_chunk`].
    fn is_loaded(&self, pos: ChunkPos) -> bool {
        self.loaded_chunk(pos).is_some()
    }
}

/// Light propagation engine that accepts recheck requests.
///
/// Calls are fire-and-forget: the engine queues the work and returns.
pub trait RelightEngine {
    /// Recheck one column between `y_min` and `y_max` inclusive.
    fn recheck_column(&mut self, channel: LightChannel, x: i32, z: i32, y_min: i32, y_max: i32);

    /// Recheck every voxel in the inclusive box `min..=max`.
    fn recheck_area(&mut self, channel: LightChannel, min: BlockPos, max: BlockPos);
}

/// Receives every boundary flag word moved by [`merge_flags`].
///
/// `chunk` is the chunk the word was taken from, `dir` and `offset` name its
/// OUT slot (`offset` in `-1..=1`).
pub trait BoundaryTracker {
    fn track_transfer(&mut self, chunk: ChunkPos, dir: Direction, offset: i32, flags: u32);
}

/// Tracker that ignores transfers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTracking;

impl BoundaryTracker for NoTracking {
    fn track_transfer(&mut self, _chunk: ChunkPos, _dir: Direction, _offset: i32, _flags: u32) {}
}

/// Trait for querying how much light a block emits.
pub trait BlockLightProvider {
    fn light_emission(&self, block_id: BlockId) -> u8;

    /// Whether the block stops sky light. Everything but air by default.
    fn is_opaque(&self, block_id: BlockId) -> bool {
        block_id != BLOCK_AIR
    }
}

/// Built-in block table: only glowstone emits.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBlockLight;

impl BlockLightProvider for DefaultBlockLight {
    fn light_emission(&self, block_id: BlockId) -> u8 {
        if block_id == BLOCK_GLOWSTONE {
            15
        } else {
            0
        }
    }
}
