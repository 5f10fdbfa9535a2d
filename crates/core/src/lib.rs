#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod direction;
pub mod pos;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

pub use direction::{Corner, Direction, VerticalFacing};
pub use pos::{BlockPos, ChunkPos, CHUNK_WIDTH, SECTION_COUNT, SECTION_HEIGHT, WORLD_HEIGHT};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// One of the two independent light propagation domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LightChannel {
    /// Light coming down from the sky.
    Sky = 0,
    /// Light emitted by blocks.
    Block = 1,
}

impl LightChannel {
    /// Both channels in packing order.
    pub const ALL: [LightChannel; 2] = [LightChannel::Sky, LightChannel::Block];

    /// Stable index used to pick the half of a packed flag word.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit shift of this channel's 16-bit half inside a packed flag word.
    pub const fn shift(self) -> u32 {
        (self as u32) << 4
    }

    /// Canonical string key used in logs and reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sky => "sky",
            Self::Block => "block",
        }
    }
}

/// Reproducible RNG for per-chunk content derived from the world seed.
pub fn chunk_rng(world_seed: u64, pos: ChunkPos) -> StdRng {
    let hash = (pos.x as u32 as u64) << 32 | pos.z as u32 as u64;
    StdRng::seed_from_u64(world_seed ^ hash.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
