use seamlight_core::Direction;

use super::{BoundaryFlags, LightMode};

bitflags::bitflags! {
    /// Initial skylight seeding still owed by a chunk.
    ///
    /// A direction bit means the chunk has not yet seeded skylight across
    /// that edge. `AWAITING_COMPLETION` is set together with all direction
    /// bits when seeding starts and stays until the chunk is declared light
    /// populated.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PendingNeighborInit: u8 {
        const SOUTH = 1 << 0;
        const WEST = 1 << 1;
        const NORTH = 1 << 2;
        const EAST = 1 << 3;
        const AWAITING_COMPLETION = 1 << 4;
    }
}

impl PendingNeighborInit {
    /// Bit for one horizontal direction.
    pub const fn direction(dir: Direction) -> Self {
        Self::from_bits_retain(1 << dir.horizontal_index())
    }

    /// Seeding has begun (or finished and was reset on completion).
    pub fn is_started(self) -> bool {
        !self.is_empty()
    }

    /// Every edge has been seeded; only the 8-neighbor check remains.
    pub fn edges_done(self) -> bool {
        self == Self::AWAITING_COMPLETION
    }
}

impl Default for PendingNeighborInit {
    fn default() -> Self {
        Self::empty()
    }
}

/// Lighting bookkeeping attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLightState {
    /// Boundary check obligations.
    pub flags: BoundaryFlags,
    /// Initial seeding progress.
    pub pending_init: PendingNeighborInit,
    /// Initial lighting is complete. Never reset.
    pub light_populated: bool,
    /// Loaded chunks among the 8 surrounding positions.
    pub neighbors_loaded: u8,
    /// Client only: flags were set since the last local drain.
    pub pending_boundary_checks: bool,
}

impl ChunkLightState {
    pub fn new(mode: LightMode) -> Self {
        Self {
            flags: BoundaryFlags::new(mode),
            pending_init: PendingNeighborInit::empty(),
            light_populated: false,
            neighbors_loaded: 0,
            pending_boundary_checks: false,
        }
    }

    /// Mode the flag table was sized for.
    pub fn mode(&self) -> LightMode {
        if self.flags.len() == LightMode::Client.flag_count() {
            LightMode::Client
        } else {
            LightMode::Authoritative
        }
    }
}
