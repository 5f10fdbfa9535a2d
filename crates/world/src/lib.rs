//! Column chunk world with boundary light-check bookkeeping.
//!
//! [`Chunk`] is a 16×16×256 column stored as lazily allocated sections.
//! [`lighting`] keeps track of light rechecks that straddle chunk edges,
//! [`ChunkStorage`] holds resident chunks and [`RegionStore`] persists them.

mod chunk;
pub mod lighting;
mod persist;
mod storage;

pub use chunk::*;
pub use lighting::{
    BlockLightProvider, BoundaryTracker, ChunkGrid, ChunkLightState, DefaultBlockLight,
    LightMode, NoTracking, PendingNeighborInit, RecheckRequest, RelightEngine, RelightQueue,
};
pub use persist::RegionStore;
pub use storage::ChunkStorage;
