//! Chunk and block coordinates.
//!
//! Chunks are 16×16 columns of 16 stacked sections. Neighbor lookups go
//! through [`ChunkPos::offset`], which reports coordinate overflow as `None`
//! so callers can treat it the same way as an unloaded chunk.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::direction::{Corner, Direction};

/// Chunk width and depth in voxels.
pub const CHUNK_WIDTH: i32 = 16;
/// Height of one section in voxels.
pub const SECTION_HEIGHT: i32 = 16;
/// Number of vertical sections per chunk column.
pub const SECTION_COUNT: usize = 16;
/// Total world height in voxels.
pub const WORLD_HEIGHT: i32 = SECTION_HEIGHT * SECTION_COUNT as i32;

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ChunkPos {
    /// Chunk X coordinate.
    pub x: i32,
    /// Chunk Z coordinate.
    pub z: i32,
}

impl ChunkPos {
    /// Create a chunk position.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Position shifted by `(dx, dz)` chunks, or `None` on overflow.
    pub fn offset(self, dx: i32, dz: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            z: self.z.checked_add(dz)?,
        })
    }

    /// Horizontally adjacent chunk in `dir`.
    pub fn neighbor(self, dir: Direction) -> Option<Self> {
        let (dx, dz) = dir.offset();
        self.offset(dx, dz)
    }

    /// Diagonally adjacent chunk across `corner`.
    pub fn diagonal(self, corner: Corner) -> Option<Self> {
        self.offset(corner.x, corner.z)
    }

    /// The 8 surrounding positions (cardinal and diagonal) that exist.
    pub fn surrounding(self) -> impl Iterator<Item = ChunkPos> {
        (-1..=1)
            .flat_map(|dx| (-1..=1).map(move |dz| (dx, dz)))
            .filter(|&(dx, dz)| dx != 0 || dz != 0)
            .filter_map(move |(dx, dz)| self.offset(dx, dz))
    }

    /// World X of the chunk's first column.
    pub const fn min_block_x(self) -> i32 {
        self.x.wrapping_mul(CHUNK_WIDTH)
    }

    /// World Z of the chunk's first column.
    pub const fn min_block_z(self) -> i32 {
        self.z.wrapping_mul(CHUNK_WIDTH)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Absolute voxel position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    /// World X.
    pub x: i32,
    /// World Y.
    pub y: i32,
    /// World Z.
    pub z: i32,
}

impl BlockPos {
    /// Create a block position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing this block.
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    /// Column coordinates inside the owning chunk (`0..16` each).
    pub const fn local_xz(self) -> (usize, usize) {
        ((self.x & 15) as usize, (self.z & 15) as usize)
    }

    /// Index of the section containing this block, if inside the world.
    pub fn section(self) -> Option<usize> {
        if (0..WORLD_HEIGHT).contains(&self.y) {
            Some((self.y / SECTION_HEIGHT) as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
