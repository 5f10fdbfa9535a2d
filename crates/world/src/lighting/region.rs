//! Slot addressing for boundary flag tables.
//!
//! The first eight slots form a ring around the chunk, walking south edge,
//! west edge, north edge, east edge with a corner between each pair:
//!
//! ```text
//! index:  0       1      2       3      4       5      6       7
//! slot:   (+x,+z) south  (-x,+z) west   (-x,-z) north  (+x,-z) east
//! ```
//!
//! Ring slots are IN-facing: they hold checks to run inside this chunk.
//! Client tables add two vertical slots after the ring. Authoritative tables
//! instead add twelve OUT slots, three per direction (edge centre plus the two
//! corner slivers), holding checks owed to a neighbor that is not loaded.
//!
//! An OUT group is centred on `OUT(d)` and merging maps `OUT(d) + k` on one
//! chunk to `ring(opposite(d), k)` on the neighbor across that edge. Every
//! function here is pure and all index arithmetic for the table lives here.

use seamlight_core::{Corner, Direction, VerticalFacing};

/// Number of IN-facing ring slots.
pub const RING_SLOTS: usize = 8;
/// First slot past the ring.
pub const OUT_INDEX_OFFSET: usize = RING_SLOTS;
/// Slots per direction in the OUT area.
pub const OUT_GROUP_WIDTH: usize = 3;
/// Client tables: ring plus up/down.
pub const FLAG_COUNT_CLIENT: usize = OUT_INDEX_OFFSET + 2;
/// Authoritative tables: ring plus one OUT group per direction.
pub const FLAG_COUNT_AUTHORITATIVE: usize = OUT_INDEX_OFFSET + 4 * OUT_GROUP_WIDTH;

/// Whether a slot runs checks here or hands them to a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryFacing {
    In,
    Out,
}

/// Centre slot of `dir`'s edge for the given facing.
pub const fn horizontal_flag_index(dir: Direction, facing: BoundaryFacing) -> usize {
    let h = dir.horizontal_index();
    match facing {
        BoundaryFacing::In => 2 * h + 1,
        BoundaryFacing::Out => OUT_INDEX_OFFSET + OUT_GROUP_WIDTH * h + 1,
    }
}

/// Ring slot `region` steps away from `dir`'s edge centre (`region` in `-1..=1`).
pub fn ring_flag_index(dir: Direction, region: i32) -> usize {
    let centre = horizontal_flag_index(dir, BoundaryFacing::In) as i32;
    (centre + region).rem_euclid(RING_SLOTS as i32) as usize
}

/// OUT slot `offset` steps away from `dir`'s OUT centre (`offset` in `-1..=1`).
pub fn out_flag_index(dir: Direction, offset: i32) -> usize {
    debug_assert!((-1..=1).contains(&offset));
    let centre = horizontal_flag_index(dir, BoundaryFacing::Out) as i32;
    (centre + offset) as usize
}

/// Ring slot of a corner.
pub fn corner_flag_index(corner: Corner) -> usize {
    (corner.x * (corner.z - 2) + 1).rem_euclid(RING_SLOTS as i32) as usize
}

/// Client-only vertical slot.
pub const fn vertical_flag_index(facing: VerticalFacing) -> usize {
    OUT_INDEX_OFFSET + facing.index()
}

/// Which band of a chunk a local coordinate falls into: `-1` for the low
/// edge, `1` for the high edge, `0` for the interior.
pub const fn boundary_region(coord: usize) -> i32 {
    match coord & 15 {
        0 => -1,
        15 => 1,
        _ => 0,
    }
}

/// Ring slot covering column `(x, z)`, or `None` for interior columns.
pub fn interior_flag_index(x: usize, z: usize) -> Option<usize> {
    match (boundary_region(x), boundary_region(z)) {
        (0, 0) => None,
        (0, 1) => Some(horizontal_flag_index(Direction::South, BoundaryFacing::In)),
        (0, _) => Some(horizontal_flag_index(Direction::North, BoundaryFacing::In)),
        (1, 0) => Some(horizontal_flag_index(Direction::East, BoundaryFacing::In)),
        (_, 0) => Some(horizontal_flag_index(Direction::West, BoundaryFacing::In)),
        (cx, cz) => Some(corner_flag_index(Corner::new(cx, cz))),
    }
}

/// Signed ring distance from an edge centre to a slot of its group.
fn ring_delta(edge: usize, slot: usize) -> i32 {
    ((slot + RING_SLOTS + 1 - edge) % RING_SLOTS) as i32 - 1
}

/// Offset inside `dir`'s OUT group for a check at column `(x, z)`.
///
/// The column is projected onto the neighbor's facing edge; the offset is
/// where that neighbor column sits relative to the neighbor's edge centre.
pub fn exterior_offset(dir: Direction, x: usize, z: usize) -> i32 {
    let (dx, dz) = dir.offset();
    let across = |d: i32, c: usize| match d {
        1 => 0,
        -1 => 15,
        _ => c & 15,
    };
    let edge = horizontal_flag_index(dir.opposite(), BoundaryFacing::In);
    match interior_flag_index(across(dx, x), across(dz, z)) {
        Some(slot) => ring_delta(edge, slot),
        None => 0,
    }
}

/// Corner of the chunk that a ring slot addresses, if it is a corner slot.
pub fn slot_corner(slot: usize) -> Option<Corner> {
    Corner::ALL.into_iter().find(|&c| corner_flag_index(c) == slot)
}
