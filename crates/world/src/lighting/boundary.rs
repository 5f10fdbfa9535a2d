//! Flag-set operations.
//!
//! Every write is a bitwise OR; only [`merge`](super::merge) and the drains
//! in [`schedule`](super::schedule) clear bits.

use seamlight_core::{BlockPos, Direction, LightChannel, VerticalFacing};
use tracing::trace;

use super::region::{self, BoundaryFacing};
use crate::chunk::Chunk;

/// Shift a section mask into `channel`'s half of a flag word.
pub const fn pack_section_mask(section_mask: u16, channel: LightChannel) -> u32 {
    (section_mask as u32) << channel.shift()
}

fn section_bit(pos: BlockPos) -> Option<u16> {
    pos.section().map(|s| 1 << s)
}

/// Record a check for column `(x, z)` inside this chunk.
///
/// Edge columns flag their edge slot, corner columns their corner slot;
/// interior columns need no boundary check and are ignored. On clients the
/// chunk is marked for a local drain.
pub fn flag_interior(
    chunk: &mut Chunk,
    x: usize,
    z: usize,
    section_mask: u16,
    channel: LightChannel,
) {
    let Some(slot) = region::interior_flag_index(x, z) else {
        return;
    };
    let bits = pack_section_mask(section_mask, channel);
    if bits == 0 {
        return;
    }
    let light = chunk.light_mut();
    light.flags.insert(slot, bits);
    if light.mode().is_client() {
        light.pending_boundary_checks = true;
    }
    chunk.mark_dirty();
    trace!(chunk = %chunk.position(), slot, bits, "flagged interior boundary");
}

/// [`flag_interior`] for the section holding a world block position.
pub fn flag_interior_block(chunk: &mut Chunk, pos: BlockPos, channel: LightChannel) {
    if let Some(mask) = section_bit(pos) {
        let (x, z) = pos.local_xz();
        flag_interior(chunk, x, z, mask, channel);
    }
}

/// Record a check owed to the neighbor in `dir` for column `(x, z)`.
///
/// Authoritative only; on clients the neighbor's own replica handles it.
pub fn flag_exterior(
    chunk: &mut Chunk,
    x: usize,
    z: usize,
    dir: Direction,
    section_mask: u16,
    channel: LightChannel,
) {
    let light = chunk.light_mut();
    if light.mode().is_client() {
        return;
    }
    let bits = pack_section_mask(section_mask, channel);
    if bits == 0 {
        return;
    }
    let slot = region::out_flag_index(dir, region::exterior_offset(dir, x, z));
    light.flags.insert(slot, bits);
    chunk.mark_dirty();
    trace!(chunk = %chunk.position(), dir = dir.as_str(), slot, bits, "flagged exterior boundary");
}

/// [`flag_exterior`] for the section holding a world block position.
pub fn flag_exterior_block(chunk: &mut Chunk, pos: BlockPos, dir: Direction, channel: LightChannel) {
    if let Some(mask) = section_bit(pos) {
        let (x, z) = pos.local_xz();
        flag_exterior(chunk, x, z, dir, mask, channel);
    }
}

/// Record checks on the top or bottom layer of the sections in `flags`.
///
/// Client only: authoritative tables reuse these slot indices for OUT flags.
pub fn flag_vertical(chunk: &mut Chunk, facing: VerticalFacing, flags: u32) {
    flag_client_slot(chunk, region::vertical_flag_index(facing), flags);
}

/// Record checks on a client chunk's edge (`region == 0`) or on one of the
/// corners next to it (`region == ±1`).
pub fn flag_horizontal_client(chunk: &mut Chunk, dir: Direction, region: i32, flags: u32) {
    flag_client_slot(chunk, region::ring_flag_index(dir, region), flags);
}

fn flag_client_slot(chunk: &mut Chunk, slot: usize, flags: u32) {
    let light = chunk.light_mut();
    if !light.mode().is_client() || flags == 0 {
        return;
    }
    light.flags.insert(slot, flags);
    light.pending_boundary_checks = true;
}

/// Edge slot of `dir` as seen from inside the chunk.
pub fn in_slot(dir: Direction) -> usize {
    region::horizontal_flag_index(dir, BoundaryFacing::In)
}
