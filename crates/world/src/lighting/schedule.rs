//! Replaying boundary flags as recheck requests.

use seamlight_core::{BlockPos, ChunkPos, Corner, Direction, LightChannel, VerticalFacing};
use tracing::{debug, trace};

use super::flags::{channel_mask, sections};
use super::merge::merge_flags;
use super::region::{corner_flag_index, horizontal_flag_index, vertical_flag_index, BoundaryFacing};
use super::{BoundaryTracker, ChunkGrid, RelightEngine};
use crate::chunk::Chunk;

const SECTION_SPAN: i32 = 16;

/// Server-side drain, run once `pos` has loaded.
///
/// For every loaded horizontal neighbor the two chunks first exchange the
/// checks they owe each other, then the neighbor's side of the shared edge
/// and this chunk's side are drained. Corners are drained only once both
/// chunks sharing the corner's edges are present.
pub fn schedule_boundaries_authoritative(
    grid: &mut dyn ChunkGrid,
    pos: ChunkPos,
    engine: &mut dyn RelightEngine,
    tracker: &mut dyn BoundaryTracker,
) {
    if !grid.is_loaded(pos) {
        return;
    }

    for dir in Direction::HORIZONTALS {
        let Some(neighbor) = pos.neighbor(dir).filter(|&n| grid.is_loaded(n)) else {
            continue;
        };
        let back = dir.opposite();
        merge_flags(grid, pos, dir, tracker);
        merge_flags(grid, neighbor, back, tracker);

        let (dx, dz) = dir.offset();
        let side_corners: Vec<Corner> = perpendicular(dir)
            .into_iter()
            .filter(|&perp| neighbor.neighbor(perp).is_some_and(|p| grid.is_loaded(p)))
            .map(|perp| {
                let (px, pz) = perp.offset();
                Corner::new(px - dx, pz - dz)
            })
            .collect();
        if let Some(chunk) = grid.loaded_chunk_mut(neighbor) {
            drain_edge(chunk, back, engine);
            for corner in side_corners {
                drain_corner(chunk, corner, engine);
            }
        }
        if let Some(chunk) = grid.loaded_chunk_mut(pos) {
            drain_edge(chunk, dir, engine);
        }
    }

    for corner in Corner::ALL {
        let beside = |dx, dz| pos.offset(dx, dz).is_some_and(|p| grid.is_loaded(p));
        if beside(corner.x, 0) && beside(0, corner.z) {
            if let Some(chunk) = grid.loaded_chunk_mut(pos) {
                drain_corner(chunk, corner, engine);
            }
        }
    }

    if let Some(chunk) = grid.loaded_chunk_mut(pos) {
        chunk.light_mut().flags.release_if_empty();
    }
    debug!(%pos, "drained authoritative boundaries");
}

/// Client-side drain of every IN-facing and vertical slot of `chunk`.
pub fn schedule_boundaries_local(chunk: &mut Chunk, engine: &mut dyn RelightEngine) {
    for dir in Direction::HORIZONTALS {
        drain_edge(chunk, dir, engine);
    }
    for corner in Corner::ALL {
        drain_corner(chunk, corner, engine);
    }
    if chunk.light().mode().is_client() {
        for facing in VerticalFacing::ALL {
            drain_vertical(chunk, facing, engine);
        }
    }
    chunk.light_mut().flags.release_if_empty();
    trace!(pos = %chunk.position(), "drained local boundaries");
}

fn perpendicular(dir: Direction) -> [Direction; 2] {
    if dir.is_x_axis() {
        [Direction::South, Direction::North]
    } else {
        [Direction::West, Direction::East]
    }
}

/// Take a slot, marking the chunk dirty when it held anything.
fn take_slot(chunk: &mut Chunk, slot: usize) -> u32 {
    let word = chunk.light_mut().flags.take(slot);
    if word != 0 {
        chunk.mark_dirty();
    }
    word
}

fn for_each_section(word: u32, mut f: impl FnMut(LightChannel, i32)) {
    for channel in LightChannel::ALL {
        for section in sections(channel_mask(word, channel)) {
            f(channel, section);
        }
    }
}

fn drain_edge(chunk: &mut Chunk, dir: Direction, engine: &mut dyn RelightEngine) {
    let word = take_slot(chunk, horizontal_flag_index(dir, BoundaryFacing::In));
    if word == 0 {
        return;
    }
    let pos = chunk.position();
    let (dx, dz) = dir.offset();
    let mut x_min = pos.min_block_x();
    let mut z_min = pos.min_block_z();
    if dir.is_positive() {
        x_min += 15 * dx;
        z_min += 15 * dz;
    }
    // The strip skips both end columns; those belong to the corner slots.
    let x_shift = i32::from(dz != 0);
    let z_shift = i32::from(dx != 0);
    x_min += x_shift;
    z_min += z_shift;
    let x_max = x_min + 13 * x_shift;
    let z_max = z_min + 13 * z_shift;

    for_each_section(word, |channel, section| {
        let y = section * SECTION_SPAN;
        engine.recheck_area(
            channel,
            BlockPos::new(x_min, y, z_min),
            BlockPos::new(x_max, y + SECTION_SPAN - 1, z_max),
        );
    });
}

fn drain_corner(chunk: &mut Chunk, corner: Corner, engine: &mut dyn RelightEngine) {
    let word = take_slot(chunk, corner_flag_index(corner));
    if word == 0 {
        return;
    }
    let pos = chunk.position();
    let x = pos.min_block_x() + if corner.x > 0 { 15 } else { 0 };
    let z = pos.min_block_z() + if corner.z > 0 { 15 } else { 0 };
    for_each_section(word, |channel, section| {
        let y = section * SECTION_SPAN;
        engine.recheck_column(channel, x, z, y, y + SECTION_SPAN - 1);
    });
}

fn drain_vertical(chunk: &mut Chunk, facing: VerticalFacing, engine: &mut dyn RelightEngine) {
    let word = take_slot(chunk, vertical_flag_index(facing));
    if word == 0 {
        return;
    }
    let pos = chunk.position();
    let (x, z) = (pos.min_block_x(), pos.min_block_z());
    for_each_section(word, |channel, section| {
        let y = section * SECTION_SPAN + facing.layer();
        engine.recheck_area(
            channel,
            BlockPos::new(x, y, z),
            BlockPos::new(x + 15, y, z + 15),
        );
    });
}
