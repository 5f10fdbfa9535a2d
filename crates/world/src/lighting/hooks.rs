//! Chunk lifecycle entry points.
//!
//! The grid owner calls [`on_load`] right after a chunk becomes resident,
//! [`on_unload`] right before it is dropped and [`on_tick`] once per tick for
//! every resident chunk.

use seamlight_core::ChunkPos;
use tracing::debug;

use super::{
    init_chunk_lighting, init_neighbor_light, schedule_boundaries_authoritative,
    schedule_boundaries_local, BlockLightProvider, BoundaryTracker, ChunkGrid, RelightEngine,
};

const SURROUNDING: u8 = 8;

/// Count neighbors, seed lighting and, on servers, drain boundary checks.
pub fn on_load(
    grid: &mut dyn ChunkGrid,
    pos: ChunkPos,
    blocks: &dyn BlockLightProvider,
    engine: &mut dyn RelightEngine,
    tracker: &mut dyn BoundaryTracker,
) {
    if !grid.is_loaded(pos) {
        return;
    }
    // Counts are rebuilt from residency so a repeated load cannot inflate them.
    let mut found = 0u8;
    for neighbor in pos.surrounding() {
        if grid.is_loaded(neighbor) {
            let count = loaded_around(grid, neighbor);
            if let Some(chunk) = grid.loaded_chunk_mut(neighbor) {
                chunk.light_mut().neighbors_loaded = count;
            }
            found += 1;
        }
    }
    debug_assert!(found <= SURROUNDING);
    if let Some(chunk) = grid.loaded_chunk_mut(pos) {
        chunk.light_mut().neighbors_loaded = found;
    }

    init_chunk_lighting(grid, pos, blocks, engine);
    init_neighbor_light(grid, pos, engine);
    if !grid.mode().is_client() {
        schedule_boundaries_authoritative(grid, pos, engine, tracker);
    }
    debug!(%pos, neighbors = found, "chunk loaded");
}

/// Release neighbor counts held by `pos`.
///
/// Boundary flags stay with the chunk and are persisted by the caller.
///
/// Must run while `pos` is still resident; neighbors are counted as if it
/// were already gone, so calling it twice is harmless.
pub fn on_unload(grid: &mut dyn ChunkGrid, pos: ChunkPos) {
    if !grid.is_loaded(pos) {
        return;
    }
    for neighbor in pos.surrounding() {
        if grid.is_loaded(neighbor) {
            let count = loaded_around(grid, neighbor).saturating_sub(1);
            if let Some(chunk) = grid.loaded_chunk_mut(neighbor) {
                chunk.light_mut().neighbors_loaded = count;
            }
        }
    }
    if let Some(chunk) = grid.loaded_chunk_mut(pos) {
        chunk.light_mut().neighbors_loaded = 0;
    }
    debug!(%pos, "chunk unloaded");
}

fn loaded_around(grid: &dyn ChunkGrid, pos: ChunkPos) -> u8 {
    pos.surrounding().filter(|&n| grid.is_loaded(n)).count() as u8
}

/// Client tick: drain local checks once the chunk is fully surrounded.
/// Returns whether a drain ran.
pub fn on_tick(grid: &mut dyn ChunkGrid, pos: ChunkPos, engine: &mut dyn RelightEngine) -> bool {
    if !grid.mode().is_client() {
        return false;
    }
    let Some(chunk) = grid.loaded_chunk_mut(pos) else {
        return false;
    };
    let light = chunk.light();
    if !light.pending_boundary_checks || light.neighbors_loaded < SURROUNDING {
        return false;
    }
    schedule_boundaries_local(chunk, engine);
    chunk.light_mut().pending_boundary_checks = false;
    true
}
