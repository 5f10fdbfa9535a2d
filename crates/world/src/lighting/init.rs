//! One-time light seeding of a chunk and across its edges.
//!
//! A chunk starts with every [`PendingNeighborInit`] bit set. Each direction
//! bit is cleared once skylight has been seeded across that edge, which
//! requires the neighbor to be loaded. The chunk becomes light populated once
//! only the completion bit is left and all 8 surrounding chunks are present.

use seamlight_core::{ChunkPos, Corner, Direction, LightChannel};
use tracing::{debug, trace};

use super::{BlockLightProvider, ChunkGrid, PendingNeighborInit, RelightEngine};
use crate::chunk::{Chunk, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, MAX_LIGHT_LEVEL, SECTION_SIZE_Y};

/// Seed block and sky light inside a freshly loaded chunk.
///
/// No-op once the chunk is populated or seeding has already started.
pub fn init_chunk_lighting(
    grid: &mut dyn ChunkGrid,
    pos: ChunkPos,
    blocks: &dyn BlockLightProvider,
    engine: &mut dyn RelightEngine,
) {
    let has_sky = grid.has_sky_light();
    let Some(chunk) = grid.loaded_chunk_mut(pos) else {
        return;
    };
    let light = chunk.light_mut();
    if light.light_populated || light.pending_init.is_started() {
        return;
    }
    light.pending_init = PendingNeighborInit::all();
    chunk.mark_dirty();

    let (base_x, base_z) = (pos.min_block_x(), pos.min_block_z());
    let mut emitters = 0usize;
    for (index, section) in chunk.sections() {
        if section.is_empty() {
            continue;
        }
        for (i, voxel) in section.voxels().iter().enumerate() {
            if blocks.light_emission(voxel.id) == 0 {
                continue;
            }
            let x = (i % CHUNK_SIZE_X) as i32;
            let z = ((i / CHUNK_SIZE_X) % CHUNK_SIZE_Z) as i32;
            let y = (index * SECTION_SIZE_Y + i / (CHUNK_SIZE_X * CHUNK_SIZE_Z)) as i32;
            engine.recheck_column(LightChannel::Block, base_x + x, base_z + z, y, y);
            emitters += 1;
        }
    }

    if has_sky {
        for x in 0..CHUNK_SIZE_X {
            for z in 0..CHUNK_SIZE_Z {
                let height = chunk.height(x, z);
                let y_min = (height - 1).max(0).min(lowest_neighbor_height(chunk, x, z));
                if y_min <= height - 1 {
                    engine.recheck_column(
                        LightChannel::Sky,
                        base_x + x as i32,
                        base_z + z as i32,
                        y_min,
                        height - 1,
                    );
                }
            }
        }
    }
    debug!(%pos, emitters, has_sky, "seeded chunk lighting");
}

/// Lowest height among the in-chunk horizontal neighbors of `(x, z)`.
fn lowest_neighbor_height(chunk: &Chunk, x: usize, z: usize) -> i32 {
    Direction::HORIZONTALS
        .iter()
        .filter_map(|dir| {
            let (dx, dz) = dir.offset();
            let nx = x.checked_add_signed(dx as isize).filter(|&v| v < CHUNK_SIZE_X)?;
            let nz = z.checked_add_signed(dz as isize).filter(|&v| v < CHUNK_SIZE_Z)?;
            Some(chunk.height(nx, nz))
        })
        .min()
        .unwrap_or(i32::MAX)
}

/// Seed skylight across the edges `pos` shares with its loaded neighbors and
/// run the completion check on everything that may have become complete.
pub fn init_neighbor_light(grid: &mut dyn ChunkGrid, pos: ChunkPos, engine: &mut dyn RelightEngine) {
    if !grid.is_loaded(pos) {
        return;
    }
    for dir in Direction::HORIZONTALS {
        let Some(neighbor) = pos.neighbor(dir).filter(|&n| grid.is_loaded(n)) else {
            continue;
        };
        seed_neighbor_edge(grid, pos, dir, engine);
        seed_neighbor_edge(grid, neighbor, dir.opposite(), engine);
        check_neighbors_loaded(grid, neighbor);
    }
    for corner in Corner::ALL {
        if let Some(diagonal) = pos.diagonal(corner) {
            check_neighbors_loaded(grid, diagonal);
        }
    }
    check_neighbors_loaded(grid, pos);
}

/// Seed skylight from `from` into the neighbor in `dir`, once per edge.
fn seed_neighbor_edge(
    grid: &mut dyn ChunkGrid,
    from: ChunkPos,
    dir: Direction,
    engine: &mut dyn RelightEngine,
) {
    let Some(to) = from.neighbor(dir) else {
        return;
    };
    let bit = PendingNeighborInit::direction(dir);
    let has_sky = grid.has_sky_light();

    let requests = {
        let (Some(source), Some(target)) = (grid.loaded_chunk(from), grid.loaded_chunk(to)) else {
            return;
        };
        if !source.light().pending_init.contains(bit) {
            return;
        }
        if has_sky {
            edge_sky_columns(source, target, dir)
        } else {
            Vec::new()
        }
    };

    if let Some(source) = grid.loaded_chunk_mut(from) {
        source.light_mut().pending_init.remove(bit);
        source.mark_dirty();
    }
    for &(x, z, y_min, y_max) in &requests {
        engine.recheck_column(LightChannel::Sky, x, z, y_min, y_max);
    }
    trace!(%from, %to, columns = requests.len(), "seeded neighbor edge");
}

/// Sky recheck columns in `target` along the edge it shares with `source`.
fn edge_sky_columns(source: &Chunk, target: &Chunk, dir: Direction) -> Vec<(i32, i32, i32, i32)> {
    let (dx, dz) = dir.offset();
    let (x_min, z_min) = if dir.is_positive() {
        (0, 0)
    } else {
        (15 * (dx & 1) as usize, 15 * (dz & 1) as usize)
    };
    let x_max = x_min + 15 * (dz & 1) as usize;
    let z_max = z_min + 15 * (dx & 1) as usize;
    let to = target.position();

    let mut columns = Vec::new();
    for x in x_min..=x_max {
        for z in z_min..=z_max {
            let mx = (x as i32 - dx) as usize & 15;
            let mz = (z as i32 - dz) as usize & 15;
            let mut y_min = source.height(mx, mz);
            while y_min > 0 && source.sky_light(mx, (y_min - 1) as usize, mz) >= MAX_LIGHT_LEVEL {
                y_min -= 1;
            }
            let y_max = (target.height(x, z) - 1).min(lowest_neighbor_height(target, x, z));
            if y_min <= y_max - 1 {
                columns.push((
                    to.min_block_x() + x as i32,
                    to.min_block_z() + z as i32,
                    y_min,
                    y_max - 1,
                ));
            }
        }
    }
    columns
}

/// Declare `pos` light populated if every edge is seeded and all 8
/// surrounding chunks are loaded. Returns whether the transition happened.
pub fn check_neighbors_loaded(grid: &mut dyn ChunkGrid, pos: ChunkPos) -> bool {
    let ready = grid
        .loaded_chunk(pos)
        .is_some_and(|chunk| chunk.light().pending_init.edges_done());
    if !ready {
        return false;
    }
    let loaded = pos.surrounding().filter(|&p| grid.is_loaded(p)).count();
    if loaded < 8 {
        return false;
    }
    let Some(chunk) = grid.loaded_chunk_mut(pos) else {
        return false;
    };
    let light = chunk.light_mut();
    light.pending_init = PendingNeighborInit::empty();
    light.light_populated = true;
    chunk.mark_dirty();
    debug!(%pos, "chunk light populated");
    true
}

/// Full sky light from the column height to the top of the chunk.
///
/// Only allocated sections store light; unallocated ones already read as lit
/// above the column height.
pub fn fill_skylight_column(chunk: &mut Chunk, x: usize, z: usize) {
    let height = chunk.height(x, z).max(0) as usize;
    for y in height..CHUNK_SIZE_Y {
        chunk.set_sky_light(x, y, z, MAX_LIGHT_LEVEL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Voxel, BLOCK_GLOWSTONE, BLOCK_STONE};
    use crate::lighting::{DefaultBlockLight, LightMode, RecheckRequest, RelightQueue};
    use crate::storage::ChunkStorage;

    fn flat_chunk(pos: ChunkPos, height: usize) -> Chunk {
        let mut chunk = Chunk::new(pos, LightMode::Authoritative);
        for x in 0..16 {
            for z in 0..16 {
                for y in 0..height {
                    chunk.set_voxel(x, y, z, Voxel::block(BLOCK_STONE));
                }
                fill_skylight_column(&mut chunk, x, z);
            }
        }
        chunk
    }

    #[test]
    fn init_marks_started_and_seeds_emitters() {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, false, 16);
        let mut chunk = Chunk::new(ChunkPos::new(1, 0), LightMode::Authoritative);
        chunk.set_voxel(3, 40, 5, Voxel::block(BLOCK_GLOWSTONE));
        grid.insert(chunk);

        let mut queue = RelightQueue::default();
        init_chunk_lighting(&mut grid, ChunkPos::new(1, 0), &DefaultBlockLight, &mut queue);
        assert_eq!(
            queue.drain().collect::<Vec<_>>(),
            vec![RecheckRequest::Column {
                channel: LightChannel::Block,
                x: 19,
                z: 5,
                y_min: 40,
                y_max: 40,
            }]
        );
        let light = grid.get(ChunkPos::new(1, 0)).unwrap().light();
        assert_eq!(light.pending_init, PendingNeighborInit::all());

        init_chunk_lighting(&mut grid, ChunkPos::new(1, 0), &DefaultBlockLight, &mut queue);
        assert!(queue.is_empty());
    }

    #[test]
    fn sky_pass_covers_step_below_neighbors() {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, true, 16);
        let mut chunk = flat_chunk(ChunkPos::new(0, 0), 4);
        // One pillar two blocks higher than the ground.
        chunk.set_voxel(8, 4, 8, Voxel::block(BLOCK_STONE));
        chunk.set_voxel(8, 5, 8, Voxel::block(BLOCK_STONE));
        grid.insert(chunk);

        let mut queue = RelightQueue::default();
        init_chunk_lighting(&mut grid, ChunkPos::new(0, 0), &DefaultBlockLight, &mut queue);
        let requests: Vec<_> = queue.drain().collect();
        assert_eq!(requests.len(), 256);
        assert!(requests.contains(&RecheckRequest::Column {
            channel: LightChannel::Sky,
            x: 8,
            z: 8,
            y_min: 4,
            y_max: 5,
        }));
        assert!(requests.contains(&RecheckRequest::Column {
            channel: LightChannel::Sky,
            x: 0,
            z: 0,
            y_min: 3,
            y_max: 3,
        }));
    }

    #[test]
    fn empty_columns_issue_no_sky_requests() {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, true, 16);
        grid.insert(Chunk::new(ChunkPos::new(0, 0), LightMode::Authoritative));
        let mut queue = RelightQueue::default();
        init_chunk_lighting(&mut grid, ChunkPos::new(0, 0), &DefaultBlockLight, &mut queue);
        assert!(queue.is_empty());
    }

    #[test]
    fn neighbor_seeding_clears_both_directions_once() {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, true, 16);
        let mut queue = RelightQueue::default();
        for x in 0..2 {
            let pos = ChunkPos::new(x, 0);
            grid.insert(flat_chunk(pos, 4));
            init_chunk_lighting(&mut grid, pos, &DefaultBlockLight, &mut queue);
        }
        queue.drain().for_each(drop);

        init_neighbor_light(&mut grid, ChunkPos::new(1, 0), &mut queue);
        let west = grid.get(ChunkPos::new(0, 0)).unwrap().light().pending_init;
        let east = grid.get(ChunkPos::new(1, 0)).unwrap().light().pending_init;
        assert!(!west.contains(PendingNeighborInit::EAST));
        assert!(!east.contains(PendingNeighborInit::WEST));
        assert!(west.contains(PendingNeighborInit::WEST));
        // Flat terrain of equal height leaves nothing to recheck.
        assert!(queue.is_empty());

        init_neighbor_light(&mut grid, ChunkPos::new(0, 0), &mut queue);
        assert!(queue.is_empty());
    }

    #[test]
    fn edge_seeding_rechecks_below_a_lit_drop() {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, true, 16);
        let mut queue = RelightQueue::default();
        let low = ChunkPos::new(0, 0);
        let high = ChunkPos::new(0, 1);
        grid.insert(flat_chunk(low, 4));
        grid.insert(flat_chunk(high, 10));
        for pos in [low, high] {
            init_chunk_lighting(&mut grid, pos, &DefaultBlockLight, &mut queue);
        }
        queue.drain().for_each(drop);

        init_neighbor_light(&mut grid, low, &mut queue);
        let requests: Vec<_> = queue.drain().collect();
        // Only the tall chunk's north row borders a lower, lit column.
        assert_eq!(requests.len(), 16);
        assert!(requests.iter().all(|r| matches!(
            r,
            RecheckRequest::Column { z: 16, y_min: 4, y_max: 8, .. }
        )));
    }

    #[test]
    fn no_sky_world_still_clears_direction_bits() {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, false, 16);
        let mut queue = RelightQueue::default();
        for x in 0..2 {
            let pos = ChunkPos::new(x, 0);
            grid.insert(Chunk::new(pos, LightMode::Authoritative));
            init_chunk_lighting(&mut grid, pos, &DefaultBlockLight, &mut queue);
        }
        init_neighbor_light(&mut grid, ChunkPos::new(0, 0), &mut queue);
        assert!(queue.is_empty());
        let light = grid.get(ChunkPos::new(0, 0)).unwrap().light();
        assert!(!light.pending_init.contains(PendingNeighborInit::EAST));
    }

    #[test]
    fn completion_requires_all_eight_neighbors() {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, false, 16);
        let centre = ChunkPos::new(0, 0);
        let mut chunk = Chunk::new(centre, LightMode::Authoritative);
        chunk.light_mut().pending_init = PendingNeighborInit::AWAITING_COMPLETION;
        grid.insert(chunk);
        let around: Vec<_> = centre.surrounding().collect();
        for &pos in &around[..7] {
            grid.insert(Chunk::new(pos, LightMode::Authoritative));
        }
        assert!(!check_neighbors_loaded(&mut grid, centre));
        grid.insert(Chunk::new(around[7], LightMode::Authoritative));
        assert!(check_neighbors_loaded(&mut grid, centre));
        let light = grid.get(centre).unwrap().light();
        assert!(light.light_populated);
        assert!(light.pending_init.is_empty());
        assert!(!check_neighbors_loaded(&mut grid, centre));
    }

    #[test]
    fn fill_skylight_column_lights_from_height_up() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0), LightMode::Client);
        chunk.set_voxel(2, 20, 2, Voxel::block(BLOCK_STONE));
        fill_skylight_column(&mut chunk, 2, 2);
        assert_eq!(chunk.sky_light(2, 21, 2), MAX_LIGHT_LEVEL);
        assert_eq!(chunk.sky_light(2, 19, 2), 0);
        assert_eq!(chunk.sky_light(2, 200, 2), MAX_LIGHT_LEVEL);
    }
}
