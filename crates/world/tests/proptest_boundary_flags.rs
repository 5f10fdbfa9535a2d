//! Property-based tests for boundary flag bookkeeping
//!
//! Critical invariants:
//! - Every flagged voxel is rechecked exactly once after the neighbor loads
//! - A second merge or drain with nothing new flagged does nothing
//! - Merging both ways empties both facing OUT groups without losing bits
//! - light_populated never goes back to false

use std::collections::HashMap;

use proptest::prelude::*;
use seamlight_core::{BlockPos, ChunkPos, Direction, LightChannel};
use seamlight_world::lighting::region::out_flag_index;
use seamlight_world::lighting::{
    flag_exterior, merge_flags, on_load, on_unload, schedule_boundaries_authoritative,
};
use seamlight_world::{
    Chunk, ChunkGrid, ChunkStorage, DefaultBlockLight, LightMode, NoTracking, RelightQueue,
};

/// One exterior flag: direction index, column along the edge, section, channel.
fn exterior_flag() -> impl Strategy<Value = (usize, usize, i32, bool)> {
    (0usize..4, 0usize..16, 0i32..16, any::<bool>())
}

fn channel(block: bool) -> LightChannel {
    if block {
        LightChannel::Block
    } else {
        LightChannel::Sky
    }
}

/// Edge column of the origin chunk facing `dir`.
fn edge_column(dir: Direction, along: usize) -> (usize, usize) {
    match dir {
        Direction::East => (15, along),
        Direction::West => (0, along),
        Direction::South => (along, 15),
        Direction::North => (along, 0),
    }
}

fn filled_grid(radius: i32, skip: &[ChunkPos]) -> ChunkStorage {
    let mut grid = ChunkStorage::new(LightMode::Authoritative, false, 256);
    for x in -radius..=radius {
        for z in -radius..=radius {
            let pos = ChunkPos::new(x, z);
            if !skip.contains(&pos) {
                let mut chunk = Chunk::new(pos, LightMode::Authoritative);
                chunk.take_dirty_flags();
                grid.insert(chunk);
            }
        }
    }
    grid
}

proptest! {
    /// Property: each flagged voxel is covered by exactly one request once
    /// the owed checks have been drained, and no flag is left behind.
    #[test]
    fn exterior_flags_are_rechecked_exactly_once(
        flags in prop::collection::vec(exterior_flag(), 1..24),
    ) {
        let mut grid = filled_grid(2, &[]);
        let origin = ChunkPos::new(0, 0);
        let mut expected = Vec::new();
        for &(dir_index, along, section, block) in &flags {
            let dir = Direction::HORIZONTALS[dir_index];
            let (x, z) = edge_column(dir, along);
            flag_exterior(grid.get_mut(origin).unwrap(), x, z, dir, 1 << section, channel(block));
            let (dx, dz) = dir.offset();
            expected.push((channel(block), BlockPos::new(x as i32 + dx, section * 16, z as i32 + dz)));
        }

        let mut queue = RelightQueue::default();
        for dir in Direction::HORIZONTALS {
            let neighbor = origin.neighbor(dir).unwrap();
            schedule_boundaries_authoritative(&mut grid, neighbor, &mut queue, &mut NoTracking);
        }
        let requests: Vec<_> = queue.drain().collect();

        for (channel, voxel) in expected {
            let hits = requests
                .iter()
                .filter(|r| r.channel() == channel && r.contains(voxel))
                .count();
            prop_assert_eq!(hits, 1, "voxel {} on {:?}", voxel, channel);
        }
        for pos in grid.iter_positions().collect::<Vec<_>>() {
            prop_assert!(grid.get(pos).unwrap().light().flags.is_empty(), "flags left on {}", pos);
        }
    }

    /// Property: repeating the drain with nothing newly flagged is silent.
    #[test]
    fn second_drain_is_a_no_op(
        flags in prop::collection::vec(exterior_flag(), 0..16),
    ) {
        let mut grid = filled_grid(2, &[]);
        let origin = ChunkPos::new(0, 0);
        for &(dir_index, along, section, block) in &flags {
            let dir = Direction::HORIZONTALS[dir_index];
            let (x, z) = edge_column(dir, along);
            flag_exterior(grid.get_mut(origin).unwrap(), x, z, dir, 1 << section, channel(block));
        }

        let mut queue = RelightQueue::default();
        for pos in [origin, ChunkPos::new(1, 0), ChunkPos::new(0, 1), ChunkPos::new(-1, 0), ChunkPos::new(0, -1)] {
            schedule_boundaries_authoritative(&mut grid, pos, &mut queue, &mut NoTracking);
        }
        queue.drain().for_each(drop);

        for pos in [origin, ChunkPos::new(1, 0), ChunkPos::new(0, 1)] {
            schedule_boundaries_authoritative(&mut grid, pos, &mut queue, &mut NoTracking);
        }
        prop_assert!(queue.is_empty());
    }

    /// Property: merging A from B and B from A clears both facing OUT groups
    /// and keeps every bit.
    #[test]
    fn merge_is_symmetric(
        west_words in prop::array::uniform3(any::<u32>()),
        east_words in prop::array::uniform3(any::<u32>()),
    ) {
        let mut grid = filled_grid(0, &[]);
        let west = ChunkPos::new(0, 0);
        let east = ChunkPos::new(1, 0);
        grid.insert(Chunk::new(east, LightMode::Authoritative));
        for (offset, (&w, &e)) in (-1..=1).zip(west_words.iter().zip(east_words.iter())) {
            grid.get_mut(west).unwrap().light_mut().flags.insert(out_flag_index(Direction::East, offset), w);
            grid.get_mut(east).unwrap().light_mut().flags.insert(out_flag_index(Direction::West, offset), e);
        }

        merge_flags(&mut grid, east, Direction::West, &mut NoTracking);
        merge_flags(&mut grid, west, Direction::East, &mut NoTracking);
        // Repeating is idempotent.
        prop_assert!(!merge_flags(&mut grid, east, Direction::West, &mut NoTracking));

        let bits = |pos: ChunkPos| -> u32 {
            let flags = &grid.get(pos).unwrap().light().flags;
            (0..20).map(|slot| flags.get(slot).count_ones()).sum()
        };
        let sent: u32 = west_words.iter().chain(east_words.iter()).map(|w| w.count_ones()).sum();
        prop_assert_eq!(bits(west) + bits(east), sent);
        for offset in -1..=1 {
            prop_assert_eq!(grid.get(west).unwrap().light().flags.get(out_flag_index(Direction::East, offset)), 0);
            prop_assert_eq!(grid.get(east).unwrap().light().flags.get(out_flag_index(Direction::West, offset)), 0);
        }
    }

    /// Property: once a chunk is light populated it stays populated through
    /// arbitrary load/unload churn of its surroundings.
    #[test]
    fn light_populated_is_monotonic(
        ops in prop::collection::vec((-2i32..=2, -2i32..=2), 1..80),
    ) {
        let mut grid = ChunkStorage::new(LightMode::Authoritative, true, 256);
        let mut parked: HashMap<ChunkPos, Chunk> = HashMap::new();
        let mut queue = RelightQueue::default();
        let mut populated: Vec<ChunkPos> = Vec::new();

        for (x, z) in ops {
            let pos = ChunkPos::new(x, z);
            if grid.is_loaded(pos) {
                on_unload(&mut grid, pos);
                let chunk = grid.remove(pos).unwrap();
                parked.insert(pos, chunk);
            } else {
                let chunk = parked
                    .remove(&pos)
                    .unwrap_or_else(|| Chunk::new(pos, LightMode::Authoritative));
                grid.insert(chunk);
                on_load(&mut grid, pos, &DefaultBlockLight, &mut queue, &mut NoTracking);
            }
            queue.drain().for_each(drop);

            for &done in &populated {
                let still = grid
                    .get(done)
                    .or_else(|| parked.get(&done))
                    .is_some_and(|c| c.light().light_populated);
                prop_assert!(still, "{} lost light_populated", done);
            }
            for chunk_pos in grid.iter_positions().collect::<Vec<_>>() {
                if grid.get(chunk_pos).unwrap().light().light_populated && !populated.contains(&chunk_pos) {
                    populated.push(chunk_pos);
                }
            }
        }
    }
}
