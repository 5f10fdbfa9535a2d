//! Boundary persistence round-trip
//!
//! Owed checks must survive a chunk being saved, dropped and reloaded, and
//! corrupt region files must surface as errors rather than panics.

use std::env;
use std::fs;
use std::path::PathBuf;

use proptest::prelude::*;
use seamlight_core::{BlockPos, ChunkPos, Direction, LightChannel};
use seamlight_world::lighting::{flag_exterior, on_load, on_unload};
use seamlight_world::{
    Chunk, ChunkStorage, DefaultBlockLight, LightMode, NoTracking, RecheckRequest, RegionStore,
    RelightQueue,
};

fn temp_world(tag: &str) -> PathBuf {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    env::temp_dir().join(format!("seamlight_persist_{tag}_{timestamp}"))
}

fn load_or_create(
    grid: &mut ChunkStorage,
    store: &RegionStore,
    pos: ChunkPos,
    queue: &mut RelightQueue,
) {
    let chunk = store
        .load_chunk(pos, LightMode::Authoritative)
        .expect("region readable")
        .unwrap_or_else(|| Chunk::new(pos, LightMode::Authoritative));
    grid.insert(chunk);
    on_load(grid, pos, &DefaultBlockLight, queue, &mut NoTracking);
}

fn unload_and_save(grid: &mut ChunkStorage, store: &RegionStore, pos: ChunkPos) {
    on_unload(grid, pos);
    let mut chunk = grid.remove(pos).expect("chunk resident");
    store.save_chunk(&mut chunk).expect("save chunk");
}

#[test]
fn owed_checks_survive_save_and_reload() {
    let dir = temp_world("owed");
    let store = RegionStore::new(&dir).unwrap();
    let mut grid = ChunkStorage::new(LightMode::Authoritative, false, 64);
    let mut queue = RelightQueue::default();
    let origin = ChunkPos::new(31, 0);
    let east = ChunkPos::new(32, 0);

    load_or_create(&mut grid, &store, origin, &mut queue);
    flag_exterior(
        grid.get_mut(origin).unwrap(),
        15,
        7,
        Direction::East,
        1 << 2,
        LightChannel::Sky,
    );
    unload_and_save(&mut grid, &store, origin);
    assert!(grid.is_empty());

    // The east chunk lives in the next region file.
    load_or_create(&mut grid, &store, east, &mut queue);
    queue.drain().for_each(drop);

    load_or_create(&mut grid, &store, origin, &mut queue);
    assert_eq!(
        queue.drain().collect::<Vec<_>>(),
        vec![RecheckRequest::Area {
            channel: LightChannel::Sky,
            min: BlockPos::new(512, 32, 1),
            max: BlockPos::new(512, 47, 14),
        }]
    );

    // Nothing is owed any more once both sides are saved again.
    unload_and_save(&mut grid, &store, origin);
    unload_and_save(&mut grid, &store, east);
    for pos in [origin, east] {
        let chunk = store.load_chunk(pos, LightMode::Authoritative).unwrap().unwrap();
        assert!(!chunk.light().flags.is_allocated(), "{pos} still owes checks");
    }

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn init_progress_is_persisted() {
    let dir = temp_world("init");
    let store = RegionStore::new(&dir).unwrap();
    let mut grid = ChunkStorage::new(LightMode::Authoritative, true, 64);
    let mut queue = RelightQueue::default();
    let origin = ChunkPos::new(0, 0);

    load_or_create(&mut grid, &store, origin, &mut queue);
    load_or_create(&mut grid, &store, ChunkPos::new(1, 0), &mut queue);
    unload_and_save(&mut grid, &store, origin);

    let reloaded = store.load_chunk(origin, LightMode::Authoritative).unwrap().unwrap();
    let pending = reloaded.light().pending_init;
    assert_eq!(pending.bits(), 31 & !(1 << Direction::East.horizontal_index()));

    fs::remove_dir_all(&dir).ok();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: arbitrary bytes in a region file never panic the loader.
    #[test]
    fn corrupt_region_files_are_errors(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let dir = temp_world("fuzz");
        let store = RegionStore::new(&dir).unwrap();
        fs::write(dir.join("r.0.0.rg"), &bytes).unwrap();
        let result = store.load_chunk(ChunkPos::new(0, 0), LightMode::Authoritative);
        fs::remove_dir_all(&dir).ok();
        prop_assert!(result.is_err());
    }
}
