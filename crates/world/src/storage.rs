use std::collections::BTreeMap;

use lru::LruCache;
use seamlight_core::ChunkPos;

use crate::chunk::Chunk;
use crate::lighting::{ChunkGrid, LightMode};

/// In-memory chunk arena with LRU bookkeeping.
/// Uses BTreeMap for deterministic iteration order.
///
/// Eviction is not automatic: unloading a chunk has to run the lighting
/// hooks and persist it first, so the owner asks for
/// [`eviction_candidate`](Self::eviction_candidate) and removes it itself.
pub struct ChunkStorage {
    mode: LightMode,
    has_sky_light: bool,
    chunks: BTreeMap<ChunkPos, Chunk>,
    lru: LruCache<ChunkPos, ()>,
    capacity: usize,
}

impl ChunkStorage {
    /// Create a storage with the desired resident chunk budget.
    pub fn new(mode: LightMode, has_sky_light: bool, capacity: usize) -> Self {
        Self {
            mode,
            has_sky_light,
            chunks: BTreeMap::new(),
            lru: LruCache::unbounded(),
            capacity: capacity.max(1),
        }
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when no chunks are currently stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Resident chunk budget.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Make `chunk` resident. Returns the chunk it replaced, if any.
    pub fn insert(&mut self, chunk: Chunk) -> Option<Chunk> {
        let pos = chunk.position();
        self.touch(pos);
        self.chunks.insert(pos, chunk)
    }

    /// Drop a chunk from residency and hand it back.
    pub fn remove(&mut self, pos: ChunkPos) -> Option<Chunk> {
        self.lru.pop(&pos);
        self.chunks.remove(&pos)
    }

    /// Attempt to fetch a chunk immutably.
    pub fn get(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    /// Fetch a chunk mutably and mark it recently used.
    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        if self.chunks.contains_key(&pos) {
            self.touch(pos);
        }
        self.chunks.get_mut(&pos)
    }

    /// Least recently used chunk once the budget is exceeded.
    pub fn eviction_candidate(&self) -> Option<ChunkPos> {
        if self.chunks.len() <= self.capacity {
            return None;
        }
        self.lru.peek_lru().map(|(pos, _)| *pos)
    }

    /// Iterate over currently resident chunk positions.
    pub fn iter_positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }

    fn touch(&mut self, pos: ChunkPos) {
        self.lru.put(pos, ());
    }
}

impl ChunkGrid for ChunkStorage {
    fn mode(&self) -> LightMode {
        self.mode
    }

    fn has_sky_light(&self) -> bool {
        self.has_sky_light
    }

    fn loaded_chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    fn loaded_chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }
}

impl Default for ChunkStorage {
    fn default() -> Self {
        Self::new(LightMode::default(), true, 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_fetch() {
        let mut storage = ChunkStorage::new(LightMode::Authoritative, true, 4);
        assert!(storage.is_empty());
        storage.insert(Chunk::new(ChunkPos::new(0, 0), LightMode::Authoritative));
        assert!(storage.is_loaded(ChunkPos::new(0, 0)));
        assert!(!storage.is_loaded(ChunkPos::new(1, 0)));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn eviction_candidate_is_least_recently_used() {
        let mut storage = ChunkStorage::new(LightMode::Authoritative, true, 2);
        for x in 0..3 {
            storage.insert(Chunk::new(ChunkPos::new(x, 0), LightMode::Authoritative));
        }
        storage.get_mut(ChunkPos::new(0, 0));
        assert_eq!(storage.eviction_candidate(), Some(ChunkPos::new(1, 0)));
        storage.remove(ChunkPos::new(1, 0));
        assert_eq!(storage.eviction_candidate(), None);
    }

    #[test]
    fn positions_iterate_in_order() {
        let mut storage = ChunkStorage::default();
        for pos in [ChunkPos::new(2, 0), ChunkPos::new(-1, 3), ChunkPos::new(0, 0)] {
            storage.insert(Chunk::new(pos, LightMode::Authoritative));
        }
        let order: Vec<_> = storage.iter_positions().collect();
        assert_eq!(
            order,
            vec![ChunkPos::new(-1, 3), ChunkPos::new(0, 0), ChunkPos::new(2, 0)]
        );
    }
}
