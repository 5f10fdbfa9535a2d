use seamlight_core::{ChunkPos, Direction};
use tracing::debug;

use super::region::{out_flag_index, ring_flag_index};
use super::{BoundaryTracker, ChunkGrid};

/// Pull the checks the neighbor in `dir` owes to `pos` into `pos`'s ring.
///
/// Each word of the neighbor's OUT group facing `pos` is taken (read and
/// zeroed) and ORed into the matching ring slot of `pos`, so a word is moved
/// exactly once. Returns whether anything moved. Missing chunks and neighbors
/// without a flag table are a no-op.
pub fn merge_flags(
    grid: &mut dyn ChunkGrid,
    pos: ChunkPos,
    dir: Direction,
    tracker: &mut dyn BoundaryTracker,
) -> bool {
    let Some(neighbor) = pos.neighbor(dir) else {
        return false;
    };
    if !grid.is_loaded(pos) {
        return false;
    }
    let back = dir.opposite();

    let mut moved = [0u32; 3];
    {
        let Some(source) = grid.loaded_chunk_mut(neighbor) else {
            return false;
        };
        let flags = &mut source.light_mut().flags;
        if !flags.is_allocated() {
            return false;
        }
        for (word, offset) in moved.iter_mut().zip(-1..=1) {
            *word = flags.take(out_flag_index(back, offset));
        }
        if moved.iter().all(|&w| w == 0) {
            return false;
        }
        source.mark_dirty();
    }

    let Some(target) = grid.loaded_chunk_mut(pos) else {
        return false;
    };
    for (&word, offset) in moved.iter().zip(-1..=1) {
        if word != 0 {
            target.light_mut().flags.insert(ring_flag_index(dir, offset), word);
        }
    }
    target.mark_dirty();

    for (&word, offset) in moved.iter().zip(-1..=1) {
        if word != 0 {
            tracker.track_transfer(neighbor, back, offset, word);
        }
    }
    debug!(%pos, from = %neighbor, dir = dir.as_str(), ?moved, "merged boundary flags");
    true
}
