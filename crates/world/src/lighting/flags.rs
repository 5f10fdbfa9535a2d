//! Lazily allocated flag table.

use seamlight_core::LightChannel;

use super::LightMode;

/// Mask selecting one channel's 16 section bits.
pub const SECTION_MASK: u32 = 0xFFFF;

/// Per-chunk array of packed flag words.
///
/// Each word holds two 16-bit section masks, sky in the low half and block in
/// the high half. The array is absent until the first non-zero write; an
/// absent table reads as all zero. Its length is fixed by the mode the table
/// was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryFlags {
    len: usize,
    words: Option<Box<[u32]>>,
}

impl BoundaryFlags {
    /// Empty table sized for `mode`.
    pub fn new(mode: LightMode) -> Self {
        Self {
            len: mode.flag_count(),
            words: None,
        }
    }

    /// Slot count this table was created with.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the backing array has been allocated.
    pub fn is_allocated(&self) -> bool {
        self.words.is_some()
    }

    /// True when no slot holds a set bit.
    pub fn is_empty(&self) -> bool {
        self.words
            .as_deref()
            .map_or(true, |words| words.iter().all(|&w| w == 0))
    }

    /// Word in `slot`; unallocated tables and out-of-range slots read zero.
    pub fn get(&self, slot: usize) -> u32 {
        self.words
            .as_deref()
            .and_then(|words| words.get(slot))
            .copied()
            .unwrap_or(0)
    }

    /// OR `bits` into `slot`, allocating on the first non-zero write.
    pub fn insert(&mut self, slot: usize, bits: u32) {
        if bits == 0 {
            return;
        }
        debug_assert!(slot < self.len, "slot {slot} out of range");
        let len = self.len;
        let words = self
            .words
            .get_or_insert_with(|| vec![0; len].into_boxed_slice());
        if let Some(word) = words.get_mut(slot) {
            *word |= bits;
        }
    }

    /// Read and zero `slot` in one step.
    pub fn take(&mut self, slot: usize) -> u32 {
        self.words
            .as_deref_mut()
            .and_then(|words| words.get_mut(slot))
            .map_or(0, std::mem::take)
    }

    /// Raw words when allocated.
    pub fn words(&self) -> Option<&[u32]> {
        self.words.as_deref()
    }

    /// Replace the whole table. `words` must have exactly [`len`](Self::len)
    /// entries; an all-zero table is stored as absent.
    pub fn set_words(&mut self, words: Vec<u32>) -> Result<(), usize> {
        if words.len() != self.len {
            return Err(words.len());
        }
        self.words = if words.iter().all(|&w| w == 0) {
            None
        } else {
            Some(words.into_boxed_slice())
        };
        Ok(())
    }

    /// Drop the backing array if every slot is zero.
    pub fn release_if_empty(&mut self) {
        if self.is_allocated() && self.is_empty() {
            self.words = None;
        }
    }
}

/// Section mask of `channel` inside a packed word.
pub const fn channel_mask(word: u32, channel: LightChannel) -> u16 {
    ((word >> channel.shift()) & SECTION_MASK) as u16
}

/// Section indices set in a 16-bit mask, bottom up.
pub fn sections(mask: u16) -> impl Iterator<Item = i32> {
    (0..16).filter(move |&y| mask & (1u16 << y) != 0)
}
