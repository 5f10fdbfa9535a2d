use seamlight_core::{ChunkPos, SECTION_COUNT};

use crate::lighting::{ChunkLightState, LightMode};

/// Chunk width (X axis) in voxels.
pub const CHUNK_SIZE_X: usize = 16;
/// Chunk height (Y axis) in voxels.
pub const CHUNK_SIZE_Y: usize = 256;
/// Chunk depth (Z axis) in voxels.
pub const CHUNK_SIZE_Z: usize = 16;
/// Section height in voxels.
pub const SECTION_SIZE_Y: usize = 16;
/// Voxel count per section.
pub const SECTION_VOLUME: usize = CHUNK_SIZE_X * SECTION_SIZE_Y * CHUNK_SIZE_Z;

/// Full sky light level.
pub const MAX_LIGHT_LEVEL: u8 = 15;

/// Block identifier referencing the registry.
pub type BlockId = u16;

/// Reserved ID for air.
pub const BLOCK_AIR: BlockId = 0;
/// ID for stone block.
pub const BLOCK_STONE: BlockId = 1;
/// ID for glowstone (emits block light).
pub const BLOCK_GLOWSTONE: BlockId = 2;

/// Chunk-local position (X, Y, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalPos {
    /// Section holding this position.
    pub fn section(self) -> usize {
        self.y / SECTION_SIZE_Y
    }

    /// Linear index inside the owning section.
    pub fn section_index(self) -> usize {
        debug_assert!(self.x < CHUNK_SIZE_X);
        debug_assert!(self.y < CHUNK_SIZE_Y);
        debug_assert!(self.z < CHUNK_SIZE_Z);
        ((self.y % SECTION_SIZE_Y) * CHUNK_SIZE_Z + self.z) * CHUNK_SIZE_X + self.x
    }
}

/// Per-voxel data stored in a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Voxel {
    pub id: BlockId,
    pub light_sky: u8,
    pub light_block: u8,
}

impl Voxel {
    /// A voxel of the given block with no light.
    pub const fn block(id: BlockId) -> Self {
        Self {
            id,
            light_sky: 0,
            light_block: 0,
        }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.id == BLOCK_AIR
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.id != BLOCK_AIR
    }
}

/// 16×16×16 slab of voxels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    voxels: Box<[Voxel]>,
    non_air: u16,
}

impl Section {
    fn new() -> Self {
        Self {
            voxels: vec![Voxel::default(); SECTION_VOLUME].into_boxed_slice(),
            non_air: 0,
        }
    }

    /// Rebuild a section from persisted voxels.
    pub fn from_voxels(voxels: Vec<Voxel>) -> Option<Self> {
        if voxels.len() != SECTION_VOLUME {
            return None;
        }
        let non_air = voxels.iter().filter(|v| !v.is_air()).count() as u16;
        Some(Self {
            voxels: voxels.into_boxed_slice(),
            non_air,
        })
    }

    /// Raw voxels in `(y, z, x)` order.
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// True when every voxel is air.
    pub fn is_empty(&self) -> bool {
        self.non_air == 0
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Dirty flags set whenever chunk data changes.
    pub struct DirtyFlags: u8 {
        /// Voxel data changed.
        const BLOCKS = 0b0000_0001;
        /// Chunk must be written back before it is dropped.
        const PERSIST = 0b0000_0010;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        DirtyFlags::empty()
    }
}

/// Column chunk: 16 lazily allocated sections, a heightmap and the
/// boundary lighting state attached to it.
#[derive(Debug)]
pub struct Chunk {
    position: ChunkPos,
    sections: [Option<Section>; SECTION_COUNT],
    /// One past the topmost opaque voxel per column, indexed `z * 16 + x`.
    heights: [u16; CHUNK_SIZE_X * CHUNK_SIZE_Z],
    dirty: DirtyFlags,
    light: ChunkLightState,
}

impl Chunk {
    /// Allocate a fresh chunk filled with air.
    pub fn new(position: ChunkPos, mode: LightMode) -> Self {
        Self {
            position,
            sections: Default::default(),
            heights: [0; CHUNK_SIZE_X * CHUNK_SIZE_Z],
            dirty: DirtyFlags::all(),
            light: ChunkLightState::new(mode),
        }
    }

    /// Reassemble a chunk from persisted sections. Heights are recomputed.
    pub fn from_sections(
        position: ChunkPos,
        sections: [Option<Section>; SECTION_COUNT],
        light: ChunkLightState,
    ) -> Self {
        let mut chunk = Self {
            position,
            sections,
            heights: [0; CHUNK_SIZE_X * CHUNK_SIZE_Z],
            dirty: DirtyFlags::empty(),
            light,
        };
        for x in 0..CHUNK_SIZE_X {
            for z in 0..CHUNK_SIZE_Z {
                chunk.rescan_height(x, z, CHUNK_SIZE_Y);
            }
        }
        chunk
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Fetch a voxel copy. Voxels in unallocated sections are air.
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Voxel {
        let pos = LocalPos { x, y, z };
        match &self.sections[pos.section()] {
            Some(section) => section.voxels[pos.section_index()],
            None => Voxel::default(),
        }
    }

    /// Set a voxel, keep the heightmap current and mark the chunk dirty.
    pub fn set_voxel(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) {
        let pos = LocalPos { x, y, z };
        let slot = &mut self.sections[pos.section()];
        if slot.is_none() && voxel == Voxel::default() {
            return;
        }
        let section = slot.get_or_insert_with(Section::new);
        let idx = pos.section_index();
        let old = section.voxels[idx];
        if old == voxel {
            return;
        }
        section.voxels[idx] = voxel;
        match (old.is_air(), voxel.is_air()) {
            (true, false) => section.non_air += 1,
            (false, true) => section.non_air -= 1,
            _ => {}
        }
        if old.is_opaque() != voxel.is_opaque() {
            self.update_height(x, y, z, voxel.is_opaque());
        }
        self.dirty.insert(DirtyFlags::BLOCKS | DirtyFlags::PERSIST);
    }

    /// Sky light at a voxel. Unallocated sections are fully lit above the
    /// column height and dark below it.
    pub fn sky_light(&self, x: usize, y: usize, z: usize) -> u8 {
        let pos = LocalPos { x, y, z };
        match &self.sections[pos.section()] {
            Some(section) => section.voxels[pos.section_index()].light_sky,
            None if y as i32 >= self.height(x, z) => MAX_LIGHT_LEVEL,
            None => 0,
        }
    }

    /// Store a sky light value. Writes into unallocated sections are dropped.
    pub fn set_sky_light(&mut self, x: usize, y: usize, z: usize, level: u8) {
        let pos = LocalPos { x, y, z };
        if let Some(section) = &mut self.sections[pos.section()] {
            section.voxels[pos.section_index()].light_sky = level;
        }
    }

    /// Height of a column: one past its topmost opaque voxel, 0 if none.
    pub fn height(&self, x: usize, z: usize) -> i32 {
        self.heights[z * CHUNK_SIZE_X + x] as i32
    }

    /// Allocated sections with their index, bottom up.
    pub fn sections(&self) -> impl Iterator<Item = (usize, &Section)> {
        self.sections
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Whether section `index` is allocated.
    pub fn has_section(&self, index: usize) -> bool {
        self.sections.get(index).is_some_and(|s| s.is_some())
    }

    /// Request that the chunk be written back on unload.
    pub fn mark_dirty(&mut self) {
        self.dirty.insert(DirtyFlags::PERSIST);
    }

    /// Current dirty flags without clearing them.
    pub fn dirty_flags(&self) -> DirtyFlags {
        self.dirty
    }

    /// Consume and return the current dirty flags.
    pub fn take_dirty_flags(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.dirty)
    }

    /// Boundary lighting state attached to this chunk.
    pub fn light(&self) -> &ChunkLightState {
        &self.light
    }

    /// Mutable boundary lighting state.
    pub fn light_mut(&mut self) -> &mut ChunkLightState {
        &mut self.light
    }

    fn update_height(&mut self, x: usize, y: usize, z: usize, opaque: bool) {
        let current = self.height(x, z) as usize;
        if opaque && y + 1 > current {
            self.heights[z * CHUNK_SIZE_X + x] = (y + 1) as u16;
        } else if !opaque && y + 1 == current {
            self.rescan_height(x, z, y);
        }
    }

    fn rescan_height(&mut self, x: usize, z: usize, below: usize) {
        let height = (0..below)
            .rev()
            .find(|&y| self.voxel(x, y, z).is_opaque())
            .map_or(0, |y| y + 1);
        self.heights[z * CHUNK_SIZE_X + x] = height as u16;
    }
}
