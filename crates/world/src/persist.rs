//! Region-based chunk persistence with zstd compression.
//!
//! Implements .rg region files that group 32x32 chunks. Each region file is a
//! bincode map of chunk records, zstd compressed and CRC32 validated. A chunk
//! record carries the voxel sections and the chunk's boundary lighting state.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use seamlight_core::{ChunkPos, SECTION_COUNT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunk::{Chunk, Section, Voxel};
use crate::lighting::{
    read_boundary_record, write_boundary_record, BoundaryRecord, ChunkLightState, LightMode,
};

/// Magic number for region file identification ("SLRG" = seamlight region).
const REGION_MAGIC: u32 = 0x534C_5247;

/// Current region file format version.
const REGION_VERSION: u16 = 1;

/// Current chunk record layout.
const CHUNK_RECORD_VERSION: u16 = 1;

/// Region size in chunks (32x32 chunks per region).
const REGION_SIZE: i32 = 32;

const HEADER_LEN: usize = 14;

const ZSTD_LEVEL: i32 = 3;

type RegionData = BTreeMap<ChunkPos, Vec<u8>>;

/// Fixed-size prefix of every region file: magic, format version, CRC32 of
/// the compressed payload and the payload length, all little endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RegionHeader {
    crc32: u32,
    payload_len: u32,
}

impl RegionHeader {
    fn for_payload(payload: &[u8]) -> Self {
        Self {
            crc32: crc32fast::hash(payload),
            payload_len: payload.len() as u32,
        }
    }

    fn encode(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&REGION_MAGIC.to_le_bytes());
        out[4..6].copy_from_slice(&REGION_VERSION.to_le_bytes());
        out[6..10].copy_from_slice(&self.crc32.to_le_bytes());
        out[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let Some(head) = bytes.get(..HEADER_LEN) else {
            anyhow::bail!("Region file truncated: {} byte header", bytes.len());
        };
        let word = |at: usize| u32::from_le_bytes([head[at], head[at + 1], head[at + 2], head[at + 3]]);

        let magic = word(0);
        if magic != REGION_MAGIC {
            anyhow::bail!("Not a region file: magic 0x{magic:08X}");
        }
        let version = u16::from_le_bytes([head[4], head[5]]);
        if version != REGION_VERSION {
            anyhow::bail!("Unsupported region version {version}");
        }
        Ok(Self {
            crc32: word(6),
            payload_len: word(10),
        })
    }
}

/// Serialized form of one chunk.
#[derive(Debug, Serialize, Deserialize)]
struct ChunkRecord {
    version: u16,
    /// One entry per section, bottom up; `None` for unallocated sections.
    sections: Vec<Option<Vec<Voxel>>>,
    light_populated: bool,
    boundary: BoundaryRecord,
}

/// Converts chunk position to region coordinates.
fn chunk_to_region(chunk_pos: ChunkPos) -> (i32, i32) {
    (
        chunk_pos.x.div_euclid(REGION_SIZE),
        chunk_pos.z.div_euclid(REGION_SIZE),
    )
}

/// Region file manager for saving/loading chunks.
pub struct RegionStore {
    world_dir: PathBuf,
}

impl RegionStore {
    /// Create a new region store rooted at the given world directory.
    pub fn new<P: AsRef<Path>>(world_dir: P) -> Result<Self> {
        let world_dir = world_dir.as_ref().to_path_buf();
        fs::create_dir_all(&world_dir).context("Failed to create world directory")?;
        Ok(Self { world_dir })
    }

    /// Get the path to a region file for the given region coordinates.
    fn region_path(&self, region_x: i32, region_z: i32) -> PathBuf {
        self.world_dir.join(format!("r.{}.{}.rg", region_x, region_z))
    }

    /// Save a chunk to its region file and clear its dirty flags.
    ///
    /// Takes the chunk mutably because drained flag tables are released
    /// before the boundary record is built.
    pub fn save_chunk(&self, chunk: &mut Chunk) -> Result<()> {
        let pos = chunk.position();
        let (region_x, region_z) = chunk_to_region(pos);

        let mut region_data = self
            .load_region(region_x, region_z)
            .with_context(|| format!("Failed to read region for chunk {pos}"))?
            .unwrap_or_default();

        let chunk_data = serialize_chunk(chunk)?;
        region_data.insert(pos, chunk_data);
        self.write_region(region_x, region_z, &region_data)?;

        chunk.take_dirty_flags();
        debug!(%pos, "saved chunk");
        Ok(())
    }

    /// Load a chunk from its region file. `Ok(None)` when it was never saved.
    pub fn load_chunk(&self, pos: ChunkPos, mode: LightMode) -> Result<Option<Chunk>> {
        let (region_x, region_z) = chunk_to_region(pos);
        let Some(region_data) = self.load_region(region_x, region_z)? else {
            return Ok(None);
        };
        region_data
            .get(&pos)
            .map(|data| deserialize_chunk(pos, mode, data))
            .transpose()
    }

    /// Read, verify and decode a whole region file.
    fn load_region(&self, region_x: i32, region_z: i32) -> Result<Option<RegionData>> {
        let path = self.region_path(region_x, region_z);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let header = RegionHeader::decode(&bytes)?;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != header.payload_len as usize {
            anyhow::bail!(
                "Region payload is {} bytes, header says {}",
                payload.len(),
                header.payload_len
            );
        }
        let crc = crc32fast::hash(payload);
        if crc != header.crc32 {
            anyhow::bail!("Region checksum mismatch: stored {:08X}, computed {crc:08X}", header.crc32);
        }

        let raw = zstd::decode_all(payload).context("Failed to decompress region")?;
        let data = bincode::deserialize(&raw).context("Failed to decode region")?;
        Ok(Some(data))
    }

    /// Encode a whole region and replace its file.
    ///
    /// The file is written beside the target and renamed over it, so a crash
    /// mid-write leaves the previous region intact.
    fn write_region(&self, region_x: i32, region_z: i32, data: &RegionData) -> Result<()> {
        let path = self.region_path(region_x, region_z);
        let raw = bincode::serialize(data).context("Failed to encode region")?;
        let payload = zstd::encode_all(&raw[..], ZSTD_LEVEL).context("Failed to compress region")?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(&RegionHeader::for_payload(&payload).encode());
        bytes.extend_from_slice(&payload);

        let staging = path.with_extension("rg.tmp");
        fs::write(&staging, &bytes)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("Failed to move region into {}", path.display()))?;
        Ok(())
    }

    /// Check if the region holding `pos` exists on disk.
    pub fn chunk_exists(&self, pos: ChunkPos) -> bool {
        let (region_x, region_z) = chunk_to_region(pos);
        self.region_path(region_x, region_z).exists()
    }
}

fn serialize_chunk(chunk: &mut Chunk) -> Result<Vec<u8>> {
    let boundary = write_boundary_record(chunk);
    let mut sections = vec![None; SECTION_COUNT];
    for (index, section) in chunk.sections() {
        sections[index] = Some(section.voxels().to_vec());
    }
    let record = ChunkRecord {
        version: CHUNK_RECORD_VERSION,
        sections,
        light_populated: chunk.light().light_populated,
        boundary,
    };
    bincode::serialize(&record).context("Failed to serialize chunk data")
}

fn deserialize_chunk(pos: ChunkPos, mode: LightMode, data: &[u8]) -> Result<Chunk> {
    let record: ChunkRecord =
        bincode::deserialize(data).context("Failed to deserialize chunk data")?;

    if record.version != CHUNK_RECORD_VERSION {
        anyhow::bail!("Unsupported chunk record version {}", record.version);
    }
    if record.sections.len() != SECTION_COUNT {
        anyhow::bail!(
            "Invalid chunk data: expected {} sections, got {}",
            SECTION_COUNT,
            record.sections.len()
        );
    }

    let mut sections: [Option<Section>; SECTION_COUNT] = Default::default();
    for (index, voxels) in record.sections.into_iter().enumerate() {
        if let Some(voxels) = voxels {
            let section = Section::from_voxels(voxels)
                .with_context(|| format!("Invalid voxel count in section {index}"))?;
            sections[index] = Some(section);
        }
    }

    let mut light = ChunkLightState::new(mode);
    light.light_populated = record.light_populated;
    let mut chunk = Chunk::from_sections(pos, sections, light);
    read_boundary_record(&mut chunk, record.boundary);
    Ok(chunk)
}
