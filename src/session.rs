//! Headless lighting session: streams chunks around a moving viewer, edits
//! blocks near chunk edges and drives the boundary hooks every tick.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use seamlight_core::{
    chunk_rng, BlockPos, ChunkPos, Direction, LightChannel, SimTick, VerticalFacing,
    SECTION_HEIGHT,
};
use seamlight_testkit::{
    BoundaryMetrics, EventRecord, JsonlSink, MetricsReport, MetricsReportBuilder,
    PersistenceMetrics, TestExecutionMetrics, TestResult, TransferLog,
};
use seamlight_world::lighting::region::out_flag_index;
use seamlight_world::lighting::{
    fill_skylight_column, flag_exterior_block, flag_interior_block, flag_vertical,
    pack_section_mask,
};
use seamlight_world::{
    lighting, BlockId, BlockLightProvider, Chunk, ChunkGrid, ChunkStorage, DefaultBlockLight,
    DirtyFlags, RecheckRequest, RegionStore, RelightEngine, RelightQueue, Voxel, BLOCK_AIR,
    BLOCK_GLOWSTONE, BLOCK_STONE, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z,
};

use crate::config::LightingConfig;

/// Viewer moves this many chunks east before stepping one chunk south.
const EAST_RUN: u64 = 8;

pub struct Session {
    cfg: LightingConfig,
    grid: ChunkStorage,
    store: Option<RegionStore>,
    blocks: DefaultBlockLight,
    queue: RelightQueue,
    transfers: TransferLog,
    events: Option<JsonlSink>,
    rng: StdRng,
    viewer: ChunkPos,
    moves: u64,
    tick: SimTick,
    boundary: BoundaryMetrics,
    persistence: PersistenceMetrics,
    save_time: Duration,
    load_time: Duration,
    populated: BTreeSet<ChunkPos>,
}

impl Session {
    pub fn new(cfg: LightingConfig) -> Result<Self> {
        let store = match (&cfg.world_dir, cfg.mode.is_client()) {
            (Some(dir), false) => Some(
                RegionStore::new(dir)
                    .with_context(|| format!("Failed to open world at {}", dir.display()))?,
            ),
            (Some(dir), true) => {
                warn!(
                    path = %dir.display(),
                    "Client sessions do not persist chunks; ignoring world_dir"
                );
                None
            }
            (None, _) => None,
        };
        let events = cfg
            .events_path
            .as_ref()
            .map(JsonlSink::create)
            .transpose()
            .context("Failed to create event log")?;

        Ok(Self {
            grid: ChunkStorage::new(cfg.mode, cfg.has_sky_light, cfg.cache_capacity),
            store,
            blocks: DefaultBlockLight,
            queue: RelightQueue::default(),
            transfers: TransferLog::default(),
            events,
            rng: chunk_rng(cfg.world_seed, ChunkPos::new(i32::MIN, i32::MIN)),
            viewer: ChunkPos::new(0, 0),
            moves: 0,
            tick: SimTick::ZERO,
            boundary: BoundaryMetrics::default(),
            persistence: PersistenceMetrics::default(),
            save_time: Duration::ZERO,
            load_time: Duration::ZERO,
            populated: BTreeSet::new(),
            cfg,
        })
    }

    pub fn grid(&self) -> &ChunkStorage {
        &self.grid
    }

    pub fn viewer(&self) -> ChunkPos {
        self.viewer
    }

    /// Deterministic terrain: rolling stone with a few glowstone blocks on top.
    pub fn generate_chunk(&self, pos: ChunkPos) -> Chunk {
        let mut rng = chunk_rng(self.cfg.world_seed, pos);
        let mut chunk = Chunk::new(pos, self.cfg.mode);
        let base = rng.gen_range(48..80usize);
        for x in 0..CHUNK_SIZE_X {
            for z in 0..CHUNK_SIZE_Z {
                let height = base + rng.gen_range(0..4usize);
                for y in 0..height {
                    chunk.set_voxel(x, y, z, Voxel::block(BLOCK_STONE));
                }
            }
        }
        for _ in 0..rng.gen_range(0..3) {
            let (x, z) = (rng.gen_range(0..CHUNK_SIZE_X), rng.gen_range(0..CHUNK_SIZE_Z));
            let y = chunk.height(x, z).max(1) as usize - 1;
            chunk.set_voxel(x, y, z, Voxel::block(BLOCK_GLOWSTONE));
        }
        if self.cfg.has_sky_light {
            for x in 0..CHUNK_SIZE_X {
                for z in 0..CHUNK_SIZE_Z {
                    fill_skylight_column(&mut chunk, x, z);
                }
            }
        }
        chunk
    }

    /// Make `pos` resident, from disk when it was saved before.
    pub fn load_chunk(&mut self, pos: ChunkPos) -> Result<()> {
        if self.grid.is_loaded(pos) {
            return Ok(());
        }
        let stored = match &self.store {
            Some(store) => {
                let started = Instant::now();
                let chunk = store
                    .load_chunk(pos, self.cfg.mode)
                    .with_context(|| format!("Failed to load chunk {pos}"))?;
                if chunk.is_some() {
                    self.load_time += started.elapsed();
                    self.persistence.chunks_loaded += 1;
                }
                chunk
            }
            None => None,
        };
        let chunk = match stored {
            Some(chunk) => chunk,
            None => self.generate_chunk(pos),
        };
        self.grid.insert(chunk);
        lighting::on_load(
            &mut self.grid,
            pos,
            &self.blocks,
            &mut self.queue,
            &mut self.transfers,
        );
        self.boundary.chunks_loaded += 1;
        self.event("chunk_load", &pos.to_string())
    }

    /// Run the unload hook, then persist and drop the chunk.
    pub fn unload_chunk(&mut self, pos: ChunkPos) -> Result<()> {
        lighting::on_unload(&mut self.grid, pos);
        let Some(mut chunk) = self.grid.remove(pos) else {
            return Ok(());
        };
        if chunk.light().light_populated {
            self.populated.insert(pos);
        }
        self.save(&mut chunk)?;
        self.boundary.chunks_unloaded += 1;
        self.event("chunk_unload", &pos.to_string())
    }

    /// Load the view window around `centre` and evict past the budget.
    pub fn update_view(&mut self, centre: ChunkPos) -> Result<()> {
        self.viewer = centre;
        let r = self.cfg.view_radius;
        for dz in -r..=r {
            for dx in -r..=r {
                let Some(pos) = centre.offset(dx, dz) else {
                    continue;
                };
                // Touching resident chunks keeps the window out of eviction.
                if self.grid.get_mut(pos).is_none() {
                    self.load_chunk(pos)?;
                }
            }
        }
        while let Some(victim) = self.grid.eviction_candidate() {
            self.unload_chunk(victim)?;
        }
        Ok(())
    }

    /// Replace the block at `pos` and record the light checks it causes.
    /// Returns false when the chunk is not loaded or nothing changed.
    pub fn edit_block(&mut self, pos: BlockPos, block: BlockId) -> bool {
        let chunk_pos = pos.chunk();
        let Some(section) = pos.section() else {
            return false;
        };
        let (x, z) = pos.local_xz();
        let y = pos.y as usize;

        let unloaded: Vec<Direction> = if self.cfg.mode.is_client() {
            Vec::new()
        } else {
            edge_directions(x, z)
                .filter(|&dir| {
                    chunk_pos
                        .neighbor(dir)
                        .is_some_and(|n| !self.grid.is_loaded(n))
                })
                .collect()
        };
        let has_sky = self.grid.has_sky_light();
        let mode = self.cfg.mode;
        let blocks = self.blocks;

        let Some(chunk) = self.grid.get_mut(chunk_pos) else {
            return false;
        };
        let old = chunk.voxel(x, y, z).id;
        if old == block {
            return false;
        }
        chunk.set_voxel(x, y, z, Voxel::block(block));

        let opacity_changed = blocks.is_opaque(old) != blocks.is_opaque(block);
        let mut channels = Vec::with_capacity(2);
        if has_sky && opacity_changed {
            channels.push(LightChannel::Sky);
        }
        if opacity_changed || blocks.light_emission(old) != blocks.light_emission(block) {
            channels.push(LightChannel::Block);
        }

        let mut flags_set = 0;
        for &channel in &channels {
            flag_interior_block(chunk, pos, channel);
            flags_set += 1;
            for &dir in &unloaded {
                flag_exterior_block(chunk, pos, dir, channel);
                flags_set += 1;
            }
            if mode.is_client() {
                let bits = pack_section_mask(1 << section, channel);
                match pos.y.rem_euclid(SECTION_HEIGHT) {
                    0 => {
                        flag_vertical(chunk, VerticalFacing::Down, bits);
                        flags_set += 1;
                    }
                    15 => {
                        flag_vertical(chunk, VerticalFacing::Up, bits);
                        flags_set += 1;
                    }
                    _ => {}
                }
            }
            self.queue
                .recheck_column(channel, pos.x, pos.z, pos.y, pos.y);
        }
        self.boundary.flags_set += flags_set;
        debug!(%pos, old, block, "edited block");
        true
    }

    /// Advance one tick: move the viewer, edit, drain and record.
    pub fn tick(&mut self) -> Result<()> {
        if self.tick.0 % self.cfg.ticks_per_move.max(1) == 0 {
            let next = self.next_viewer();
            self.update_view(next)?;
        }

        for _ in 0..self.cfg.edits_per_tick {
            let (pos, block) = self.random_edit();
            self.edit_block(pos, block);
        }

        if self.cfg.mode.is_client() {
            let positions: Vec<_> = self.grid.iter_positions().collect();
            for pos in positions {
                lighting::on_tick(&mut self.grid, pos, &mut self.queue);
            }
        }

        self.drain_requests();
        self.record_transfers()?;
        self.tick = self.tick.advance(1);
        Ok(())
    }

    /// Save every resident chunk and build the run report.
    pub fn finish(mut self, elapsed: Duration) -> Result<MetricsReport> {
        let positions: Vec<_> = self.grid.iter_positions().collect();
        for &pos in &positions {
            if let Some(mut chunk) = self.grid.remove(pos) {
                if chunk.light().light_populated {
                    self.populated.insert(pos);
                }
                if !chunk.light().flags.is_empty() {
                    self.boundary.chunks_with_pending_flags += 1;
                }
                self.save(&mut chunk)?;
                self.grid.insert(chunk);
            }
        }
        self.boundary.chunks_populated = self.populated.len() as u64;

        let (validated, failures) = self.validate();
        for pos in &failures {
            warn!(%pos, "boundary validation failed");
        }
        let result = if failures.is_empty() {
            TestResult::Pass
        } else {
            TestResult::Fail
        };

        if self.persistence.chunks_saved > 0 {
            self.persistence.avg_save_time_us =
                self.save_time.as_micros() as f64 / self.persistence.chunks_saved as f64;
        }
        if self.persistence.chunks_loaded > 0 {
            self.persistence.avg_load_time_us =
                self.load_time.as_micros() as f64 / self.persistence.chunks_loaded as f64;
        }

        info!(
            ticks = self.tick.0,
            loaded = self.boundary.chunks_loaded,
            transfers = self.boundary.transfers,
            ?result,
            "session finished"
        );

        let mut builder = MetricsReportBuilder::new(format!("seamlight_{}", mode_label(&self.cfg)))
            .result(result)
            .boundary(self.boundary.clone())
            .execution(TestExecutionMetrics {
                duration_seconds: elapsed.as_secs_f64(),
                ticks: Some(self.tick.0),
                validations_passed: Some(validated),
            });
        if self.store.is_some() {
            builder = builder.persistence(self.persistence.clone());
        }
        Ok(builder.build())
    }

    fn save(&mut self, chunk: &mut Chunk) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if !chunk.dirty_flags().contains(DirtyFlags::PERSIST) {
            return Ok(());
        }
        let started = Instant::now();
        store
            .save_chunk(chunk)
            .with_context(|| format!("Failed to save chunk {}", chunk.position()))?;
        self.save_time += started.elapsed();
        self.persistence.chunks_saved += 1;
        Ok(())
    }

    fn next_viewer(&mut self) -> ChunkPos {
        if self.tick == SimTick::ZERO {
            return self.viewer;
        }
        self.moves += 1;
        let (dx, dz) = if self.moves % EAST_RUN == 0 { (0, 1) } else { (1, 0) };
        self.viewer.offset(dx, dz).unwrap_or(self.viewer)
    }

    /// A random block change near the surface, biased toward chunk edges.
    fn random_edit(&mut self) -> (BlockPos, BlockId) {
        let r = self.cfg.view_radius;
        let chunk = self
            .viewer
            .offset(self.rng.gen_range(-r..=r), self.rng.gen_range(-r..=r))
            .unwrap_or(self.viewer);

        let along = self.rng.gen_range(0..CHUNK_SIZE_X);
        let (x, z) = if self.rng.gen_bool(0.5) {
            match self.rng.gen_range(0..4) {
                0 => (0, along),
                1 => (CHUNK_SIZE_X - 1, along),
                2 => (along, 0),
                _ => (along, CHUNK_SIZE_Z - 1),
            }
        } else {
            (along, self.rng.gen_range(0..CHUNK_SIZE_Z))
        };

        let height = self
            .grid
            .get(chunk)
            .map_or(0, |c| c.height(x, z))
            .clamp(1, CHUNK_SIZE_Y as i32 - 1);
        let (y, block) = if self.rng.gen_bool(0.5) {
            let block = if self.rng.gen_ratio(1, 4) {
                BLOCK_GLOWSTONE
            } else {
                BLOCK_STONE
            };
            (height, block)
        } else {
            (height - 1, BLOCK_AIR)
        };
        let pos = BlockPos::new(
            chunk.min_block_x() + x as i32,
            y,
            chunk.min_block_z() + z as i32,
        );
        (pos, block)
    }

    fn drain_requests(&mut self) {
        for request in self.queue.drain() {
            match request {
                RecheckRequest::Column { .. } => self.boundary.column_rechecks += 1,
                RecheckRequest::Area { .. } => self.boundary.area_rechecks += 1,
            }
            self.boundary.voxels_rechecked += request.volume();
        }
    }

    fn record_transfers(&mut self) -> Result<()> {
        self.boundary.transfers += self.transfers.transfers().len() as u64;
        self.boundary.bits_transferred += self.transfers.bits_moved();
        match &mut self.events {
            Some(sink) => self.transfers.flush_to(sink, self.tick),
            None => {
                self.transfers.clear();
                Ok(())
            }
        }
    }

    /// Check the bookkeeping left behind by the run. Servers must not owe
    /// anything toward a loaded neighbor; fully surrounded client chunks
    /// must have replayed their checks.
    fn validate(&self) -> (usize, Vec<ChunkPos>) {
        let mut checked = 0;
        let mut failures = Vec::new();
        for pos in self.grid.iter_positions() {
            let Some(chunk) = self.grid.get(pos) else {
                continue;
            };
            let light = chunk.light();
            let ok = if self.cfg.mode.is_client() {
                if light.neighbors_loaded < 8 {
                    continue;
                }
                !light.pending_boundary_checks
            } else {
                Direction::HORIZONTALS
                    .into_iter()
                    .filter(|&dir| pos.neighbor(dir).is_some_and(|n| self.grid.is_loaded(n)))
                    .all(|dir| (-1..=1).all(|offset| light.flags.get(out_flag_index(dir, offset)) == 0))
            };
            checked += 1;
            if !ok {
                failures.push(pos);
            }
        }
        (checked, failures)
    }

    fn event(&mut self, kind: &str, payload: &str) -> Result<()> {
        if let Some(sink) = &mut self.events {
            sink.write(&EventRecord {
                tick: self.tick,
                kind,
                payload,
            })?;
        }
        Ok(())
    }
}

fn mode_label(cfg: &LightingConfig) -> &'static str {
    if cfg.mode.is_client() {
        "client"
    } else {
        "authoritative"
    }
}

/// Directions whose edge column `(x, z)` lies on.
fn edge_directions(x: usize, z: usize) -> impl Iterator<Item = Direction> {
    Direction::HORIZONTALS.into_iter().filter(move |dir| match dir {
        Direction::East => x == CHUNK_SIZE_X - 1,
        Direction::West => x == 0,
        Direction::South => z == CHUNK_SIZE_Z - 1,
        Direction::North => z == 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use seamlight_world::LightMode;

    fn config(mode: LightMode) -> LightingConfig {
        LightingConfig {
            mode,
            view_radius: 1,
            cache_capacity: 9,
            ticks: 12,
            ticks_per_move: 1,
            edits_per_tick: 6,
            ..LightingConfig::default()
        }
        .sanitized()
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("seamlight_session_{tag}_{nanos}"))
    }

    #[test]
    fn generation_is_deterministic() {
        let session = Session::new(config(LightMode::Authoritative)).unwrap();
        let a = session.generate_chunk(ChunkPos::new(3, -2));
        let b = session.generate_chunk(ChunkPos::new(3, -2));
        for x in 0..CHUNK_SIZE_X {
            for z in 0..CHUNK_SIZE_Z {
                assert_eq!(a.height(x, z), b.height(x, z));
                assert!(a.height(x, z) >= 48);
            }
        }
    }

    #[test]
    fn view_window_stays_within_budget() {
        let mut session = Session::new(config(LightMode::Authoritative)).unwrap();
        session.update_view(ChunkPos::new(0, 0)).unwrap();
        assert_eq!(session.grid().len(), 9);
        session.update_view(ChunkPos::new(1, 0)).unwrap();
        assert_eq!(session.grid().len(), 9);
        assert!(!session.grid().is_loaded(ChunkPos::new(-1, 0)));
        assert!(session.grid().is_loaded(ChunkPos::new(2, 1)));
    }

    #[test]
    fn edge_edit_next_to_unloaded_chunk_owes_a_check() {
        let mut session = Session::new(config(LightMode::Authoritative)).unwrap();
        session.update_view(ChunkPos::new(0, 0)).unwrap();
        // Column x = 31 of chunk (1, 0) borders the unloaded chunk (2, 0).
        let height = session.grid().get(ChunkPos::new(1, 0)).unwrap().height(15, 7);
        assert!(session.edit_block(BlockPos::new(31, height, 7), BLOCK_GLOWSTONE));

        let flags = &session.grid().get(ChunkPos::new(1, 0)).unwrap().light().flags;
        assert_ne!(flags.get(out_flag_index(Direction::East, 0)), 0);

        // Loading the neighbor hands the check over and drains it.
        session.load_chunk(ChunkPos::new(2, 0)).unwrap();
        let flags = &session.grid().get(ChunkPos::new(1, 0)).unwrap().light().flags;
        assert_eq!(flags.get(out_flag_index(Direction::East, 0)), 0);
    }

    #[test]
    fn unchanged_block_is_not_an_edit() {
        let mut session = Session::new(config(LightMode::Authoritative)).unwrap();
        session.update_view(ChunkPos::new(0, 0)).unwrap();
        assert!(!session.edit_block(BlockPos::new(4, 0, 4), BLOCK_STONE));
        assert!(!session.edit_block(BlockPos::new(400, 60, 4), BLOCK_STONE));
    }

    #[test]
    fn authoritative_run_validates() {
        let cfg = config(LightMode::Authoritative);
        let ticks = cfg.ticks;
        let mut session = Session::new(cfg).unwrap();
        for _ in 0..ticks {
            session.tick().unwrap();
        }
        let report = session.finish(Duration::from_millis(5)).unwrap();
        assert_eq!(report.result, TestResult::Pass);
        let boundary = report.boundary.unwrap();
        assert!(boundary.chunks_unloaded > 0);
        assert!(boundary.column_rechecks > 0);
        assert_eq!(report.test_execution.ticks, Some(ticks));
    }

    #[test]
    fn client_run_replays_local_checks() {
        let cfg = config(LightMode::Client);
        let ticks = cfg.ticks;
        let mut session = Session::new(cfg).unwrap();
        for _ in 0..ticks {
            session.tick().unwrap();
        }
        let report = session.finish(Duration::ZERO).unwrap();
        assert_eq!(report.result, TestResult::Pass);
        assert_eq!(report.boundary.unwrap().transfers, 0);
        assert!(report.persistence.is_none());
    }

    #[test]
    fn persisted_run_reports_saves() {
        let dir = temp_dir("persist");
        let cfg = LightingConfig {
            world_dir: Some(dir.clone()),
            ..config(LightMode::Authoritative)
        };
        let mut session = Session::new(cfg).unwrap();
        for _ in 0..6 {
            session.tick().unwrap();
        }
        let report = session.finish(Duration::ZERO).unwrap();
        let persistence = report.persistence.unwrap();
        assert!(persistence.chunks_saved > 0);
        std::fs::remove_dir_all(&dir).ok();
    }
}
