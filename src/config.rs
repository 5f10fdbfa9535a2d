use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use tracing::warn;

use seamlight_world::LightMode;

const DEFAULT_LIGHTING_PATH: &str = "config/lighting.toml";

/// Settings for a headless lighting run.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Which side of the client/server split to simulate.
    pub mode: LightMode,
    /// Whether the world has a sky light channel.
    pub has_sky_light: bool,
    pub world_seed: u64,
    /// Chunk radius kept loaded around the viewer.
    pub view_radius: i32,
    /// Resident chunk budget before the least recently used chunk is unloaded.
    pub cache_capacity: usize,
    /// Simulated ticks.
    pub ticks: u64,
    /// Ticks between viewer moves of one chunk.
    pub ticks_per_move: u64,
    /// Random block edits per tick around the viewer.
    pub edits_per_tick: usize,
    /// Region directory; chunks are not persisted when unset.
    pub world_dir: Option<PathBuf>,
    /// Metrics report destination.
    pub metrics_path: Option<PathBuf>,
    /// JSONL event log destination.
    pub events_path: Option<PathBuf>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            mode: LightMode::Authoritative,
            has_sky_light: true,
            world_seed: 0x5EA4_1167,
            view_radius: 3,
            cache_capacity: 128,
            ticks: 200,
            ticks_per_move: 20,
            edits_per_tick: 4,
            world_dir: None,
            metrics_path: None,
            events_path: None,
        }
    }
}

impl LightingConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_LIGHTING_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<LightingConfig>(&contents) {
                Ok(cfg) => cfg.sanitized(),
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    LightingConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_LIGHTING_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!(
                        "Lighting config not found at {}. Using defaults",
                        path.display()
                    );
                }
                LightingConfig::default()
            }
        }
    }

    /// Clamp values that would make a run meaningless.
    pub fn sanitized(mut self) -> Self {
        self.view_radius = self.view_radius.clamp(1, 16);
        let window = (2 * self.view_radius + 1).pow(2) as usize;
        self.cache_capacity = self.cache_capacity.max(window);
        self.ticks_per_move = self.ticks_per_move.max(1);
        self
    }
}
