//! seamlight - boundary light-check bookkeeping for column voxel worlds
//!
//! Headless driver: streams chunks around a moving viewer, edits blocks near
//! chunk edges and reports what the boundary protocol did.

mod config;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use config::LightingConfig;
use seamlight_testkit::MetricsSink;
use seamlight_world::LightMode;
use session::Session;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a headless boundary lighting session", long_about = None)]
struct Args {
    /// Lighting config file (defaults to config/lighting.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u64>,
    /// World seed
    #[arg(long)]
    seed: Option<u64>,
    /// `client` or `authoritative`
    #[arg(long, value_parser = parse_mode)]
    mode: Option<LightMode>,
    /// View radius in chunks
    #[arg(long)]
    radius: Option<i32>,
    /// Region directory for persisted chunks
    #[arg(long)]
    world_dir: Option<PathBuf>,
    /// Write a metrics report here
    #[arg(long)]
    metrics: Option<PathBuf>,
    /// Write a JSONL event log here
    #[arg(long)]
    events: Option<PathBuf>,
    /// Simulate a world without sky light
    #[arg(long)]
    no_sky: bool,
}

fn parse_mode(value: &str) -> Result<LightMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "client" => Ok(LightMode::Client),
        "authoritative" | "server" => Ok(LightMode::Authoritative),
        other => Err(format!("unknown mode '{other}' (expected client or authoritative)")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting seamlight v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let file_cfg = match &args.config {
        Some(path) => LightingConfig::load_from_path(path),
        None => LightingConfig::load(),
    };
    let cfg = apply_overrides(file_cfg, &args);
    info!(
        mode = ?cfg.mode,
        seed = cfg.world_seed,
        radius = cfg.view_radius,
        ticks = cfg.ticks,
        "session configured"
    );

    let started = Instant::now();
    let mut session = Session::new(cfg.clone())?;
    for _ in 0..cfg.ticks {
        session.tick()?;
    }
    info!(
        viewer = %session.viewer(),
        resident = session.grid().len(),
        "walk complete"
    );
    let report = session.finish(started.elapsed())?;

    if let Some(path) = &cfg.metrics_path {
        MetricsSink::create(path)
            .and_then(|sink| sink.write(&report))
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "metrics written");
    }

    if let Some(boundary) = &report.boundary {
        info!(
            result = ?report.result,
            loaded = boundary.chunks_loaded,
            unloaded = boundary.chunks_unloaded,
            transfers = boundary.transfers,
            area_rechecks = boundary.area_rechecks,
            column_rechecks = boundary.column_rechecks,
            populated = boundary.chunks_populated,
            "run summary"
        );
    }
    Ok(())
}

fn apply_overrides(mut cfg: LightingConfig, args: &Args) -> LightingConfig {
    if let Some(ticks) = args.ticks {
        cfg.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        cfg.world_seed = seed;
    }
    if let Some(mode) = args.mode {
        cfg.mode = mode;
    }
    if let Some(radius) = args.radius {
        cfg.view_radius = radius;
    }
    if args.world_dir.is_some() {
        cfg.world_dir = args.world_dir.clone();
    }
    if args.metrics.is_some() {
        cfg.metrics_path = args.metrics.clone();
    }
    if args.events.is_some() {
        cfg.events_path = args.events.clone();
    }
    if args.no_sky {
        cfg.has_sky_light = false;
    }
    cfg.sanitized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_parse() {
        assert_eq!(parse_mode("client"), Ok(LightMode::Client));
        assert_eq!(parse_mode("Server"), Ok(LightMode::Authoritative));
        assert!(parse_mode("both").is_err());
    }

    #[test]
    fn cli_overrides_file_values() {
        let args = Args::parse_from([
            "seamlight",
            "--ticks",
            "5",
            "--mode",
            "client",
            "--radius",
            "2",
            "--no-sky",
        ]);
        let cfg = apply_overrides(LightingConfig::default(), &args);
        assert_eq!(cfg.ticks, 5);
        assert_eq!(cfg.mode, LightMode::Client);
        assert_eq!(cfg.view_radius, 2);
        assert!(!cfg.has_sky_light);
        assert!(cfg.cache_capacity >= 25);
    }
}
