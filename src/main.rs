//! # waymark
//!
//! Command-line front end: imports marker packs into pack databases,
//! inspects them, and runs one sync pass for a given map.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use waymark_core::Vec3;
use waymark_engine::{Layer, RenderCollections, SyncConfig, SyncEngine, TelemetrySnapshot, TriggerEngine};
use waymark_import::{ImportTask, open_source};
use waymark_settings::{WaymarkSettings, expand_home, load_settings};
use waymark_store::{PackStore, StateStore};

/// Waymark marker-pack tool.
#[derive(Parser, Debug)]
#[command(name = "waymark", about = "Marker-pack importer and overlay sync engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a zip archive or directory into a pack database.
    Import {
        /// Archive or directory to import.
        source: PathBuf,
        /// Pack name (defaults to the source's file stem).
        #[arg(long)]
        name: Option<String>,
        /// Items per import step (overrides settings).
        #[arg(long)]
        batch: Option<usize>,
    },
    /// Verify a pack database and report orphans and row counts.
    Check {
        /// Pack database.
        pack: PathBuf,
    },
    /// Print a pack's category tree.
    Tree {
        /// Pack database.
        pack: PathBuf,
    },
    /// Load packs, sync for one map and print what is drawn.
    Sync {
        /// Map id to sync for.
        #[arg(long)]
        map: u32,
        /// Shard id.
        #[arg(long, default_value = "0")]
        shard: u32,
        /// Character name, for per-character behaviors.
        #[arg(long)]
        character: Option<String>,
        /// Player position as three numbers.
        #[arg(long, num_args = 3, allow_negative_numbers = true, value_names = ["X", "Y", "Z"])]
        position: Option<Vec<f32>>,
        /// Run one trigger tick after syncing.
        #[arg(long)]
        consume: bool,
        /// Pack databases (defaults to every pack in the data directory).
        packs: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings().context("Failed to load settings")?;
    waymark_core::logging::init_subscriber(&settings.logging.level);

    match cli.command {
        Command::Import { source, name, batch } => import(&settings, &source, name, batch),
        Command::Check { pack } => check(&pack),
        Command::Tree { pack } => tree(&pack),
        Command::Sync {
            map,
            shard,
            character,
            position,
            consume,
            packs,
        } => {
            let snapshot = TelemetrySnapshot {
                map_id: map,
                shard_id: shard,
                character,
                position: position.map_or(Vec3::ZERO, |p| Vec3::new(p[0], p[1], p[2])),
            };
            sync(&settings, snapshot, consume, packs)
        }
    }
}

fn pack_name(source: &Path, name: Option<String>) -> Result<String> {
    if let Some(name) = name {
        return Ok(name);
    }
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot derive a pack name from {}", source.display()))
}

fn import(
    settings: &WaymarkSettings,
    source: &Path,
    name: Option<String>,
    batch: Option<usize>,
) -> Result<()> {
    let name = pack_name(source, name)?;
    let target = expand_home(&settings.packs.data_dir).join(format!("{name}.db"));
    if target.exists() {
        bail!("Pack database already exists: {}", target.display());
    }

    let mut archive = open_source(source)
        .with_context(|| format!("Failed to open {}", source.display()))?;
    let mut pack = PackStore::open_or_create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    let task = ImportTask::new(batch.unwrap_or(settings.import.batch_size));
    let report = task.run_to_completion(archive.as_mut(), &mut pack)?;

    info!(pack = %name, path = %target.display(), "pack imported");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let pack = PackStore::open_existing(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let orphans = pack.integrity_scan()?;
    for orphan in &orphans {
        warn!(kind = ?orphan.kind, id = orphan.id, typeid = %orphan.typeid, "orphaned row");
    }
    let output = serde_json::json!({
        "pack": pack.name(),
        "stats": pack.stats()?,
        "orphans": orphans,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn tree(path: &Path) -> Result<()> {
    let pack = PackStore::open_existing(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut stack: Vec<(usize, String)> = pack
        .children(None)?
        .into_iter()
        .rev()
        .map(|row| (0, row.typeid))
        .collect();
    while let Some((depth, typeid)) = stack.pop() {
        let leaf = waymark_core::typeid::leaf(&typeid);
        println!("{:indent$}{leaf}", "", indent = depth * 2);
        stack.extend(
            pack.children(Some(&typeid))?
                .into_iter()
                .rev()
                .map(|row| (depth + 1, row.typeid)),
        );
    }
    Ok(())
}

/// Every `*.db` in the data directory plus the explicitly listed packs.
fn configured_packs(settings: &WaymarkSettings) -> Result<Vec<PathBuf>> {
    let dir = expand_home(&settings.packs.data_dir);
    let mut paths: Vec<PathBuf> = settings.packs.paths.iter().map(|p| expand_home(p)).collect();
    if dir.is_dir() {
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "db") {
                paths.push(path);
            }
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn sync(
    settings: &WaymarkSettings,
    snapshot: TelemetrySnapshot,
    consume: bool,
    packs: Vec<PathBuf>,
) -> Result<()> {
    let packs = if packs.is_empty() {
        configured_packs(settings)?
    } else {
        packs
    };
    let state = StateStore::open(&expand_home(&settings.state.db_path))?;
    let config = SyncConfig::from_settings(settings);
    let render = RenderCollections::new(&config.placeholder_texture);
    let mut engine = SyncEngine::new(state, render, config);

    for path in &packs {
        // one broken pack must not keep the others from loading
        if let Err(e) = engine.load_pack(path) {
            warn!(path = %path.display(), error = %e, "pack skipped");
        }
    }

    engine.update_telemetry(snapshot);
    while !engine.poll_reload(64)? {}

    if consume {
        for tag in TriggerEngine::tick(&mut engine, Utc::now())? {
            println!("consumed {tag}");
        }
    }

    for key in engine.materialized() {
        println!("{key}");
    }
    let render = engine.render();
    println!(
        "world: {} sprites, {} trails; map: {} sprites, {} trails",
        render.sprites(Layer::World).len(),
        render.polylines(Layer::World).len(),
        render.sprites(Layer::Map).len(),
        render.polylines(Layer::Map).len(),
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
