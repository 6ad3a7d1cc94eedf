//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WaymarkSettings::default()`]
//! 2. If `~/.waymark/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `WAYMARK_*` environment variable overrides (highest priority)
//! 4. [`WaymarkSettings::validate`] clamps anything left out of range
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::WaymarkSettings;

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Resolve the path to the settings file (`~/.waymark/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join(".waymark").join("settings.json")
}

/// Expand a leading `~/` against `HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WaymarkSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<WaymarkSettings> {
    let defaults = serde_json::to_value(WaymarkSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: WaymarkSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    let _ = settings.validate();
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored (the file/default value stays).
pub fn apply_env_overrides(settings: &mut WaymarkSettings) {
    // ── Packs and state ─────────────────────────────────────────────
    if let Some(v) = read_env_string("WAYMARK_DATA_DIR") {
        settings.packs.data_dir = v;
    }
    if let Some(v) = read_env_string("WAYMARK_PACKS") {
        settings.packs.paths = parse_list(&v);
    }
    if let Some(v) = read_env_string("WAYMARK_STATE_DB") {
        settings.state.db_path = v;
    }
    if let Some(v) = read_env_string("WAYMARK_LOG_LEVEL") {
        settings.logging.level = v;
    }

    // ── Sync and import ─────────────────────────────────────────────
    if let Some(v) = read_env_usize("WAYMARK_CATEGORIES_PER_SLICE", 1, 10_000) {
        settings.sync.categories_per_slice = v;
    }
    if let Some(v) = read_env_usize("WAYMARK_TRAILS_PER_SLICE", 1, 10_000) {
        settings.sync.trails_per_slice = v;
    }
    if let Some(v) = read_env_usize("WAYMARK_IMPORT_BATCH", 1, 1_000_000) {
        settings.import.batch_size = v;
    }

    // ── Trigger ─────────────────────────────────────────────────────
    if let Some(v) = read_env_f32("WAYMARK_TRIGGER_RANGE", 0.01, 10_000.0) {
        settings.trigger.default_range = v;
    }
    if let Some(v) = read_env_bool("WAYMARK_TRIGGER_ENABLED") {
        settings.trigger.enabled = v;
    }

    // ── Throttle ────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("WAYMARK_THROTTLE_REQUESTS", 1, 10_000) {
        settings.throttle.requests = u32::try_from(v).unwrap_or(u32::MAX);
    }
    if let Some(v) = read_env_u64("WAYMARK_THROTTLE_WINDOW_MS", 1, 3_600_000) {
        settings.throttle.window_ms = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a finite `f32` within a range.
pub fn parse_f32_range(val: &str, min: f32, max: f32) -> Option<f32> {
    let n: f32 = val.parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

/// Split a comma-separated list, dropping blank entries.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Read and parse `name`. A set but unparseable value is logged and ignored.
fn read_env<T>(name: &str, expected: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let val = std::env::var(name).ok()?;
    let parsed = parse(&val);
    if parsed.is_none() {
        tracing::warn!(key = name, value = %val, expected, "invalid env var, ignoring");
    }
    parsed
}

fn read_env_bool(name: &str) -> Option<bool> {
    read_env(name, "boolean", parse_bool)
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    read_env(name, "integer", |v| parse_u64_range(v, min, max))
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    read_env(name, "integer", |v| parse_usize_range(v, min, max))
}

fn read_env_f32(name: &str, min: f32, max: f32) -> Option<f32> {
    read_env(name, "number", |v| parse_f32_range(v, min, max))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
