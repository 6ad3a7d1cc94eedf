//! # waymark-settings
//!
//! Layered configuration for the Waymark engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`WaymarkSettings::default()`]
//! 2. **User file**: `~/.waymark/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `WAYMARK_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, expand_home, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
