use serde::{Deserialize, Serialize};

/// How much reload work runs per poll.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Reload steps (categories) processed per poll.
    pub categories_per_slice: usize,
    /// Trails materialized per reload step before yielding.
    pub trails_per_slice: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            categories_per_slice: 4,
            trails_per_slice: 1,
        }
    }
}

/// Bulk import slicing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportSettings {
    /// Elements written per import step.
    pub batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self { batch_size: 256 }
    }
}

/// Proximity trigger defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerSettings {
    /// Radius used when a marker has no `triggerrange`.
    pub default_range: f32,
    /// Whether ticks consume markers automatically.
    pub enabled: bool,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            default_range: 2.0,
            enabled: true,
        }
    }
}

/// Render defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    /// Texture name used when an icon or trail texture is missing.
    pub placeholder_texture: String,
    /// Whether markers are mirrored onto the map layer.
    pub map_mirroring: bool,
    /// Sprite size when a marker has no `iconsize`.
    pub marker_size: f32,
    /// Polyline width when a trail has no `trailscale`.
    pub trail_size: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            placeholder_texture: "placeholder".to_string(),
            map_mirroring: true,
            marker_size: 80.0,
            trail_size: 40.0,
        }
    }
}

/// Fixed-window request throttle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThrottleSettings {
    /// Requests admitted per window.
    pub requests: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            requests: 5,
            window_ms: 1000,
        }
    }
}
