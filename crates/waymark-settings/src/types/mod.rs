//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial JSON
//! files are accepted and missing fields keep their compiled default.

mod packs;
mod runtime;

pub use packs::*;
pub use runtime::*;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Root settings type.
///
/// ```json
/// {
///   "packs": { "paths": ["~/packs/tekkit.taco"] },
///   "trigger": { "defaultRange": 3.5 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaymarkSettings {
    /// Which packs to load and where imported packs live.
    pub packs: PackSettings,
    /// User-local state database (overrides and activation ledger).
    pub state: StateSettings,
    /// Reload slicing.
    pub sync: SyncSettings,
    /// Bulk import slicing.
    pub import: ImportSettings,
    /// Proximity trigger defaults.
    pub trigger: TriggerSettings,
    /// Render defaults.
    pub render: RenderSettings,
    /// Log level.
    pub logging: LoggingSettings,
    /// Outbound request throttle.
    pub throttle: ThrottleSettings,
}

impl WaymarkSettings {
    /// Clamp out-of-range values back into their valid range.
    ///
    /// Every adjustment is logged at warn level. Returns the number of values
    /// that were changed.
    pub fn validate(&mut self) -> usize {
        let mut fixed = 0;

        fixed += clamp_min("sync.categoriesPerSlice", &mut self.sync.categories_per_slice, 1);
        fixed += clamp_min("sync.trailsPerSlice", &mut self.sync.trails_per_slice, 1);
        fixed += clamp_min("import.batchSize", &mut self.import.batch_size, 1);
        fixed += clamp_min("throttle.requests", &mut self.throttle.requests, 1);
        fixed += clamp_min("throttle.windowMs", &mut self.throttle.window_ms, 1);

        let range = self.trigger.default_range;
        if !range.is_finite() || range <= 0.0 {
            let fallback = TriggerSettings::default().default_range;
            warn!(key = "trigger.defaultRange", value = range, fallback, "out of range, using default");
            self.trigger.default_range = fallback;
            fixed += 1;
        }

        for (key, size) in [
            ("render.markerSize", &mut self.render.marker_size),
            ("render.trailSize", &mut self.render.trail_size),
        ] {
            if !size.is_finite() || *size <= 0.0 {
                warn!(key, value = *size, "non-positive size, using 1.0");
                *size = 1.0;
                fixed += 1;
            }
        }

        fixed
    }
}

fn clamp_min<T>(key: &str, value: &mut T, min: T) -> usize
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if *value < min {
        warn!(key, value = %value, min = %min, "below minimum, clamping");
        *value = min;
        1
    } else {
        0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
