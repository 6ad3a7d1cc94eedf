use serde::{Deserialize, Serialize};

/// Pack locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackSettings {
    /// Directory holding imported pack databases (`<name>.db`).
    pub data_dir: String,
    /// Explicit pack database paths loaded in addition to `data_dir`.
    pub paths: Vec<String>,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.waymark/packs".to_string(),
            paths: Vec::new(),
        }
    }
}

/// User-local state database.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateSettings {
    /// Path of the overrides and activation ledger database.
    pub db_path: String,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            db_path: "~/.waymark/state.db".to_string(),
        }
    }
}

/// Log output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
