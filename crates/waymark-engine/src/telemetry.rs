//! Live game state as seen by the engine.

use serde::{Deserialize, Serialize};
use waymark_core::Vec3;

/// One reading of the game's state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Current map.
    pub map_id: u32,
    /// Server shard of the current map instance.
    pub shard_id: u32,
    /// Active character, when known.
    pub character: Option<String>,
    /// Player position in world coordinates.
    pub position: Vec3,
}

impl TelemetrySnapshot {
    /// A snapshot on `map_id` at the origin, shard 0, no character.
    pub fn on_map(map_id: u32) -> Self {
        Self {
            map_id,
            ..Self::default()
        }
    }

    /// Whether `other` is a different map instance.
    pub fn instance_differs(&self, other: &Self) -> bool {
        self.map_id != other.map_id || self.shard_id != other.shard_id
    }
}

/// Provider of telemetry readings.
pub trait TelemetrySource: Send {
    /// Current reading.
    fn snapshot(&self) -> TelemetrySnapshot;
}

/// A fixed, settable reading.
#[derive(Clone, Debug, Default)]
pub struct StaticTelemetry {
    current: TelemetrySnapshot,
}

impl StaticTelemetry {
    /// Wrap a snapshot.
    pub fn new(snapshot: TelemetrySnapshot) -> Self {
        Self { current: snapshot }
    }

    /// Move the player.
    pub fn set_position(&mut self, position: Vec3) {
        self.current.position = position;
    }

    /// Change map instance.
    pub fn set_map(&mut self, map_id: u32, shard_id: u32) {
        self.current.map_id = map_id;
        self.current.shard_id = shard_id;
    }

    /// Switch character.
    pub fn set_character(&mut self, name: Option<&str>) {
        self.current.character = name.map(str::to_owned);
    }
}

impl TelemetrySource for StaticTelemetry {
    fn snapshot(&self) -> TelemetrySnapshot {
        self.current.clone()
    }
}
