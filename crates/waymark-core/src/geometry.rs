//! World-space coordinates.

use serde::{Deserialize, Serialize};

/// A point in game units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// East/west axis.
    pub x: f32,
    /// Vertical axis.
    pub y: f32,
    /// North/south axis.
    pub z: f32,
}

impl Vec3 {
    /// The origin, also the trail segment-break sentinel.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Build a point from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared euclidean distance to `other`.
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Squared distance on the horizontal (x/z) plane, used for map-space lookups.
    pub fn planar_distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    /// Whether this point is the `(0,0,0)` segment-break sentinel.
    #[allow(clippy::float_cmp)]
    pub fn is_sentinel(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_squared_is_symmetric() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 6.0, 3.0);
        assert!((a.distance_squared(&b) - 25.0).abs() < f32::EPSILON);
        assert!((b.distance_squared(&a) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn planar_distance_ignores_height() {
        let a = Vec3::new(0.0, 100.0, 0.0);
        let b = Vec3::new(3.0, -50.0, 4.0);
        assert!((a.planar_distance_squared(&b) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sentinel_detection() {
        assert!(Vec3::ZERO.is_sentinel());
        assert!(Vec3::new(-0.0, 0.0, 0.0).is_sentinel());
        assert!(!Vec3::new(0.0, 0.0, 1.0).is_sentinel());
    }
}
