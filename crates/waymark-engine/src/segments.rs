//! Trail segment splitting.

use waymark_core::Vec3;

/// Split trail coordinates at `(0,0,0)` sentinels.
///
/// Sentinels are dropped and segments shorter than two points are
/// discarded, so every returned segment is drawable.
pub fn split_segments(points: &[Vec3]) -> Vec<Vec<Vec3>> {
    points
        .split(Vec3::is_sentinel)
        .filter(|seg| seg.len() >= 2)
        .map(<[Vec3]>::to_vec)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
