//! Binary trail files.
//!
//! Layout, all little-endian: `u32 version` (must be 0), `u32 map id`, then
//! `f32 x, y, z` triples until the end of the buffer.

use waymark_core::Vec3;

use crate::errors::TrailDataError;

const HEADER_LEN: usize = 8;
const POINT_LEN: usize = 12;

/// A decoded trail file.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailData {
    /// Map the trail belongs to.
    pub mapid: u32,
    /// Points in file order, segment-break sentinels included.
    pub points: Vec<Vec3>,
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Decode a trail file.
pub fn decode_trail(bytes: &[u8]) -> Result<TrailData, TrailDataError> {
    if bytes.len() < HEADER_LEN {
        return Err(TrailDataError::TooShort { len: bytes.len() });
    }
    let version = le_u32(&bytes[0..4]);
    if version != 0 {
        return Err(TrailDataError::UnsupportedVersion(version));
    }
    let mapid = le_u32(&bytes[4..8]);

    let body = &bytes[HEADER_LEN..];
    let trailing = body.len() % POINT_LEN;
    if trailing != 0 {
        return Err(TrailDataError::PartialTriple { trailing });
    }

    let points = body
        .chunks_exact(POINT_LEN)
        .map(|c| Vec3::new(le_f32(&c[0..4]), le_f32(&c[4..8]), le_f32(&c[8..12])))
        .collect();

    Ok(TrailData { mapid, points })
}

/// Encode a trail file. Used to build packs programmatically.
pub fn encode_trail(mapid: u32, points: &[Vec3]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + points.len() * POINT_LEN);
    out.extend_from_slice(&0_u32.to_le_bytes());
    out.extend_from_slice(&mapid.to_le_bytes());
    for p in points {
        out.extend_from_slice(&p.x.to_le_bytes());
        out.extend_from_slice(&p.y.to_le_bytes());
        out.extend_from_slice(&p.z.to_le_bytes());
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_header_and_points() {
        let pts = [Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::new(-4.5, 0.25, 9.0)];
        let data = decode_trail(&encode_trail(15, &pts)).unwrap();
        assert_eq!(data.mapid, 15);
        assert_eq!(data.points, pts.to_vec());
    }

    #[test]
    fn header_only_is_empty_trail() {
        let data = decode_trail(&encode_trail(50, &[])).unwrap();
        assert_eq!(data.mapid, 50);
        assert!(data.points.is_empty());
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(decode_trail(&[0, 0, 0]), Err(TrailDataError::TooShort { len: 3 }));
    }

    #[test]
    fn rejects_nonzero_version() {
        let mut bytes = encode_trail(1, &[]);
        bytes[0] = 2;
        assert_eq!(decode_trail(&bytes), Err(TrailDataError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_partial_triple() {
        let mut bytes = encode_trail(1, &[Vec3::new(1.0, 1.0, 1.0)]);
        bytes.extend_from_slice(&[0; 8]);
        assert_eq!(decode_trail(&bytes), Err(TrailDataError::PartialTriple { trailing: 8 }));
    }
}
