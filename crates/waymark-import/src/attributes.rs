//! Attribute conversion table.
//!
//! Pack XML attributes are untyped strings. Each known attribute name maps
//! to a converter that turns the raw text into a typed [`PropValue`]; names
//! not in the table pass through as text. Lookup is case-insensitive.

use waymark_core::PropValue;
use waymark_store::normalize_path;

/// How an attribute's raw text is converted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrKind {
    /// Signed integer.
    Integer,
    /// Floating point.
    Float,
    /// Hex color packed as `0xRRGGBBAA`.
    Color,
    /// Pack-relative file path, normalized.
    Path,
    /// Stored verbatim.
    Text,
}

/// Converter for an attribute name (already lower-cased).
pub fn kind_of(name: &str) -> AttrKind {
    match name {
        "mapid" | "behavior" | "resetlength" | "resetoffset" | "achievementid"
        | "achievementbit" | "minsize" | "maxsize" | "ingamevisibility" | "mapvisibility"
        | "minimapvisibility" | "defaulttoggle" | "autotrigger" | "hascountdown"
        | "isseparator" | "ishidden" | "invertbehavior" | "festival" => AttrKind::Integer,
        "xpos" | "ypos" | "zpos" | "heightoffset" | "iconsize" | "alpha" | "fadenear"
        | "fadefar" | "triggerrange" | "trailscale" | "animspeed" | "mapdisplaysize"
        | "rotate-x" | "rotate-y" | "rotate-z" => AttrKind::Float,
        "color" => AttrKind::Color,
        "iconfile" | "texture" | "traildata" => AttrKind::Path,
        _ => AttrKind::Text,
    }
}

/// Whether the attribute references a file that must be copied into the pack.
pub fn is_data_file(name: &str) -> bool {
    matches!(name, "iconfile" | "texture")
}

/// Parse a hex color. `RRGGBB` gets alpha `FF`; `AARRGGBB` is repacked to
/// `RRGGBBAA`. A leading `#` is optional.
pub fn parse_color(raw: &str) -> Option<u32> {
    let hex = raw.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let v = u32::from_str_radix(hex, 16).ok()?;
    match hex.len() {
        6 => Some((v << 8) | 0xFF),
        8 => Some(v.rotate_left(8)),
        _ => None,
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Convert one attribute. `None` means the value is unparseable for its
/// converter and the property should be omitted.
pub fn convert(name: &str, raw: &str) -> Option<PropValue> {
    match kind_of(name) {
        AttrKind::Integer => parse_integer(raw).map(PropValue::Integer),
        AttrKind::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(PropValue::Real),
        AttrKind::Color => parse_color(raw).map(|c| PropValue::Integer(i64::from(c))),
        AttrKind::Path => {
            let p = normalize_path(raw);
            (!p.is_empty()).then_some(PropValue::Text(p))
        }
        AttrKind::Text => Some(PropValue::Text(raw.to_owned())),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
