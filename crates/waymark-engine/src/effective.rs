//! Resolved drawing attributes.
//!
//! Materialization fetches a category's effective property map once, then
//! overlays each entity's own properties on it. The views below read the
//! merged map with typed defaults.

use std::collections::BTreeMap;

use waymark_core::{Behavior, PropValue, Vec3};

use crate::render::DEFAULT_COLOR;

/// Property map of one entity: category chain first, own values on top.
pub type PropertyMap = BTreeMap<String, PropValue>;

/// Merge an entity's own properties over its category's effective map.
pub fn merge(category: &PropertyMap, own: PropertyMap) -> PropertyMap {
    let mut merged = category.clone();
    merged.extend(own);
    merged
}

fn real(props: &PropertyMap, name: &str) -> Option<f32> {
    props.get(name).and_then(PropValue::as_f64).map(|v| v as f32)
}

fn flag(props: &PropertyMap, name: &str) -> bool {
    props.get(name).and_then(PropValue::as_bool).unwrap_or(true)
}

fn text(props: &PropertyMap, name: &str) -> Option<String> {
    props
        .get(name)
        .and_then(PropValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn color(props: &PropertyMap) -> u32 {
    props
        .get("color")
        .and_then(PropValue::as_i64)
        .and_then(|c| u32::try_from(c).ok())
        .unwrap_or(DEFAULT_COLOR)
}

/// GUID behavior as read from a marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BehaviorCode {
    /// No behavior or code 0.
    None,
    /// A known behavior.
    Known(Behavior),
    /// A code with no meaning; never consumed.
    Unknown(i64),
}

/// Everything needed to draw and trigger one marker.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerView {
    /// World position, height offset applied.
    pub position: Vec3,
    /// Base64 GUID, when present.
    pub guid: Option<String>,
    /// Behavior code.
    pub behavior: BehaviorCode,
    /// Icon data file path.
    pub icon: Option<String>,
    /// Icon size multiplier.
    pub icon_size: f32,
    /// Opacity.
    pub alpha: f32,
    /// Packed RGBA tint.
    pub color: u32,
    /// Trigger radius, when the marker sets one.
    pub trigger_range: Option<f32>,
    /// Drawn in the world.
    pub in_game: bool,
    /// Drawn on the full map.
    pub on_map: bool,
    /// Drawn on the minimap.
    pub on_minimap: bool,
}

impl MarkerView {
    /// Read a marker from its merged property map.
    pub fn resolve(props: &PropertyMap) -> Self {
        let x = real(props, "xpos").unwrap_or(0.0);
        let y = real(props, "ypos").unwrap_or(0.0) + real(props, "heightoffset").unwrap_or(0.0);
        let z = real(props, "zpos").unwrap_or(0.0);
        let behavior = match props.get("behavior").and_then(PropValue::as_i64) {
            None | Some(0) => BehaviorCode::None,
            Some(code) => {
                Behavior::from_code(code).map_or(BehaviorCode::Unknown(code), BehaviorCode::Known)
            }
        };
        Self {
            position: Vec3::new(x, y, z),
            guid: text(props, "guid"),
            behavior,
            icon: text(props, "iconfile"),
            icon_size: real(props, "iconsize").unwrap_or(1.0),
            alpha: real(props, "alpha").unwrap_or(1.0),
            color: color(props),
            trigger_range: real(props, "triggerrange").filter(|r| r.is_finite() && *r > 0.0),
            in_game: flag(props, "ingamevisibility"),
            on_map: flag(props, "mapvisibility"),
            on_minimap: flag(props, "minimapvisibility"),
        }
    }
}

/// Everything needed to draw one trail.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailView {
    /// Texture data file path.
    pub texture: Option<String>,
    /// Width multiplier.
    pub scale: f32,
    /// Opacity.
    pub alpha: f32,
    /// Packed RGBA tint.
    pub color: u32,
    /// Drawn in the world.
    pub in_game: bool,
    /// Drawn on the map or minimap.
    pub on_map: bool,
}

impl TrailView {
    /// Read a trail from its merged property map.
    pub fn resolve(props: &PropertyMap) -> Self {
        Self {
            texture: text(props, "texture"),
            scale: real(props, "trailscale").unwrap_or(1.0),
            alpha: real(props, "alpha").unwrap_or(1.0),
            color: color(props),
            in_game: flag(props, "ingamevisibility"),
            on_map: flag(props, "mapvisibility") || flag(props, "minimapvisibility"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, PropValue)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn own_values_override_category() {
        let cat = map(&[("alpha", PropValue::Real(0.5)), ("iconsize", PropValue::Real(2.0))]);
        let merged = merge(&cat, map(&[("alpha", PropValue::Real(0.9))]));
        let view = MarkerView::resolve(&merged);
        assert!((view.alpha - 0.9).abs() < f32::EPSILON);
        assert!((view.icon_size - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn marker_defaults() {
        let view = MarkerView::resolve(&PropertyMap::new());
        assert_eq!(view.position, Vec3::ZERO);
        assert_eq!(view.behavior, BehaviorCode::None);
        assert_eq!(view.color, DEFAULT_COLOR);
        assert!(view.in_game && view.on_map && view.on_minimap);
        assert_eq!(view.trigger_range, None);
    }

    #[test]
    fn position_and_behavior() {
        let view = MarkerView::resolve(&map(&[
            ("xpos", PropValue::Real(1.0)),
            ("ypos", PropValue::Text("2".into())),
            ("zpos", PropValue::Integer(3)),
            ("heightoffset", PropValue::Real(1.5)),
            ("behavior", PropValue::Integer(42)),
            ("mapvisibility", PropValue::Integer(0)),
        ]));
        assert_eq!(view.position, Vec3::new(1.0, 3.5, 3.0));
        assert_eq!(view.behavior, BehaviorCode::Unknown(42));
        assert!(!view.on_map);

        let view = MarkerView::resolve(&map(&[("behavior", PropValue::Integer(101))]));
        assert_eq!(view.behavior, BehaviorCode::Known(Behavior::Weekly));
    }

    #[test]
    fn trail_view() {
        let view = TrailView::resolve(&map(&[
            ("texture", "p/arrow.png".into()),
            ("mapvisibility", PropValue::Integer(0)),
            ("minimapvisibility", PropValue::Integer(0)),
        ]));
        assert_eq!(view.texture.as_deref(), Some("p/arrow.png"));
        assert!(!view.on_map);
        assert!(view.in_game);
    }
}
