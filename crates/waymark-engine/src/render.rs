//! Render-side collaborator.
//!
//! The engine never draws anything itself. It pushes tagged primitives into
//! a [`RenderSink`] and removes them again by exact [`CategoryKey`] or exact
//! [`PrimitiveTag`]. [`RenderCollections`] is the in-memory sink used by the
//! CLI and by tests; a real overlay implements the trait over its GPU-side
//! collections.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use waymark_core::{CategoryKey, PrimitiveTag, Vec3};

/// Default packed RGBA color: opaque white.
pub const DEFAULT_COLOR: u32 = 0xFFFF_FFFF;

/// Which collection a primitive lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// In-game 3D world.
    World,
    /// Map and minimap.
    Map,
}

/// A billboarded marker icon.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sprite {
    /// Owner tag.
    pub tag: PrimitiveTag,
    /// Position in the layer's coordinate space.
    pub position: Vec3,
    /// Texture cache key.
    pub texture: String,
    /// Size in layer units.
    pub size: f32,
    /// Packed `0xRRGGBBAA` tint.
    pub color: u32,
    /// Opacity multiplier.
    pub alpha: f32,
}

/// One drawn trail segment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Polyline {
    /// Owner tag.
    pub tag: PrimitiveTag,
    /// At least two points.
    pub points: Vec<Vec3>,
    /// Texture cache key.
    pub texture: String,
    /// Ribbon width.
    pub width: f32,
    /// Packed `0xRRGGBBAA` tint.
    pub color: u32,
    /// Opacity multiplier.
    pub alpha: f32,
}

/// Receiver of live primitives.
pub trait RenderSink: Send {
    /// Add a sprite.
    fn add_sprite(&mut self, layer: Layer, sprite: Sprite);

    /// Add a polyline.
    fn add_polyline(&mut self, layer: Layer, polyline: Polyline);

    /// Remove every primitive tagged with exactly `key`, on every layer.
    /// Returns the number removed.
    fn remove_category(&mut self, key: &CategoryKey) -> usize;

    /// Remove every primitive carrying `tag`, on every layer.
    fn remove_tag(&mut self, tag: &PrimitiveTag) -> usize;

    /// Drop every primitive. Textures stay cached.
    fn clear(&mut self);

    /// Whether a texture is cached under `name`.
    fn has_texture(&self, name: &str) -> bool;

    /// Decode and cache a texture. `false` when the bytes are unusable.
    fn load_texture(&mut self, name: &str, data: &[u8]) -> bool;
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct RenderCollections {
    sprites: BTreeMap<Layer, Vec<Sprite>>,
    polylines: BTreeMap<Layer, Vec<Polyline>>,
    textures: BTreeMap<String, usize>,
}

impl RenderCollections {
    /// An empty sink with `placeholder` pre-cached.
    pub fn new(placeholder: &str) -> Self {
        let mut this = Self::default();
        let _ = this.textures.insert(placeholder.to_owned(), 0);
        this
    }

    /// Sprites on `layer`, in insertion order.
    pub fn sprites(&self, layer: Layer) -> &[Sprite] {
        self.sprites.get(&layer).map(Vec::as_slice).unwrap_or_default()
    }

    /// Polylines on `layer`, in insertion order.
    pub fn polylines(&self, layer: Layer) -> &[Polyline] {
        self.polylines.get(&layer).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every `(layer, tag)` pair currently live, with multiplicity collapsed.
    pub fn tags(&self) -> BTreeSet<(Layer, PrimitiveTag)> {
        let sprites = self
            .sprites
            .iter()
            .flat_map(|(l, v)| v.iter().map(move |s| (*l, s.tag.clone())));
        let lines = self
            .polylines
            .iter()
            .flat_map(|(l, v)| v.iter().map(move |p| (*l, p.tag.clone())));
        sprites.chain(lines).collect()
    }

    /// Total number of live primitives.
    pub fn len(&self) -> usize {
        self.sprites.values().map(Vec::len).sum::<usize>()
            + self.polylines.values().map(Vec::len).sum::<usize>()
    }

    /// Whether nothing is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cached textures, the placeholder included.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn retain(&mut self, keep: impl Fn(&PrimitiveTag) -> bool) -> usize {
        let before = self.len();
        for v in self.sprites.values_mut() {
            v.retain(|s| keep(&s.tag));
        }
        for v in self.polylines.values_mut() {
            v.retain(|p| keep(&p.tag));
        }
        before - self.len()
    }
}

impl RenderSink for RenderCollections {
    fn add_sprite(&mut self, layer: Layer, sprite: Sprite) {
        self.sprites.entry(layer).or_default().push(sprite);
    }

    fn add_polyline(&mut self, layer: Layer, polyline: Polyline) {
        self.polylines.entry(layer).or_default().push(polyline);
    }

    fn remove_category(&mut self, key: &CategoryKey) -> usize {
        self.retain(|t| !t.belongs_to(key))
    }

    fn remove_tag(&mut self, tag: &PrimitiveTag) -> usize {
        self.retain(|t| t != tag)
    }

    fn clear(&mut self) {
        self.sprites.clear();
        self.polylines.clear();
    }

    fn has_texture(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    fn load_texture(&mut self, name: &str, data: &[u8]) -> bool {
        if data.is_empty() {
            return false;
        }
        let _ = self.textures.insert(name.to_owned(), data.len());
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite(tag: PrimitiveTag) -> Sprite {
        Sprite {
            tag,
            position: Vec3::ZERO,
            texture: "placeholder".into(),
            size: 80.0,
            color: DEFAULT_COLOR,
            alpha: 1.0,
        }
    }

    #[test]
    fn remove_category_is_exact() {
        let parent = CategoryKey::new("p", "a.b");
        let child = CategoryKey::new("p", "a.b.c");
        let mut sink = RenderCollections::new("placeholder");
        sink.add_sprite(Layer::World, sprite(PrimitiveTag::marker(&parent, 1)));
        sink.add_sprite(Layer::Map, sprite(PrimitiveTag::marker(&parent, 1)));
        sink.add_sprite(Layer::World, sprite(PrimitiveTag::marker(&child, 2)));

        assert_eq!(sink.remove_category(&parent), 2);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.sprites(Layer::World)[0].tag, PrimitiveTag::marker(&child, 2));
    }

    #[test]
    fn remove_tag_hits_every_layer() {
        let key = CategoryKey::new("p", "a");
        let mut sink = RenderCollections::new("placeholder");
        sink.add_sprite(Layer::World, sprite(PrimitiveTag::marker(&key, 1)));
        sink.add_sprite(Layer::Map, sprite(PrimitiveTag::marker(&key, 1)));
        sink.add_sprite(Layer::World, sprite(PrimitiveTag::marker(&key, 2)));
        assert_eq!(sink.remove_tag(&PrimitiveTag::marker(&key, 1)), 2);
        assert_eq!(sink.tags().len(), 1);
    }

    #[test]
    fn texture_cache() {
        let mut sink = RenderCollections::new("placeholder");
        assert!(sink.has_texture("placeholder"));
        assert!(!sink.load_texture("empty", &[]));
        assert!(sink.load_texture("p/icon.png", &[1, 2]));
        assert!(sink.has_texture("p/icon.png"));
        sink.clear();
        assert_eq!(sink.texture_count(), 2);
        assert!(sink.is_empty());
    }
}
