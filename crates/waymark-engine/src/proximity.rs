//! Flat proximity lists for hover lookups.

use waymark_core::{CategoryKey, PrimitiveTag, Vec3};

use crate::render::Layer;

/// Positions of live markers on one layer.
///
/// World lookups use full 3D distance; map lookups use the horizontal
/// plane only.
#[derive(Clone, Debug)]
pub struct ProximityIndex {
    layer: Layer,
    entries: Vec<(PrimitiveTag, Vec3)>,
}

impl ProximityIndex {
    /// An empty index for `layer`.
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            entries: Vec::new(),
        }
    }

    /// Index a marker.
    pub fn insert(&mut self, tag: PrimitiveTag, position: Vec3) {
        self.entries.push((tag, position));
    }

    /// Drop every entry of exactly `key`.
    pub fn remove_category(&mut self, key: &CategoryKey) {
        self.entries.retain(|(t, _)| !t.belongs_to(key));
    }

    /// Drop every entry with `tag`.
    pub fn remove_tag(&mut self, tag: &PrimitiveTag) {
        self.entries.retain(|(t, _)| t != tag);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tags within `radius` of `point`, nearest first.
    pub fn within(&self, point: Vec3, radius: f32) -> Vec<PrimitiveTag> {
        let r2 = radius * radius;
        let mut hits: Vec<(f32, &PrimitiveTag)> = self
            .entries
            .iter()
            .filter_map(|(tag, pos)| {
                let d2 = match self.layer {
                    Layer::World => pos.distance_squared(&point),
                    Layer::Map => pos.planar_distance_squared(&point),
                };
                (d2 <= r2).then_some((d2, tag))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        hits.into_iter().map(|(_, t)| t.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_first_within_radius() {
        let key = CategoryKey::new("p", "a");
        let mut idx = ProximityIndex::new(Layer::World);
        idx.insert(PrimitiveTag::marker(&key, 1), Vec3::new(3.0, 0.0, 0.0));
        idx.insert(PrimitiveTag::marker(&key, 2), Vec3::new(1.0, 0.0, 0.0));
        idx.insert(PrimitiveTag::marker(&key, 3), Vec3::new(10.0, 0.0, 0.0));

        let hits = idx.within(Vec3::ZERO, 5.0);
        assert_eq!(hits, vec![PrimitiveTag::marker(&key, 2), PrimitiveTag::marker(&key, 1)]);

        idx.remove_tag(&PrimitiveTag::marker(&key, 2));
        assert_eq!(idx.len(), 2);
        idx.remove_category(&key);
        assert!(idx.is_empty());
    }

    #[test]
    fn map_layer_ignores_height() {
        let key = CategoryKey::new("p", "a");
        let mut idx = ProximityIndex::new(Layer::Map);
        idx.insert(PrimitiveTag::marker(&key, 1), Vec3::new(1.0, 500.0, 1.0));
        assert_eq!(idx.within(Vec3::ZERO, 2.0).len(), 1);
    }
}
