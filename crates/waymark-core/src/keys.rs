//! Tags attached to live render primitives.
//!
//! Every primitive pushed to the renderer carries a [`PrimitiveTag`]
//! `{pack, typeid, id}`. Removal is by exact [`CategoryKey`] match (all
//! primitives of one category of one pack) or by exact tag (one marker).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One category of one loaded pack.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryKey {
    /// Pack name (the name the pack was loaded under).
    pub pack: String,
    /// Category type id.
    pub typeid: String,
}

impl CategoryKey {
    /// Build a key.
    pub fn new(pack: impl Into<String>, typeid: impl Into<String>) -> Self {
        Self {
            pack: pack.into(),
            typeid: typeid.into(),
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pack, self.typeid)
    }
}

/// Row id of the entity a primitive was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntryId {
    /// A `markers.id`.
    Marker(i64),
    /// A `trails.id`.
    Trail(i64),
}

/// Full tag of a render primitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimitiveTag {
    /// Pack name.
    pub pack: String,
    /// Category type id.
    pub typeid: String,
    /// Source entity.
    pub entry: EntryId,
}

impl PrimitiveTag {
    /// Tag for a marker of `key`.
    pub fn marker(key: &CategoryKey, id: i64) -> Self {
        Self {
            pack: key.pack.clone(),
            typeid: key.typeid.clone(),
            entry: EntryId::Marker(id),
        }
    }

    /// Tag for a trail of `key`.
    pub fn trail(key: &CategoryKey, id: i64) -> Self {
        Self {
            pack: key.pack.clone(),
            typeid: key.typeid.clone(),
            entry: EntryId::Trail(id),
        }
    }

    /// Exact category match. `a.b` does not match a tag of `a.b.c`.
    pub fn belongs_to(&self, key: &CategoryKey) -> bool {
        self.pack == key.pack && self.typeid == key.typeid
    }

    /// The category half of this tag.
    pub fn category(&self) -> CategoryKey {
        CategoryKey::new(self.pack.clone(), self.typeid.clone())
    }
}

impl fmt::Display for PrimitiveTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            EntryId::Marker(id) => write!(f, "{}:{}#m{id}", self.pack, self.typeid),
            EntryId::Trail(id) => write!(f, "{}:{}#t{id}", self.pack, self.typeid),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
