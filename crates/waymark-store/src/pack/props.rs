//! Typed property access and inherited (effective) property resolution.
//!
//! Every entity has a key-value property table. Names are case-insensitive
//! and stored lower-cased. A marker or trail that lacks a property inherits
//! it from its category, which in turn inherits from its ancestors; the
//! nearest non-null value wins.

use std::collections::BTreeMap;

use rusqlite::{OptionalExtension, params};
use waymark_core::PropValue;

use super::PackStore;
use crate::errors::Result;

/// The entity a property belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropOwner<'a> {
    /// A category, by type id.
    Category(&'a str),
    /// A marker, by id.
    Marker(i64),
    /// A trail, by id.
    Trail(i64),
}

impl PropOwner<'_> {
    fn table(self) -> (&'static str, &'static str) {
        match self {
            Self::Category(_) => ("categoryprops", "category"),
            Self::Marker(_) => ("markerprops", "marker"),
            Self::Trail(_) => ("trailprops", "trail"),
        }
    }

    fn key(self) -> OwnerKey {
        match self {
            Self::Category(t) => OwnerKey::Text(t.to_lowercase()),
            Self::Marker(id) | Self::Trail(id) => OwnerKey::Id(id),
        }
    }
}

enum OwnerKey {
    Text(String),
    Id(i64),
}

impl rusqlite::ToSql for OwnerKey {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        match self {
            Self::Text(s) => s.to_sql(),
            Self::Id(id) => id.to_sql(),
        }
    }
}

/// Ancestor chain of `?1` with each level's own value of property `?2`,
/// nearest first.
const CHAIN_PROPERTY_SQL: &str = "
    WITH RECURSIVE chain(typeid, parent, lvl) AS (
      SELECT typeid, parent, 0 FROM categories WHERE typeid = ?1
      UNION ALL
      SELECT c.typeid, c.parent, ch.lvl + 1
      FROM categories c JOIN chain ch ON c.typeid = ch.parent
      WHERE ch.lvl < 10000
    )
    SELECT p.value FROM chain ch
    JOIN categoryprops p ON p.category = ch.typeid AND p.property = ?2
    WHERE p.value IS NOT NULL
    ORDER BY ch.lvl
    LIMIT 1";

/// Every property along the ancestor chain of `?1`, root first.
const CHAIN_ALL_SQL: &str = "
    WITH RECURSIVE chain(typeid, parent, lvl) AS (
      SELECT typeid, parent, 0 FROM categories WHERE typeid = ?1
      UNION ALL
      SELECT c.typeid, c.parent, ch.lvl + 1
      FROM categories c JOIN chain ch ON c.typeid = ch.parent
      WHERE ch.lvl < 10000
    )
    SELECT p.property, p.value FROM chain ch
    JOIN categoryprops p ON p.category = ch.typeid
    WHERE p.value IS NOT NULL
    ORDER BY ch.lvl DESC";

impl PackStore {
    /// An entity's own value of `name`.
    pub fn property(&self, owner: PropOwner<'_>, name: &str) -> Result<Option<PropValue>> {
        let (table, col) = owner.table();
        let value: Option<Option<PropValue>> = self
            .conn
            .query_row(
                &format!("SELECT value FROM {table} WHERE {col} = ?1 AND property = ?2"),
                params![owner.key(), name.to_lowercase()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// Set (`Some`) or delete (`None`) an entity's own value of `name`.
    pub fn set_property(
        &self,
        owner: PropOwner<'_>,
        name: &str,
        value: Option<&PropValue>,
    ) -> Result<()> {
        let (table, col) = owner.table();
        let name = name.to_lowercase();
        match value {
            Some(v) => {
                let _ = self.conn.execute(
                    &format!(
                        "INSERT INTO {table} ({col}, property, value) VALUES (?1, ?2, ?3)
                         ON CONFLICT({col}, property) DO UPDATE SET value = excluded.value"
                    ),
                    params![owner.key(), name, v],
                )?;
            }
            None => {
                let _ = self.conn.execute(
                    &format!("DELETE FROM {table} WHERE {col} = ?1 AND property = ?2"),
                    params![owner.key(), name],
                )?;
            }
        }
        Ok(())
    }

    /// All of an entity's own properties, by name.
    pub fn properties(&self, owner: PropOwner<'_>) -> Result<BTreeMap<String, PropValue>> {
        let (table, col) = owner.table();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT property, value FROM {table} WHERE {col} = ?1 AND value IS NOT NULL"
        ))?;
        let rows = stmt
            .query_map(params![owner.key()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
        Ok(rows)
    }

    /// Nearest non-null value of `name` from the category toward the root.
    pub fn category_property(&self, typeid: &str, name: &str) -> Result<Option<PropValue>> {
        let value = self
            .conn
            .query_row(
                CHAIN_PROPERTY_SQL,
                params![typeid.to_lowercase(), name.to_lowercase()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// A marker's own value of `name`, else its category chain's.
    pub fn marker_property(&self, id: i64, name: &str) -> Result<Option<PropValue>> {
        if let Some(v) = self.property(PropOwner::Marker(id), name)? {
            return Ok(Some(v));
        }
        match self.marker(id)? {
            Some(m) => self.category_property(&m.typeid, name),
            None => Ok(None),
        }
    }

    /// A trail's own value of `name`, else its category chain's.
    pub fn trail_property(&self, id: i64, name: &str) -> Result<Option<PropValue>> {
        if let Some(v) = self.property(PropOwner::Trail(id), name)? {
            return Ok(Some(v));
        }
        match self.trail(id)? {
            Some(t) => self.category_property(&t.typeid, name),
            None => Ok(None),
        }
    }

    /// The full effective property map of a category: every property along
    /// its chain, nearer levels overriding farther ones.
    pub fn effective_category_properties(
        &self,
        typeid: &str,
    ) -> Result<BTreeMap<String, PropValue>> {
        let mut stmt = self.conn.prepare(CHAIN_ALL_SQL)?;
        let rows = stmt
            .query_map(params![typeid.to_lowercase()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, PropValue>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        // root first, so later inserts are nearer and win
        Ok(rows.into_iter().collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;

    fn pack() -> PackStore {
        let pack = PackStore::in_memory("test").unwrap();
        pack.category("a.b.c", true).unwrap();
        pack
    }

    #[test]
    fn set_get_delete_own_property() {
        let pack = pack();
        let owner = PropOwner::Category("a.b");
        pack.set_property(owner, "IconFile", Some(&"x.png".into())).unwrap();
        assert_eq!(pack.property(owner, "iconfile").unwrap(), Some("x.png".into()));

        pack.set_property(owner, "iconfile", Some(&PropValue::Integer(3))).unwrap();
        assert_eq!(pack.property(owner, "ICONFILE").unwrap(), Some(PropValue::Integer(3)));

        pack.set_property(owner, "iconfile", None).unwrap();
        assert_eq!(pack.property(owner, "iconfile").unwrap(), None);
    }

    #[test]
    fn properties_lists_own_values() {
        let pack = pack();
        let m = pack.new_marker("a.b.c", 1).unwrap();
        pack.set_property(PropOwner::Marker(m), "guid", Some(&"abc".into())).unwrap();
        pack.set_property(PropOwner::Marker(m), "behavior", Some(&PropValue::Integer(3))).unwrap();
        let props = pack.properties(PropOwner::Marker(m)).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["behavior"], PropValue::Integer(3));
    }

    #[test]
    fn category_property_takes_nearest() {
        let pack = pack();
        pack.set_property(PropOwner::Category("a"), "alpha", Some(&PropValue::Real(0.5))).unwrap();
        pack.set_property(PropOwner::Category("a.b"), "alpha", Some(&PropValue::Real(0.8))).unwrap();
        pack.set_property(PropOwner::Category("a"), "color", Some(&"red".into())).unwrap();

        assert_eq!(pack.category_property("a.b.c", "alpha").unwrap(), Some(PropValue::Real(0.8)));
        assert_eq!(pack.category_property("a.b.c", "color").unwrap(), Some("red".into()));
        assert_eq!(pack.category_property("a", "alpha").unwrap(), Some(PropValue::Real(0.5)));
        assert_eq!(pack.category_property("a.b.c", "missing").unwrap(), None);
        assert_eq!(pack.category_property("nope", "alpha").unwrap(), None);
    }

    #[test]
    fn entity_property_falls_back_to_chain() {
        let pack = pack();
        let m = pack.new_marker("a.b.c", 1).unwrap();
        let t = pack.new_trail("a.b.c", 1).unwrap();
        pack.set_property(PropOwner::Category("a"), "iconsize", Some(&PropValue::Real(2.0))).unwrap();
        pack.set_property(PropOwner::Marker(m), "iconsize", Some(&PropValue::Real(3.0))).unwrap();

        assert_eq!(pack.marker_property(m, "iconsize").unwrap(), Some(PropValue::Real(3.0)));
        assert_eq!(pack.trail_property(t, "iconsize").unwrap(), Some(PropValue::Real(2.0)));
        assert_eq!(pack.marker_property(9999, "iconsize").unwrap(), None);
    }

    #[test]
    fn effective_category_properties_merge_nearest_wins() {
        let pack = pack();
        pack.set_property(PropOwner::Category("a"), "x", Some(&PropValue::Integer(1))).unwrap();
        pack.set_property(PropOwner::Category("a"), "y", Some(&PropValue::Integer(1))).unwrap();
        pack.set_property(PropOwner::Category("a.b.c"), "x", Some(&PropValue::Integer(3))).unwrap();

        let props = pack.effective_category_properties("a.b.c").unwrap();
        assert_eq!(props["x"], PropValue::Integer(3));
        assert_eq!(props["y"], PropValue::Integer(1));
    }
}
