//! Markers, trails and trail coordinates.

use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use waymark_core::Vec3;

use super::PackStore;
use super::category::checked_typeid;
use crate::errors::{Result, StoreError};

/// A `markers` row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarkerRow {
    /// Row id.
    pub id: i64,
    /// Owning category.
    pub typeid: String,
    /// Map the marker lives in.
    pub mapid: u32,
}

/// A `trails` row. Coordinates are fetched separately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrailRow {
    /// Row id.
    pub id: i64,
    /// Owning category.
    pub typeid: String,
    /// Map the trail lives in.
    pub mapid: u32,
}

fn map_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, u32)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

impl PackStore {
    fn owning_category(&self, typeid: &str) -> Result<String> {
        let typeid = checked_typeid(typeid)?;
        // orphans are tolerated during bulk import and reported afterwards
        if !self.bulk && !self.category_exists(&typeid)? {
            return Err(StoreError::CategoryNotFound(typeid));
        }
        Ok(typeid)
    }

    // ── Markers ─────────────────────────────────────────────────────

    /// Insert a marker and return its id.
    pub fn new_marker(&self, typeid: &str, mapid: u32) -> Result<i64> {
        let typeid = self.owning_category(typeid)?;
        let _ = self.conn.execute(
            "INSERT INTO markers (type, mapid) VALUES (?1, ?2)",
            params![typeid, mapid],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a marker by id.
    pub fn marker(&self, id: i64) -> Result<Option<MarkerRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, type, mapid FROM markers WHERE id = ?1",
                params![id],
                map_entity,
            )
            .optional()?;
        Ok(row.map(|(id, typeid, mapid)| MarkerRow { id, typeid, mapid }))
    }

    /// Markers of exactly `typeid` in `mapid`, by id.
    pub fn markers_in_map(&self, typeid: &str, mapid: u32) -> Result<Vec<MarkerRow>> {
        let typeid = checked_typeid(typeid)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, type, mapid FROM markers WHERE type = ?1 AND mapid = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![typeid, mapid], map_entity)?
            .map(|r| r.map(|(id, typeid, mapid)| MarkerRow { id, typeid, mapid }))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete a marker and its properties. Returns whether it existed.
    pub fn delete_marker(&self, id: i64) -> Result<bool> {
        self.atomically(|conn| {
            let _ = conn.execute("DELETE FROM markerprops WHERE marker = ?1", params![id])?;
            let deleted = conn.execute("DELETE FROM markers WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }

    // ── Trails ──────────────────────────────────────────────────────

    /// Insert a trail (without coordinates) and return its id.
    pub fn new_trail(&self, typeid: &str, mapid: u32) -> Result<i64> {
        let typeid = self.owning_category(typeid)?;
        let _ = self.conn.execute(
            "INSERT INTO trails (type, mapid) VALUES (?1, ?2)",
            params![typeid, mapid],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a trail by id.
    pub fn trail(&self, id: i64) -> Result<Option<TrailRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, type, mapid FROM trails WHERE id = ?1",
                params![id],
                map_entity,
            )
            .optional()?;
        Ok(row.map(|(id, typeid, mapid)| TrailRow { id, typeid, mapid }))
    }

    /// Trails of exactly `typeid` in `mapid`, by id.
    pub fn trails_in_map(&self, typeid: &str, mapid: u32) -> Result<Vec<TrailRow>> {
        let typeid = checked_typeid(typeid)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, type, mapid FROM trails WHERE type = ?1 AND mapid = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![typeid, mapid], map_entity)?
            .map(|r| r.map(|(id, typeid, mapid)| TrailRow { id, typeid, mapid }))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace a trail's coordinates. Sentinel `(0,0,0)` points are stored
    /// as-is; splitting happens when the trail is drawn.
    pub fn set_trail_coords(&self, id: i64, coords: &[Vec3]) -> Result<()> {
        self.atomically(|conn| {
            let _ = conn.execute("DELETE FROM trailcoords WHERE trail = ?1", params![id])?;
            let mut stmt = conn.prepare_cached(
                "INSERT INTO trailcoords (seq, trail, x, y, z) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (seq, p) in (1_i64..).zip(coords) {
                let _ = stmt.execute(params![seq, id, p.x, p.y, p.z])?;
            }
            Ok(())
        })
    }

    /// A trail's coordinates in order.
    pub fn trail_coords(&self, id: i64) -> Result<Vec<Vec3>> {
        let mut stmt = self
            .conn
            .prepare("SELECT x, y, z FROM trailcoords WHERE trail = ?1 ORDER BY seq")?;
        let rows = stmt
            .query_map(params![id], |row| {
                Ok(Vec3::new(
                    row.get::<_, f64>(0)? as f32,
                    row.get::<_, f64>(1)? as f32,
                    row.get::<_, f64>(2)? as f32,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete a trail with its properties and coordinates.
    pub fn delete_trail(&self, id: i64) -> Result<bool> {
        self.atomically(|conn| {
            let _ = conn.execute("DELETE FROM trailcoords WHERE trail = ?1", params![id])?;
            let _ = conn.execute("DELETE FROM trailprops WHERE trail = ?1", params![id])?;
            let deleted = conn.execute("DELETE FROM trails WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
