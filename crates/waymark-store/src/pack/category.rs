//! Category rows: lookup, lazy creation along the dotted path, tree walks.

use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, instrument};
use waymark_core::typeid;

use super::PackStore;
use crate::errors::{Result, StoreError};

/// A `categories` row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    /// Full dotted type id.
    pub typeid: String,
    /// Parent type id, `None` for roots.
    pub parent: Option<String>,
    /// Legacy column. Visibility is resolved from overrides and `defaulttoggle`.
    pub active: bool,
    /// Sibling order, starting at 1.
    pub seq: i64,
}

impl CategoryRow {
    /// Last segment of the type id.
    pub fn leaf(&self) -> &str {
        typeid::leaf(&self.typeid)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            typeid: row.get(0)?,
            parent: row.get(1)?,
            active: row.get::<_, i64>(2)? != 0,
            seq: row.get(3)?,
        })
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `LIKE` pattern matching every strict descendant of `typeid`.
pub(crate) fn descendant_pattern(typeid: &str) -> String {
    format!("{}.%", escape_like(typeid))
}

pub(crate) fn checked_typeid(raw: &str) -> Result<String> {
    typeid::normalize(raw).ok_or_else(|| StoreError::InvalidTypeId(raw.to_owned()))
}

impl PackStore {
    /// Look up a category, optionally creating it.
    ///
    /// Creation derives `parent` from the type id, creates missing ancestors
    /// first and appends the new row after its existing siblings.
    pub fn category(&self, typeid: &str, create: bool) -> Result<Option<CategoryRow>> {
        let typeid = checked_typeid(typeid)?;
        if let Some(row) = self.find_category(&typeid)? {
            return Ok(Some(row));
        }
        if !create {
            return Ok(None);
        }
        self.create_category(&typeid).map(Some)
    }

    fn find_category(&self, typeid: &str) -> Result<Option<CategoryRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT typeid, parent, active, seq FROM categories WHERE typeid = ?1",
                params![typeid],
                CategoryRow::map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub(crate) fn category_exists(&self, typeid: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE typeid = ?1)",
            params![typeid],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn create_category(&self, typeid: &str) -> Result<CategoryRow> {
        let parent = typeid::parent(typeid).map(str::to_owned);
        if let Some(p) = &parent {
            if self.find_category(p)?.is_none() {
                let _ = self.create_category(p)?;
            }
        }

        let seq: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM categories WHERE parent IS ?1",
            params![parent],
            |row| row.get(0),
        )?;

        let _ = self.conn.execute(
            "INSERT INTO categories (typeid, parent, active, seq) VALUES (?1, ?2, 1, ?3)",
            params![typeid, parent, seq],
        )?;
        debug!(pack = %self.name, typeid, seq, "category created");

        Ok(CategoryRow {
            typeid: typeid.to_owned(),
            parent,
            active: true,
            seq,
        })
    }

    /// Direct children of `parent` (roots when `None`), in sibling order.
    pub fn children(&self, parent: Option<&str>) -> Result<Vec<CategoryRow>> {
        let parent = parent.map(str::to_lowercase);
        let mut stmt = self.conn.prepare(
            "SELECT typeid, parent, active, seq FROM categories
             WHERE parent IS ?1 ORDER BY seq, typeid",
        )?;
        let rows = stmt
            .query_map(params![parent], CategoryRow::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete a category and its whole subtree, including every marker,
    /// trail, property and coordinate below it. Returns whether it existed.
    #[instrument(skip(self), fields(pack = %self.name))]
    pub fn delete_category(&self, typeid: &str) -> Result<bool> {
        // Cascades do not fire while foreign keys are off in bulk mode, so
        // the subtree's dependent rows are removed explicitly.
        const ENTITY_DELETES: [&str; 6] = [
            "DELETE FROM markerprops WHERE marker IN \
             (SELECT id FROM markers WHERE type = ?1 OR type LIKE ?2 ESCAPE '\\')",
            "DELETE FROM markers WHERE type = ?1 OR type LIKE ?2 ESCAPE '\\'",
            "DELETE FROM trailprops WHERE trail IN \
             (SELECT id FROM trails WHERE type = ?1 OR type LIKE ?2 ESCAPE '\\')",
            "DELETE FROM trailcoords WHERE trail IN \
             (SELECT id FROM trails WHERE type = ?1 OR type LIKE ?2 ESCAPE '\\')",
            "DELETE FROM trails WHERE type = ?1 OR type LIKE ?2 ESCAPE '\\'",
            "DELETE FROM categoryprops WHERE category = ?1 OR category LIKE ?2 ESCAPE '\\'",
        ];
        let typeid = checked_typeid(typeid)?;
        let pattern = descendant_pattern(&typeid);
        self.atomically(|conn| {
            for sql in ENTITY_DELETES {
                let _ = conn.execute(sql, params![typeid, pattern])?;
            }
            let _ = conn.execute(
                "DELETE FROM categories WHERE typeid LIKE ?1 ESCAPE '\\'",
                params![pattern],
            )?;
            let deleted = conn.execute("DELETE FROM categories WHERE typeid = ?1", params![typeid])?;
            Ok(deleted > 0)
        })
    }

    /// Whether the category (and, with `include_descendants`, any category
    /// below it) owns a marker or trail in `mapid`.
    pub fn has_markers_in_map(
        &self,
        typeid: &str,
        mapid: u32,
        include_descendants: bool,
    ) -> Result<bool> {
        let typeid = checked_typeid(typeid)?;
        let found = if include_descendants {
            self.conn.query_row(
                "SELECT EXISTS(
                   SELECT 1 FROM markers WHERE mapid = ?2 AND (type = ?1 OR type LIKE ?3 ESCAPE '\\')
                   UNION ALL
                   SELECT 1 FROM trails WHERE mapid = ?2 AND (type = ?1 OR type LIKE ?3 ESCAPE '\\')
                 )",
                params![typeid, mapid, descendant_pattern(&typeid)],
                |row| row.get(0),
            )?
        } else {
            self.conn.query_row(
                "SELECT EXISTS(
                   SELECT 1 FROM markers WHERE mapid = ?2 AND type = ?1
                   UNION ALL
                   SELECT 1 FROM trails WHERE mapid = ?2 AND type = ?1
                 )",
                params![typeid, mapid],
                |row| row.get(0),
            )?
        };
        Ok(found)
    }

    /// Distinct type ids owning any marker or trail in `mapid`, sorted.
    pub fn categories_in_map(&self, mapid: u32) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT type FROM markers WHERE mapid = ?1
             UNION
             SELECT type FROM trails WHERE mapid = ?1
             ORDER BY 1",
        )?;
        let rows = stmt
            .query_map(params![mapid], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
