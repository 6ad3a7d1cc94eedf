//! Post-import orphan detection.
//!
//! Foreign keys are off during bulk import, so a pack may end up with
//! markers or trails whose category never got created. These rows are
//! reported, never deleted.

use serde::Serialize;

use super::PackStore;
use crate::errors::Result;

/// Which table an orphan lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanKind {
    /// A `markers` row.
    Marker,
    /// A `trails` row.
    Trail,
}

/// A marker or trail whose `type` references no category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrphanRow {
    /// Table of the row.
    pub kind: OrphanKind,
    /// Row id.
    pub id: i64,
    /// The dangling type id.
    pub typeid: String,
}

impl PackStore {
    /// Every marker and trail referencing a missing category.
    pub fn integrity_scan(&self) -> Result<Vec<OrphanRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT 0, m.id, m.type FROM markers m
             LEFT JOIN categories c ON c.typeid = m.type WHERE c.typeid IS NULL
             UNION ALL
             SELECT 1, t.id, t.type FROM trails t
             LEFT JOIN categories c ON c.typeid = t.type WHERE c.typeid IS NULL
             ORDER BY 1, 2",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(OrphanRow {
                    kind: if row.get::<_, i64>(0)? == 0 {
                        OrphanKind::Marker
                    } else {
                        OrphanKind::Trail
                    },
                    id: row.get(1)?,
                    typeid: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
