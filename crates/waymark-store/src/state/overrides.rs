//! Per-user category visibility overrides.
//!
//! A row exists only once the user has toggled the category; absence means
//! the category's own `defaulttoggle` decides.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::errors::Result;

/// A `category_overrides` row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OverrideRow {
    /// Category type id.
    pub typeid: String,
    /// Forced visibility.
    pub active: bool,
}

/// Override repository: stateless, every method takes `&Connection`.
pub struct OverrideRepo;

impl OverrideRepo {
    /// The override for `typeid`, if the user set one.
    pub fn get(conn: &Connection, typeid: &str) -> Result<Option<bool>> {
        let active = conn
            .query_row(
                "SELECT active FROM category_overrides WHERE typeid = ?1",
                params![typeid.to_lowercase()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(active.map(|a| a != 0))
    }

    /// Upsert the override for `typeid`.
    pub fn set(conn: &Connection, typeid: &str, active: bool) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO category_overrides (typeid, active) VALUES (?1, ?2)
             ON CONFLICT(typeid) DO UPDATE SET active = excluded.active",
            params![typeid.to_lowercase(), i64::from(active)],
        )?;
        Ok(())
    }

    /// Remove the override. Returns whether one existed.
    pub fn clear(conn: &Connection, typeid: &str) -> Result<bool> {
        let deleted = conn.execute(
            "DELETE FROM category_overrides WHERE typeid = ?1",
            params![typeid.to_lowercase()],
        )?;
        Ok(deleted > 0)
    }

    /// Every override, by type id.
    pub fn all(conn: &Connection) -> Result<Vec<OverrideRow>> {
        let mut stmt =
            conn.prepare("SELECT typeid, active FROM category_overrides ORDER BY typeid")?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OverrideRow> {
        Ok(OverrideRow {
            typeid: row.get(0)?,
            active: row.get::<_, i64>(1)? != 0,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::state::StateStore;

    #[test]
    fn absent_until_set() {
        let state = StateStore::in_memory().unwrap();
        assert_eq!(OverrideRepo::get(state.conn(), "a").unwrap(), None);
    }

    #[test]
    fn set_upserts_case_insensitively() {
        let state = StateStore::in_memory().unwrap();
        let conn = state.conn();
        OverrideRepo::set(conn, "A.B", false).unwrap();
        assert_eq!(OverrideRepo::get(conn, "a.b").unwrap(), Some(false));
        OverrideRepo::set(conn, "a.b", true).unwrap();
        assert_eq!(OverrideRepo::get(conn, "a.b").unwrap(), Some(true));
        assert_eq!(OverrideRepo::all(conn).unwrap().len(), 1);
    }

    #[test]
    fn clear_removes() {
        let state = StateStore::in_memory().unwrap();
        let conn = state.conn();
        OverrideRepo::set(conn, "a", false).unwrap();
        assert!(OverrideRepo::clear(conn, "a").unwrap());
        assert!(!OverrideRepo::clear(conn, "a").unwrap());
        assert_eq!(OverrideRepo::get(conn, "a").unwrap(), None);
    }
}
