//! User-local state database.
//!
//! Holds what belongs to the user rather than to a pack: category visibility
//! overrides ([`OverrideRepo`]) and the GUID activation ledger
//! ([`ActivationLedger`]). Both repositories are stateless and take a
//! `&Connection`; [`StateStore`] owns the connection and runs migrations.

pub mod ledger;
pub mod migrations;
pub mod overrides;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::errors::Result;

pub use ledger::{ActivationLedger, ActivationRecord, day_boundary, week_boundary};
pub use overrides::{OverrideRepo, OverrideRow};

/// Owner of the state database connection.
pub struct StateStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Open (or create) the state database and apply migrations.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let applied = migrations::run_migrations(&conn)?;
        info!(applied, "state database opened");
        Ok(Self {
            conn,
            path: Some(path.to_owned()),
        })
    }

    /// A fresh in-memory state database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let _ = migrations::run_migrations(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// The connection, for the repositories.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Database path, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;

    #[test]
    fn state_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");
        {
            let state = StateStore::open(&path).unwrap();
            OverrideRepo::set(state.conn(), "a.b", false).unwrap();
        }
        let state = StateStore::open(&path).unwrap();
        assert_eq!(OverrideRepo::get(state.conn(), "a.b").unwrap(), Some(false));
        assert_eq!(migrations::current_version(state.conn()).unwrap(), 1);
    }
}
