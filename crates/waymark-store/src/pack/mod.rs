//! Per-pack `SQLite` store.
//!
//! One [`PackStore`] owns one connection to one marker pack database. The
//! schema is fixed (`markerpack.version = 1`); a fresh file is initialized on
//! open, an existing file with any other version is rejected.
//!
//! The store's surface is split across submodules by entity:
//! [`category`], [`entity`] (markers and trails), [`props`], [`datafile`],
//! and [`integrity`].

pub mod category;
pub mod datafile;
pub mod entity;
pub mod integrity;
pub mod props;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::errors::{Result, StoreError};

pub use category::CategoryRow;
pub use datafile::normalize_path;
pub use entity::{MarkerRow, TrailRow};
pub use integrity::{OrphanKind, OrphanRow};
pub use props::PropOwner;

const PACK_SCHEMA: &str = include_str!("schema.sql");

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
                       PRAGMA foreign_keys = ON;";

/// The only supported `markerpack.version`.
pub const PACK_VERSION: i64 = 1;

/// Row counts of a pack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PackStats {
    /// Number of categories.
    pub categories: u64,
    /// Number of markers.
    pub markers: u64,
    /// Number of trails.
    pub trails: u64,
    /// Number of stored data files.
    pub data_files: u64,
}

/// A single marker pack database.
pub struct PackStore {
    conn: Connection,
    name: String,
    path: Option<PathBuf>,
    bulk: bool,
}

impl std::fmt::Debug for PackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackStore")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("bulk", &self.bulk)
            .finish_non_exhaustive()
    }
}

impl PackStore {
    /// Open a pack, initializing the schema if the file is new.
    ///
    /// The pack name is the file stem.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open_or_create(path: &Path) -> Result<Self> {
        Self::open_file(path, true)
    }

    /// Open an existing pack. A file without the pack schema is rejected.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open_existing(path: &Path) -> Result<Self> {
        Self::open_file(path, false)
    }

    /// A fresh in-memory pack named `name`.
    pub fn in_memory(name: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(PRAGMAS)?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            name: name.to_owned(),
            path: None,
            bulk: false,
        })
    }

    fn open_file(path: &Path, create: bool) -> Result<Self> {
        if create {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        } else if !path.exists() {
            return Err(StoreError::SchemaVersion {
                path: path.display().to_string(),
                found: None,
            });
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(PRAGMAS)?;

        let has_schema: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'markerpack')",
            [],
            |row| row.get(0),
        )?;

        if has_schema {
            let found: Option<i64> = conn
                .query_row("SELECT version FROM markerpack LIMIT 1", [], |row| row.get(0))
                .optional()?
                .flatten();
            if found != Some(PACK_VERSION) {
                return Err(StoreError::SchemaVersion {
                    path: path.display().to_string(),
                    found,
                });
            }
            debug!("existing pack schema verified");
        } else if create {
            init_schema(&conn)?;
            info!("initialized new pack");
        } else {
            return Err(StoreError::SchemaVersion {
                path: path.display().to_string(),
                found: None,
            });
        }

        let name = path
            .file_stem()
            .map_or_else(|| "pack".to_string(), |s| s.to_string_lossy().into_owned());

        Ok(Self {
            conn,
            name,
            path: Some(path.to_owned()),
            bulk: false,
        })
    }

    /// Name the pack was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database path, `None` for in-memory packs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw connection, for inspection in tests and tools.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Bulk import ─────────────────────────────────────────────────

    /// Disable foreign key enforcement and open an explicit transaction.
    ///
    /// Everything written until [`commit_bulk`](Self::commit_bulk) or
    /// [`rollback_bulk`](Self::rollback_bulk) lands in one transaction.
    pub fn begin_bulk(&mut self) -> Result<()> {
        if self.bulk {
            return Err(StoreError::InvalidOperation(
                "bulk transaction already open".into(),
            ));
        }
        // foreign_keys cannot change inside a transaction, so it goes first
        self.conn.execute_batch("PRAGMA foreign_keys = OFF; BEGIN;")?;
        self.bulk = true;
        debug!(pack = %self.name, "bulk transaction started");
        Ok(())
    }

    /// Commit the bulk transaction and re-enable foreign keys.
    pub fn commit_bulk(&mut self) -> Result<()> {
        if !self.bulk {
            return Err(StoreError::InvalidOperation(
                "no bulk transaction to commit".into(),
            ));
        }
        self.conn.execute_batch("COMMIT; PRAGMA foreign_keys = ON;")?;
        self.bulk = false;
        debug!(pack = %self.name, "bulk transaction committed");
        Ok(())
    }

    /// Roll back the bulk transaction and re-enable foreign keys.
    pub fn rollback_bulk(&mut self) -> Result<()> {
        if !self.bulk {
            return Err(StoreError::InvalidOperation(
                "no bulk transaction to roll back".into(),
            ));
        }
        self.conn.execute_batch("ROLLBACK; PRAGMA foreign_keys = ON;")?;
        self.bulk = false;
        debug!(pack = %self.name, "bulk transaction rolled back");
        Ok(())
    }

    /// Whether a bulk transaction is open.
    pub fn in_bulk(&self) -> bool {
        self.bulk
    }

    /// Run `f` atomically. Inside a bulk transaction the writes simply join
    /// it; otherwise they get their own.
    pub(crate) fn atomically<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if self.bulk {
            return f(&self.conn);
        }
        let tx = self.conn.unchecked_transaction()?;
        let out = f(&*tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Row counts.
    pub fn stats(&self) -> Result<PackStats> {
        let count = |table: &str| -> Result<u64> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n.unsigned_abs())
        };
        Ok(PackStats {
            categories: count("categories")?,
            markers: count("markers")?,
            trails: count("trails")?,
            data_files: count("datafiles")?,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(PACK_SCHEMA)?;
    tx.commit()?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn in_memory_pack_has_version_one() {
        let pack = PackStore::in_memory("test").unwrap();
        let v: i64 = pack
            .conn()
            .query_row("SELECT version FROM markerpack", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, 1);
        assert_eq!(pack.name(), "test");
        assert!(pack.path().is_none());
    }

    #[test]
    fn open_or_create_initializes_then_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packs").join("tekkit.db");
        {
            let pack = PackStore::open_or_create(&path).unwrap();
            pack.category("a.b", true).unwrap();
            assert_eq!(pack.name(), "tekkit");
        }
        let pack = PackStore::open_existing(&path).unwrap();
        assert_eq!(pack.stats().unwrap().categories, 2);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE markerpack (version INTEGER); INSERT INTO markerpack VALUES (2);")
                .unwrap();
        }
        let err = PackStore::open_or_create(&path).unwrap_err();
        assert_matches!(err, StoreError::SchemaVersion { found: Some(2), .. });
    }

    #[test]
    fn missing_version_row_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE markerpack (version INTEGER);").unwrap();
        }
        let err = PackStore::open_or_create(&path).unwrap_err();
        assert_matches!(err, StoreError::SchemaVersion { found: None, .. });
    }

    #[test]
    fn open_existing_never_creates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert_matches!(
            PackStore::open_existing(&path),
            Err(StoreError::SchemaVersion { found: None, .. })
        );
        assert!(!path.exists());
    }

    #[test]
    fn bulk_commit_persists_and_restores_foreign_keys() {
        let mut pack = PackStore::in_memory("bulk").unwrap();
        pack.begin_bulk().unwrap();
        assert!(pack.in_bulk());
        // orphan accepted while enforcement is off
        pack.new_marker("nowhere", 1).unwrap();
        pack.commit_bulk().unwrap();

        let fk: i64 = pack
            .conn()
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        assert_eq!(pack.stats().unwrap().markers, 1);
    }

    #[test]
    fn bulk_rollback_discards_writes() {
        let mut pack = PackStore::in_memory("bulk").unwrap();
        pack.begin_bulk().unwrap();
        pack.category("a", true).unwrap();
        pack.rollback_bulk().unwrap();
        assert_eq!(pack.stats().unwrap(), PackStats::default());
    }

    #[test]
    fn bulk_misuse_is_rejected() {
        let mut pack = PackStore::in_memory("bulk").unwrap();
        assert_matches!(pack.commit_bulk(), Err(StoreError::InvalidOperation(_)));
        pack.begin_bulk().unwrap();
        assert_matches!(pack.begin_bulk(), Err(StoreError::InvalidOperation(_)));
        pack.rollback_bulk().unwrap();
    }
}
