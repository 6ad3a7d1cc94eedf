//! Binary data files (icons, trail textures) keyed by normalized path.

use rusqlite::{OptionalExtension, params};

use super::PackStore;
use crate::errors::Result;

/// Normalize a pack-relative path: backslashes become `/`, the result is
/// lower-cased and a leading `./` or `/` is dropped.
pub fn normalize_path(raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/").to_lowercase();
    let mut rest = unified.as_str();
    loop {
        if let Some(r) = rest.strip_prefix("./") {
            rest = r;
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
        } else {
            break;
        }
    }
    rest.to_owned()
}

impl PackStore {
    /// Store a data file. The first writer wins: returns `false` (and keeps
    /// the existing bytes) when the path is already present.
    pub fn put_data_file(&self, path: &str, data: &[u8]) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO datafiles (path, data) VALUES (?1, ?2)",
            params![normalize_path(path), data],
        )?;
        Ok(inserted > 0)
    }

    /// Bytes of a data file.
    pub fn data_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let data = self
            .conn
            .query_row(
                "SELECT data FROM datafiles WHERE path = ?1",
                params![normalize_path(path)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }

    /// Whether a data file exists.
    pub fn has_data_file(&self, path: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM datafiles WHERE path = ?1)",
            params![normalize_path(path)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_examples() {
        assert_eq!(normalize_path("Data\\Icons\\Foo.PNG"), "data/icons/foo.png");
        assert_eq!(normalize_path("./icons/a.png"), "icons/a.png");
        assert_eq!(normalize_path("/icons/a.png"), "icons/a.png");
        assert_eq!(normalize_path(".\\icons\\a.png"), "icons/a.png");
        assert_eq!(normalize_path("icons/a.png"), "icons/a.png");
    }

    #[test]
    fn first_writer_wins() {
        let pack = PackStore::in_memory("test").unwrap();
        assert!(pack.put_data_file("Icons\\A.png", b"first").unwrap());
        assert!(!pack.put_data_file("icons/a.png", b"second").unwrap());
        assert_eq!(pack.data_file("./ICONS/a.png").unwrap().as_deref(), Some(&b"first"[..]));
        assert!(pack.has_data_file("icons/a.png").unwrap());
        assert!(!pack.has_data_file("icons/b.png").unwrap());
        assert_eq!(pack.data_file("icons/b.png").unwrap(), None);
    }
}
