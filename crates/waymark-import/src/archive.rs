//! Where pack files come from.
//!
//! A pack is either an extracted directory or a zip archive. Both are
//! indexed up front by normalized path (see
//! [`normalize_path`](waymark_store::normalize_path)) so lookups from XML
//! attributes match regardless of slash direction or case.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use waymark_store::normalize_path;
use zip::ZipArchive;

use crate::errors::Result;

/// A read-only view of the files in a pack.
pub trait ArchiveSource {
    /// Display name, used in logs.
    fn name(&self) -> &str;

    /// Every file, as normalized paths, sorted.
    fn entries(&self) -> Vec<String>;

    /// Contents of a file, `None` if it does not exist.
    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Root-level `.xml` documents, sorted.
    fn documents(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|p| !p.contains('/') && p.ends_with(".xml"))
            .collect()
    }
}

// ── Directory ───────────────────────────────────────────────────────────────

/// An extracted pack on disk.
pub struct DirectorySource {
    name: String,
    files: BTreeMap<String, PathBuf>,
}

impl DirectorySource {
    /// Index every regular file under `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or_else(|_| entry.path());
            let _ = files.insert(
                normalize_path(&rel.to_string_lossy()),
                entry.path().to_path_buf(),
            );
        }
        debug!(root = %root.display(), files = files.len(), "indexed directory source");
        Ok(Self {
            name: root.display().to_string(),
            files,
        })
    }
}

impl ArchiveSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.files.get(&normalize_path(path)) {
            Some(p) => Ok(Some(std::fs::read(p)?)),
            None => Ok(None),
        }
    }
}

// ── Zip ─────────────────────────────────────────────────────────────────────

/// A zipped pack.
pub struct ZipSource {
    name: String,
    archive: ZipArchive<File>,
    index: BTreeMap<String, usize>,
}

impl ZipSource {
    /// Open and index a zip archive.
    pub fn open(path: &Path) -> Result<Self> {
        let archive = ZipArchive::new(File::open(path)?)?;
        let mut index = BTreeMap::new();
        for i in 0..archive.len() {
            let Some(name) = archive.name_for_index(i) else {
                continue;
            };
            if name.ends_with('/') {
                continue;
            }
            let _ = index.entry(normalize_path(name)).or_insert(i);
        }
        debug!(archive = %path.display(), files = index.len(), "indexed zip source");
        Ok(Self {
            name: path.display().to_string(),
            archive,
            index,
        })
    }
}

impl ArchiveSource for ZipSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let Some(&i) = self.index.get(&normalize_path(path)) else {
            return Ok(None);
        };
        let mut file = self.archive.by_index(i)?;
        let mut buf = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        let _ = file.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }
}

// ── Memory ──────────────────────────────────────────────────────────────────

/// An in-memory pack, for tests and programmatic authoring.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    name: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    /// An empty source.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            files: BTreeMap::new(),
        }
    }

    /// Add a file, replacing any earlier one at the same normalized path.
    #[must_use]
    pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        let _ = self.files.insert(normalize_path(path), data.into());
        self
    }
}

impl ArchiveSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn read(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(&normalize_path(path)).cloned())
    }
}

/// Open a directory or a zip archive, by what `path` is.
pub fn open_source(path: &Path) -> Result<Box<dyn ArchiveSource>> {
    if path.is_dir() {
        Ok(Box::new(DirectorySource::open(path)?))
    } else {
        Ok(Box::new(ZipSource::open(path)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
