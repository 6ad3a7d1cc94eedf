//! Error types for the pack and state stores.

use thiserror::Error;

/// Errors returned by [`PackStore`](crate::PackStore) and
/// [`StateStore`](crate::StateStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while creating the database directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The pack file exists but is not a version 1 marker pack.
    #[error("unsupported pack schema in {path}: version {}", version_label(.found))]
    SchemaVersion {
        /// Database path (or in-memory name).
        path: String,
        /// The stored `markerpack.version`, if any.
        found: Option<i64>,
    },

    /// A type id was empty or contained an empty segment.
    #[error("invalid type id: {0:?}")]
    InvalidTypeId(String),

    /// A referenced category does not exist.
    #[error("category not found: {0}")]
    CategoryNotFound(String),

    /// State schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Operation not valid in the store's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

fn version_label(found: &Option<i64>) -> String {
    found.map_or_else(|| "missing".to_string(), |v| v.to_string())
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
