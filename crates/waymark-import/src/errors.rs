//! Import error types.
//!
//! Only failures that abort an import are errors. Problems confined to one
//! element or one referenced file are logged and the import continues.

use thiserror::Error;
use waymark_store::StoreError;

/// Errors that abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Filesystem error reading the source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip archive could not be read.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Writing to the pack store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A document is not well-formed XML.
    #[error("xml error in {document}: {message}")]
    Xml {
        /// Document name inside the archive.
        document: String,
        /// Parser message, with position.
        message: String,
    },

    /// A trail data file could not be decoded.
    #[error("bad trail data {path}: {source}")]
    TrailData {
        /// Path of the binary inside the archive.
        path: String,
        /// What was wrong with it.
        source: TrailDataError,
    },

    /// The task was driven in a state that does not allow it.
    #[error("invalid import state: {0}")]
    InvalidState(String),
}

/// Problems with a binary trail file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrailDataError {
    /// Shorter than the 8-byte header.
    #[error("{len} bytes is shorter than the header")]
    TooShort {
        /// Buffer length.
        len: usize,
    },
    /// Header version other than 0.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),
    /// The buffer ends inside a coordinate triple.
    #[error("{trailing} trailing bytes after the last full point")]
    PartialTriple {
        /// Bytes left over.
        trailing: usize,
    },
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
