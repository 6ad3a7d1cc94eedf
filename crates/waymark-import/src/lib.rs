//! # waymark-import
//!
//! Turns third-party marker packs into [`PackStore`](waymark_store::PackStore)
//! databases.
//!
//! - **Sources**: [`ArchiveSource`] over extracted directories, zip archives
//!   and in-memory file sets
//! - **XML**: owned [`Element`] tree with source lines, parsed by `roxmltree`
//! - **Attributes**: fixed converter table (integer, float, color, path, text)
//! - **Trail data**: binary trail decoding
//! - **Importer**: [`ImportTask`], a resumable bulk import with serializable
//!   checkpoints and a post-commit integrity scan

#![deny(unsafe_code)]

pub mod archive;
pub mod attributes;
pub mod errors;
pub mod importer;
pub mod trail_data;
pub mod xml;

pub use archive::{ArchiveSource, DirectorySource, MemorySource, ZipSource, open_source};
pub use errors::{ImportError, Result, TrailDataError};
pub use importer::{
    DEFAULT_BATCH_SIZE, ImportCheckpoint, ImportPhase, ImportReport, ImportStatus, ImportTask,
};
pub use trail_data::{TrailData, decode_trail, encode_trail};
pub use xml::{Document, Element, parse_document};
