//! # waymark-store
//!
//! `SQLite` persistence for the Waymark engine.
//!
//! - **Pack store**: [`PackStore`], one database per imported marker pack:
//!   hierarchical categories, markers, trails, typed properties with inherited
//!   resolution, data files, bulk-import transactions and an integrity scan
//! - **State store**: [`StateStore`], one user-local database holding category
//!   overrides ([`OverrideRepo`]) and the GUID [`ActivationLedger`]
//! - **Errors**: [`StoreError`] with a crate-wide [`Result`] alias

#![deny(unsafe_code)]

pub mod errors;
pub mod pack;
pub mod state;

pub use errors::{Result, StoreError};
pub use pack::{
    CategoryRow, MarkerRow, OrphanKind, OrphanRow, PackStats, PackStore, PropOwner, TrailRow,
    normalize_path,
};
pub use state::{
    ActivationLedger, ActivationRecord, OverrideRepo, OverrideRow, StateStore, day_boundary,
    week_boundary,
};
