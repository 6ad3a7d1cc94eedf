//! # waymark-core
//!
//! Foundation types shared by every Waymark crate.
//!
//! - **Geometry**: [`Vec3`] world/map coordinates with squared-distance helpers
//! - **Property values**: [`PropValue`], the typed value stored in every property table
//! - **Keys**: [`CategoryKey`] and [`PrimitiveTag`] used to tag render primitives
//! - **Type ids**: dotted category path helpers ([`typeid`])
//! - **Behaviors**: GUID consumption codes, reset periods and ledger scopes
//! - **Logging**: `tracing` subscriber bootstrap and test capture

#![deny(unsafe_code)]

pub mod behavior;
pub mod geometry;
pub mod keys;
pub mod logging;
pub mod typeid;
pub mod value;

pub use behavior::{Behavior, ResetPeriod, ScopeKey};
pub use geometry::Vec3;
pub use keys::{CategoryKey, EntryId, PrimitiveTag};
pub use value::PropValue;
