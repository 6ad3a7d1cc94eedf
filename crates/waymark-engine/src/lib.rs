//! # waymark-engine
//!
//! Keeps a live render index in step with imported marker packs.
//!
//! - **Visibility**: [`ActiveResolver`], overrides over `defaulttoggle`,
//!   inherited through ancestors
//! - **Sync**: [`SyncEngine`] with cooperative, checkpointable
//!   [`ReloadTask`]s (full on map change, incremental on toggles)
//! - **Triggers**: [`TriggerEngine`], proximity consumption of GUID markers
//!   into the activation ledger or the session set
//! - **Collaborators**: [`RenderSink`] / [`RenderCollections`] and
//!   [`TelemetrySource`] / [`StaticTelemetry`]
//! - **Throttle**: [`RequestThrottle`], fixed-window backpressure for
//!   external fetches

#![deny(unsafe_code)]

pub mod effective;
pub mod errors;
pub mod proximity;
pub mod render;
pub mod resolver;
pub mod segments;
pub mod sync;
pub mod telemetry;
pub mod throttle;
pub mod trigger;

pub use errors::{EngineError, Result};
pub use render::{Layer, Polyline, RenderCollections, RenderSink, Sprite};
pub use resolver::ActiveResolver;
pub use segments::split_segments;
pub use sync::{
    ReloadCheckpoint, ReloadKind, ReloadPhase, ReloadTask, SyncConfig, SyncEngine,
    TriggerCandidate,
};
pub use telemetry::{StaticTelemetry, TelemetrySnapshot, TelemetrySource};
pub use throttle::RequestThrottle;
pub use trigger::{TriggerEngine, ledger_scope};
