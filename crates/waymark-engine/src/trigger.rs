//! Proximity-triggered GUID consumption.
//!
//! Each tick, every live trigger candidate whose squared distance to the
//! player is within its squared radius is consumed: behavior 1 goes to the
//! engine's session set, everything else is written to the activation
//! ledger under the behavior's scope. The marker is then point-removed from
//! the live collections; the rest of its category stays drawn.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use waymark_core::{Behavior, PrimitiveTag, ScopeKey};
use waymark_store::{ActivationLedger, StateStore};

use crate::errors::Result;
use crate::render::RenderSink;
use crate::sync::{SyncEngine, TriggerCandidate};
use crate::telemetry::TelemetrySnapshot;

/// Ledger scope of a persisted behavior. `None` when the scope cannot be
/// determined (per-character behavior with no known character).
pub fn ledger_scope(behavior: Behavior, snapshot: Option<&TelemetrySnapshot>) -> Option<ScopeKey> {
    match behavior {
        Behavior::Session => None,
        Behavior::DailyGlobal | Behavior::Permanent | Behavior::Weekly => Some(ScopeKey::global()),
        Behavior::MapInstance => snapshot.map(|s| ScopeKey::map_instance(s.map_id, s.shard_id)),
        Behavior::DailyPerCharacter => snapshot
            .and_then(|s| s.character.as_deref())
            .filter(|name| !name.is_empty())
            .map(ScopeKey::character),
    }
}

/// Whether a GUID marker is currently consumed.
pub(crate) fn is_consumed(
    state: &StateStore,
    session: &HashSet<String>,
    snapshot: Option<&TelemetrySnapshot>,
    guid: &str,
    behavior: Behavior,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(period) = behavior.period() else {
        return Ok(session.contains(guid));
    };
    match ledger_scope(behavior, snapshot) {
        Some(scope) => Ok(ActivationLedger::is_suppressed(
            state.conn(),
            guid,
            period,
            &scope,
            now,
        )?),
        None => Ok(false),
    }
}

/// Stateless trigger driver over a [`SyncEngine`].
pub struct TriggerEngine;

impl TriggerEngine {
    /// Consume every candidate in range, if triggers are enabled. Returns
    /// the tags removed.
    pub fn tick<R: RenderSink>(
        engine: &mut SyncEngine<R>,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrimitiveTag>> {
        if !engine.config().triggers_enabled {
            return Ok(Vec::new());
        }
        Self::consume_in_range(engine, now)
    }

    /// Manual consume action: same per-marker logic as [`tick`](Self::tick),
    /// regardless of the enabled setting.
    pub fn consume_in_range<R: RenderSink>(
        engine: &mut SyncEngine<R>,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrimitiveTag>> {
        let Some(player) = engine.telemetry().map(|t| t.position) else {
            return Ok(Vec::new());
        };
        let in_range: Vec<TriggerCandidate> = engine
            .triggers()
            .iter()
            .filter(|c| c.position.distance_squared(&player) <= c.radius_sq)
            .cloned()
            .collect();

        let mut consumed = Vec::new();
        for candidate in in_range {
            if Self::consume(engine, &candidate, now)? {
                engine.remove_entry(&candidate.tag);
                consumed.push(candidate.tag);
            }
        }
        Ok(consumed)
    }

    fn consume<R: RenderSink>(
        engine: &mut SyncEngine<R>,
        candidate: &TriggerCandidate,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if candidate.behavior == Behavior::Session {
            engine.session_consume(&candidate.guid);
            info!(tag = %candidate.tag, guid = %candidate.guid, "marker consumed for this session");
            return Ok(true);
        }
        let Some(scope) = ledger_scope(candidate.behavior, engine.telemetry()) else {
            warn!(
                tag = %candidate.tag,
                guid = %candidate.guid,
                behavior = candidate.behavior.code(),
                "no character name known, marker not consumed"
            );
            return Ok(false);
        };
        ActivationLedger::consume(engine.state().conn(), &candidate.guid, &scope, now)?;
        info!(
            tag = %candidate.tag,
            guid = %candidate.guid,
            behavior = candidate.behavior.code(),
            scope = %scope,
            "marker consumed"
        );
        Ok(true)
    }
}
