//! Persistent GUID activation ledger.
//!
//! A record `(guid, scope) -> timestamp` says a marker was consumed at that
//! instant. Whether it still suppresses the marker depends on the behavior's
//! reset period:
//!
//! - `Permanent`: any record suppresses
//! - `Day`: the record is at or after the most recent 00:00 UTC
//! - `Week`: the record is at or after the most recent Monday 07:30 UTC
//!
//! Records are upserted on consumption and never purged; a stale day or week
//! record simply stops suppressing.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, instrument};
use waymark_core::{ResetPeriod, ScopeKey};

use crate::errors::Result;

/// Weekly reset time of day (UTC): 07:30.
const WEEKLY_RESET_SECS: u32 = 7 * 3600 + 30 * 60;

/// The most recent daily reset at or before `now` (00:00 UTC).
pub fn day_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// The most recent weekly reset at or before `now` (Monday 07:30 UTC).
pub fn week_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_since_monday = i64::from(now.weekday().num_days_from_monday());
    let monday = now.date_naive() - Duration::days(days_since_monday);
    let reset = NaiveTime::from_num_seconds_from_midnight_opt(WEEKLY_RESET_SECS, 0)
        .unwrap_or(NaiveTime::MIN);
    let candidate = Utc.from_utc_datetime(&monday.and_time(reset));
    if candidate > now {
        candidate - Duration::days(7)
    } else {
        candidate
    }
}

/// One stored consumption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivationRecord {
    /// Marker GUID.
    pub guid: String,
    /// Scope the record applies to.
    pub scope: ScopeKey,
    /// When the marker was consumed.
    pub timestamp: DateTime<Utc>,
}

/// Ledger repository: stateless, every method takes `&Connection`.
pub struct ActivationLedger;

impl ActivationLedger {
    /// Whether a record for `(guid, scope)` still suppresses its marker.
    pub fn is_suppressed(
        conn: &Connection,
        guid: &str,
        period: ResetPeriod,
        scope: &ScopeKey,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(stamp) = Self::timestamp(conn, guid, scope)? else {
            return Ok(false);
        };
        let suppressed = match period {
            ResetPeriod::Permanent => true,
            ResetPeriod::Day => stamp >= day_boundary(now).timestamp(),
            ResetPeriod::Week => stamp >= week_boundary(now).timestamp(),
        };
        Ok(suppressed)
    }

    /// Record a consumption at `now`, replacing any earlier timestamp.
    #[instrument(skip(conn, scope), fields(scope = %scope))]
    pub fn consume(
        conn: &Connection,
        guid: &str,
        scope: &ScopeKey,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO activations (guid, scope, timestamp) VALUES (?1, ?2, ?3)
             ON CONFLICT(guid, scope) DO UPDATE SET timestamp = excluded.timestamp",
            params![guid, scope.as_str(), now.timestamp()],
        )?;
        debug!("activation recorded");
        Ok(())
    }

    /// The stored record for `(guid, scope)`.
    pub fn record(
        conn: &Connection,
        guid: &str,
        scope: &ScopeKey,
    ) -> Result<Option<ActivationRecord>> {
        Ok(Self::timestamp(conn, guid, scope)?.map(|ts| ActivationRecord {
            guid: guid.to_owned(),
            scope: scope.clone(),
            timestamp: Utc.timestamp_opt(ts, 0).single().unwrap_or_default(),
        }))
    }

    /// Number of stored records, stale ones included.
    pub fn consumed_count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM activations", [], |row| row.get(0))?;
        Ok(n.unsigned_abs())
    }

    /// Every record for one GUID, across scopes.
    pub fn records_for(conn: &Connection, guid: &str) -> Result<Vec<ActivationRecord>> {
        let mut stmt = conn.prepare(
            "SELECT scope, timestamp FROM activations WHERE guid = ?1 ORDER BY scope",
        )?;
        let rows = stmt
            .query_map(params![guid], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(|(scope, ts)| ActivationRecord {
                guid: guid.to_owned(),
                scope: ScopeKey::from_raw(scope),
                timestamp: Utc.timestamp_opt(ts, 0).single().unwrap_or_default(),
            })
            .collect())
    }

    fn timestamp(conn: &Connection, guid: &str, scope: &ScopeKey) -> Result<Option<i64>> {
        let ts = conn
            .query_row(
                "SELECT timestamp FROM activations WHERE guid = ?1 AND scope = ?2",
                params![guid, scope.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
