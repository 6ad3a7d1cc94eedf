//! GUID consumption behaviors.
//!
//! A marker carrying a `guid` may also carry a numeric `behavior` code that
//! decides what happens once the player reaches it: hidden for the rest of the
//! session, until the next daily or weekly reset, or forever. The code also
//! decides the *scope* of the consumption record (everyone, one character, one
//! map instance).

use std::fmt;

use serde::{Deserialize, Serialize};

/// How long a consumption record suppresses its marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPeriod {
    /// Until the next daily boundary (00:00 UTC).
    Day,
    /// Until the next weekly reset instant.
    Week,
    /// Forever.
    Permanent,
}

impl ResetPeriod {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ResetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known behavior codes. Any other code never consumes its marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    /// Code 1: hidden until the process restarts. Never persisted.
    Session,
    /// Code 2: hidden for everyone until the daily reset.
    DailyGlobal,
    /// Code 3: hidden for everyone, permanently.
    Permanent,
    /// Code 6: hidden permanently within one map instance (map + shard).
    MapInstance,
    /// Code 7: hidden for the current character until the daily reset.
    DailyPerCharacter,
    /// Code 101: hidden for everyone until the weekly reset.
    Weekly,
}

impl Behavior {
    /// Map a raw code to a behavior. `0` and unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Session),
            2 => Some(Self::DailyGlobal),
            3 => Some(Self::Permanent),
            6 => Some(Self::MapInstance),
            7 => Some(Self::DailyPerCharacter),
            101 => Some(Self::Weekly),
            _ => None,
        }
    }

    /// The raw code as written in marker packs.
    pub fn code(self) -> i64 {
        match self {
            Self::Session => 1,
            Self::DailyGlobal => 2,
            Self::Permanent => 3,
            Self::MapInstance => 6,
            Self::DailyPerCharacter => 7,
            Self::Weekly => 101,
        }
    }

    /// Reset period of the persisted record. `None` for session-only behavior.
    pub fn period(self) -> Option<ResetPeriod> {
        match self {
            Self::Session => None,
            Self::DailyGlobal | Self::DailyPerCharacter => Some(ResetPeriod::Day),
            Self::Permanent | Self::MapInstance => Some(ResetPeriod::Permanent),
            Self::Weekly => Some(ResetPeriod::Week),
        }
    }

    /// Whether consumption is written to the persistent ledger.
    pub fn is_persisted(self) -> bool {
        !matches!(self, Self::Session)
    }
}

/// Scope half of an activation record key.
///
/// Global records use the empty scope; per-character and per-instance records
/// carry a prefixed discriminator so the two can never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// Scope shared by every character and instance.
    pub fn global() -> Self {
        Self(String::new())
    }

    /// Scope of a single character.
    pub fn character(name: &str) -> Self {
        Self(format!("character:{name}"))
    }

    /// Scope of one map instance.
    pub fn map_instance(map_id: u32, shard_id: u32) -> Self {
        Self(format!("instance:{map_id}:{shard_id}"))
    }

    /// Rebuild from a stored value.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Stored representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("global")
        } else {
            f.write_str(&self.0)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for code in [1, 2, 3, 6, 7, 101] {
            let b = Behavior::from_code(code).unwrap();
            assert_eq!(b.code(), code);
        }
    }

    #[test]
    fn unknown_codes_never_consume() {
        assert!(Behavior::from_code(0).is_none());
        assert!(Behavior::from_code(4).is_none());
        assert!(Behavior::from_code(-1).is_none());
    }

    #[test]
    fn periods_match_table() {
        assert_eq!(Behavior::Session.period(), None);
        assert_eq!(Behavior::DailyGlobal.period(), Some(ResetPeriod::Day));
        assert_eq!(Behavior::DailyPerCharacter.period(), Some(ResetPeriod::Day));
        assert_eq!(Behavior::Permanent.period(), Some(ResetPeriod::Permanent));
        assert_eq!(Behavior::MapInstance.period(), Some(ResetPeriod::Permanent));
        assert_eq!(Behavior::Weekly.period(), Some(ResetPeriod::Week));
        assert!(!Behavior::Session.is_persisted());
        assert!(Behavior::Weekly.is_persisted());
    }

    #[test]
    fn scope_keys_are_distinct() {
        assert_eq!(ScopeKey::global().as_str(), "");
        assert_eq!(ScopeKey::character("Zojja").as_str(), "character:Zojja");
        assert_eq!(ScopeKey::map_instance(15, 2).as_str(), "instance:15:2");
        assert_ne!(ScopeKey::character("15:2"), ScopeKey::map_instance(15, 2));
        assert_eq!(ScopeKey::global().to_string(), "global");
    }
}
