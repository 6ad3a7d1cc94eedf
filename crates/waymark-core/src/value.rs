//! Typed property values.
//!
//! Every property table (`categoryprops`, `markerprops`, `trailprops`) stores
//! its `value` column with SQLite's dynamic typing. [`PropValue`] mirrors the
//! three storage classes the import pipeline produces and converts losslessly
//! through [`ToSql`]/[`FromSql`]. `NULL` is never a value: a missing row and a
//! deleted property are the same thing, so callers see `Option<PropValue>`.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};

/// A single property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Integer storage class (ids, flags, packed colors, behavior codes).
    Integer(i64),
    /// Real storage class (positions, sizes, ranges).
    Real(f64),
    /// Text storage class (paths, names, GUIDs, pass-through attributes).
    Text(String),
}

impl PropValue {
    /// Numeric view as an integer. Text is parsed; reals are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(f) if f.is_finite() => Some(*f as i64),
            Self::Real(_) => None,
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
            }
        }
    }

    /// Numeric view as a float. Text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Borrow the text payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view. Numbers are true when non-zero; text accepts
    /// `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off` (case-insensitive).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Integer(i) => Some(*i != 0),
            Self::Real(f) => Some(*f != 0.0),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl ToSql for PropValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for PropValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(Self::Integer(i)),
            ValueRef::Real(f) => Ok(Self::Real(f)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Self::Text(s.to_owned()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Null | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
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
    fn numeric_views_coerce_text() {
        assert_eq!(PropValue::from("42").as_i64(), Some(42));
        assert_eq!(PropValue::from(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(PropValue::from("2.9").as_i64(), Some(2));
        assert_eq!(PropValue::from("abc").as_i64(), None);
        assert_eq!(PropValue::Real(7.8).as_i64(), Some(7));
        assert_eq!(PropValue::Integer(3).as_f64(), Some(3.0));
    }

    #[test]
    fn bool_view() {
        assert_eq!(PropValue::Integer(0).as_bool(), Some(false));
        assert_eq!(PropValue::Integer(5).as_bool(), Some(true));
        assert_eq!(PropValue::from("Off").as_bool(), Some(false));
        assert_eq!(PropValue::from("YES").as_bool(), Some(true));
        assert_eq!(PropValue::from("maybe").as_bool(), None);
    }

    #[test]
    fn sqlite_roundtrip_preserves_storage_class() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v)").unwrap();
        for v in [
            PropValue::Integer(-9),
            PropValue::Real(1.25),
            PropValue::Text("icons/a.png".into()),
        ] {
            let _ = conn.execute("DELETE FROM t", []).unwrap();
            let _ = conn.execute("INSERT INTO t (v) VALUES (?1)", [&v]).unwrap();
            let back: PropValue = conn.query_row("SELECT v FROM t", [], |r| r.get(0)).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn null_reads_as_none() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let v: Option<PropValue> = conn.query_row("SELECT NULL", [], |r| r.get(0)).unwrap();
        assert!(v.is_none());
    }

    #[test]
    fn serde_is_untagged() {
        let json = serde_json::to_string(&PropValue::Integer(3)).unwrap();
        assert_eq!(json, "3");
        let back: PropValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(back, PropValue::from("x"));
    }
}
