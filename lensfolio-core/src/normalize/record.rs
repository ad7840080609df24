//! Tolerant field access over a raw JSON record

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::helper::from_millis;

/// Read-only view of one raw record with lenient typed getters.
///
/// Every getter treats `null`, a missing key and a wrongly typed value the
/// same way: as absent.
pub(crate) struct Record<'a>(pub &'a Map<String, Value>);

impl<'a> Record<'a> {
    pub fn has(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Non-blank string value
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.value(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn first_str(&self, keys: &[&str]) -> Option<&'a str> {
        keys.iter().find_map(|k| self.str(k))
    }

    /// Identifier that may be stored as a string or a number
    pub fn id(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        match self.value(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(Value::as_bool)
    }

    /// Tags stored as an array, or as a comma-separated string
    pub fn tags(&self, key: &str) -> Vec<String> {
        match self.value(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(joined)) => joined.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    pub fn time(&self, key: &str) -> Option<DateTime<Utc>> {
        parse_time(self.value(key)?)
    }

    pub fn first_time(&self, keys: &[&str]) -> Option<DateTime<Utc>> {
        keys.iter().find_map(|k| self.time(k))
    }
}

/// RFC 3339 string, or unix milliseconds as number or numeric string.
pub(crate) fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| s.trim().parse::<i64>().ok().and_then(from_millis)),
        Value::Number(n) => n.as_i64().and_then(from_millis),
        _ => None,
    }
}
