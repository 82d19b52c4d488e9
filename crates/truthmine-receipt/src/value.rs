//! Typed claim values and the ordered claim map.
//!
//! Claims form a tree: scalar leaves (string, integer, float, bool,
//! timestamp) plus lists and nested maps. The map preserves document
//! order and tolerates duplicate keys until validation, so structural
//! checks can actually observe duplicates from the wire.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single typed claim value.
///
/// JSON has no timestamp type; strings that parse as RFC 3339 deserialize
/// as [`ClaimValue::Timestamp`] and serialize back to RFC 3339, so the
/// mapping is deterministic in both directions.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// IEEE-754 double. Non-finite values are rejected at encoding time.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// RFC 3339 instant, normalized to UTC.
    Timestamp(DateTime<Utc>),
    /// Ordered list of values.
    List(Vec<ClaimValue>),
    /// Nested claim map.
    Map(ClaimMap),
}

impl ClaimValue {
    /// Short name of this value's type, for diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Borrow this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<i64> for ClaimValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for ClaimValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// An insertion-ordered mapping from claim name to value.
///
/// Unlike a `BTreeMap`, duplicate keys survive construction and
/// deserialization. [`ClaimMap::duplicate_key`] reports the first
/// duplicate (at any depth); callers reject such maps before trusting
/// lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimMap {
    entries: Vec<(String, ClaimValue)>,
}

impl ClaimMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry, preserving insertion order. Does not check for
    /// duplicates.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ClaimValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the first value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ClaimValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Find the first duplicated key at any nesting depth.
    #[must_use]
    pub fn duplicate_key(&self) -> Option<&str> {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|(k, _)| k == key) {
                return Some(key);
            }
            if let Some(dup) = value_duplicate_key(value) {
                return Some(dup);
            }
        }
        None
    }

    /// Resolve a dot-separated path (`env.model`) against nested maps.
    ///
    /// Returns `None` when any segment is absent or a non-map value is
    /// traversed into.
    #[must_use]
    pub fn lookup_path(&self, path: &str) -> Option<&ClaimValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.get(first)?;
        for segment in segments {
            match current {
                ClaimValue::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }
}

fn value_duplicate_key(value: &ClaimValue) -> Option<&str> {
    match value {
        ClaimValue::Map(map) => map.duplicate_key(),
        ClaimValue::List(items) => items.iter().find_map(value_duplicate_key),
        _ => None,
    }
}

impl FromIterator<(String, ClaimValue)> for ClaimMap {
    fn from_iter<I: IntoIterator<Item = (String, ClaimValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ── serde ────────────────────────────────────────────────────────────

impl Serialize for ClaimValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Timestamp(t) => serializer.serialize_str(&t.to_rfc3339()),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ClaimValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ClaimValueVisitor)
    }
}

struct ClaimValueVisitor;

impl<'de> Visitor<'de> for ClaimValueVisitor {
    type Value = ClaimValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a claim value (bool, number, string, list, or map)")
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(ClaimValue::Bool(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ClaimValue::Int(v))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(ClaimValue::Int)
            .map_err(|_| E::custom(format!("integer claim out of range: {v}")))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ClaimValue::Float(v))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(DateTime::parse_from_rfc3339(v).map_or_else(
            |_| ClaimValue::String(v.to_owned()),
            |t| ClaimValue::Timestamp(t.with_timezone(&Utc)),
        ))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ClaimValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        ClaimMapVisitor.visit_map(map).map(ClaimValue::Map)
    }
}

impl Serialize for ClaimMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClaimMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ClaimMapVisitor)
    }
}

struct ClaimMapVisitor;

impl<'de> Visitor<'de> for ClaimMapVisitor {
    type Value = ClaimMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a claim map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, ClaimValue>()? {
            entries.push((key, value));
        }
        Ok(ClaimMap { entries })
    }
}
