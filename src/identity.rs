//! Record identity and duplicate suppression
//!
//! A record's identity key is the first present field of
//! [`IDENTITY_FIELDS`], prefixed with the field name so that `id:123` and
//! `provider_id:123` never collide. Records with none of those fall back to
//! `name|headline|location`. Records with no derivable key are always
//! admitted: dropping them could lose data, duplicates of them are tolerated.

use crate::types::Record;
use serde_json::Value;
use std::collections::HashSet;

/// Identity fields, in priority order
pub const IDENTITY_FIELDS: [&str; 5] = [
    "public_identifier",
    "id",
    "provider_id",
    "public_profile_url",
    "profile_url",
];

/// Fields joined into the fallback key
pub const FALLBACK_FIELDS: [&str; 3] = ["name", "headline", "location"];

/// Derive the identity key of a record, if it has one
pub fn identity_key(record: &Record) -> Option<String> {
    let obj = record.as_object()?;

    for field in IDENTITY_FIELDS {
        if let Some(value) = obj.get(field).and_then(key_text) {
            return Some(format!("{field}:{value}"));
        }
    }

    let parts: Vec<String> = FALLBACK_FIELDS
        .iter()
        .map(|field| obj.get(*field).and_then(key_text).unwrap_or_default())
        .collect();

    if parts.iter().all(String::is_empty) {
        return None;
    }

    Some(format!("fallback:{}", parts.join("|")))
}

/// Textual form of an identity value, or `None` when the value counts as absent
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// What the dedup filter decided for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First sighting of this key
    New(String),
    /// No identity could be derived; admitted unconditionally
    Unkeyed,
    /// Key already seen this fetch
    Duplicate(String),
}

impl Admission {
    /// Whether the record should be appended to the results
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Duplicate(_))
    }
}

/// Identity keys admitted so far in one logical fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenKeys {
    keys: HashSet<String>,
}

impl SeenKeys {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the set from records that were already admitted
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let keys = records.into_iter().filter_map(identity_key).collect();
        Self { keys }
    }

    /// Decide whether `record` is new, recording its key if so
    pub fn admit(&mut self, record: &Record) -> Admission {
        match identity_key(record) {
            None => Admission::Unkeyed,
            Some(key) => {
                if self.keys.contains(&key) {
                    Admission::Duplicate(key)
                } else {
                    self.keys.insert(key.clone());
                    Admission::New(key)
                }
            }
        }
    }

    /// Check a key without recording it
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
