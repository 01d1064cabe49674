//! Point-in-time snapshots of directory entries.
//!
//! An [`AttributeCollection`] is what one search returns for one entry: its
//! distinguished name, its GUID and a case-insensitive map of raw attribute
//! values. Collections are never mutated in place. The `with_*` methods return a
//! new snapshot, which is how the in-memory transport models a directory write.
//!
//! # Example
//!
//! ```rust
//! use ad_directory::attributes::{AttributeCollection, AttributeValue};
//!
//! let entry = AttributeCollection::builder("CN=jdoe,OU=Staff,DC=example,DC=com")
//!     .attribute("sAMAccountName", "jdoe")
//!     .attribute("logonCount", 12i64)
//!     .build();
//!
//! assert_eq!(entry.get_string("samaccountname").as_deref(), Some("jdoe"));
//! assert_eq!(entry.get_int("logonCount"), Some(12));
//! assert!(entry.get("mail").is_none());
//! ```

pub mod time;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Attribute holding the entry's distinguished name.
pub const DISTINGUISHED_NAME: &str = "distinguishedName";

/// Attribute holding the entry's 16-byte GUID.
pub const OBJECT_GUID: &str = "objectGUID";

/// One raw attribute value as returned by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
    Multi(Vec<AttributeValue>),
}

impl AttributeValue {
    /// The individual values: the list for multi-valued attributes, otherwise
    /// a one-element slice.
    pub fn values(&self) -> &[AttributeValue] {
        match self {
            AttributeValue::Multi(values) => values,
            single => std::slice::from_ref(single),
        }
    }

    /// The first individual value.
    pub fn first(&self) -> Option<&AttributeValue> {
        self.values().first()
    }

    /// Render a single value as directory text.
    ///
    /// Booleans render as `TRUE`/`FALSE`, datetimes as generalized time and
    /// binary values only when they hold UTF-8.
    pub fn to_text(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Integer(i) => Some(i.to_string()),
            AttributeValue::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            AttributeValue::DateTime(dt) => Some(time::to_generalized_time(*dt)),
            AttributeValue::Binary(bytes) => String::from_utf8(bytes.clone()).ok(),
            AttributeValue::Multi(values) => values.first().and_then(AttributeValue::to_text),
        }
    }

    fn to_long(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::String(s) => s.trim().parse().ok(),
            AttributeValue::Boolean(b) => Some(i64::from(*b)),
            AttributeValue::Multi(values) => values.first().and_then(AttributeValue::to_long),
            _ => None,
        }
    }

    fn to_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            AttributeValue::Integer(i) => Some(*i != 0),
            AttributeValue::String(s) => match s.trim().to_ascii_uppercase().as_str() {
                "TRUE" | "1" => Some(true),
                "FALSE" | "0" => Some(false),
                _ => None,
            },
            AttributeValue::Multi(values) => values.first().and_then(AttributeValue::to_bool),
            _ => None,
        }
    }

    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::DateTime(dt) => Some(*dt),
            AttributeValue::Integer(i) => time::filetime_to_datetime(*i),
            AttributeValue::String(s) => time::parse_timestamp_text(s),
            AttributeValue::Multi(values) => values.first().and_then(AttributeValue::to_datetime),
            _ => None,
        }
    }

    fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Binary(bytes) => Some(bytes),
            AttributeValue::String(s) => Some(s.as_bytes()),
            AttributeValue::Multi(values) => values.first().and_then(AttributeValue::as_bytes),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(i64::from(value))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Binary(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::Multi(values.into_iter().map(AttributeValue::String).collect())
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(values: Vec<&str>) -> Self {
        AttributeValue::Multi(values.into_iter().map(AttributeValue::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct NamedValue {
    name: String,
    value: AttributeValue,
}

/// Immutable snapshot of one directory entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeCollection {
    distinguished_name: String,
    object_guid: Option<Uuid>,
    // keyed by lowercased attribute name
    attributes: BTreeMap<String, NamedValue>,
}

impl AttributeCollection {
    /// Build a snapshot from raw (name, value) pairs.
    ///
    /// The GUID is decoded from `objectGUID` when present (16 bytes in the
    /// directory's little-endian layout, or a textual UUID). Later duplicates of
    /// the same attribute name replace earlier ones.
    pub fn new(
        distinguished_name: impl Into<String>,
        attributes: impl IntoIterator<Item = (String, AttributeValue)>,
    ) -> Self {
        let distinguished_name = distinguished_name.into();
        let mut map = BTreeMap::new();
        for (name, value) in attributes {
            map.insert(name.to_ascii_lowercase(), NamedValue { name, value });
        }
        map.entry(DISTINGUISHED_NAME.to_ascii_lowercase())
            .or_insert_with(|| NamedValue {
                name: DISTINGUISHED_NAME.to_string(),
                value: AttributeValue::String(distinguished_name.clone()),
            });
        let object_guid = map
            .get(&OBJECT_GUID.to_ascii_lowercase())
            .and_then(|named| decode_guid(&named.value));

        Self {
            distinguished_name,
            object_guid,
            attributes: map,
        }
    }

    /// Start a builder for a snapshot of `distinguished_name`.
    pub fn builder(distinguished_name: impl Into<String>) -> AttributeCollectionBuilder {
        AttributeCollectionBuilder {
            distinguished_name: distinguished_name.into(),
            attributes: Vec::new(),
        }
    }

    /// The entry's distinguished name.
    pub fn distinguished_name(&self) -> &str {
        &self.distinguished_name
    }

    /// The entry's GUID, if the snapshot carried one.
    pub fn object_guid(&self) -> Option<Uuid> {
        self.object_guid
    }

    /// Raw value of an attribute (case-insensitive name).
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(|named| &named.value)
    }

    /// Whether the attribute is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(AttributeValue::to_text)
    }

    /// Every value of a multi-valued attribute as text; empty when absent.
    pub fn get_strings(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|value| value.values().iter().filter_map(AttributeValue::to_text).collect())
            .unwrap_or_default()
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get_long(name).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttributeValue::to_long)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttributeValue::to_bool)
    }

    /// Timestamp attribute in UTC. FILETIME zero decodes to 1601-01-01;
    /// "never" decodes to `None`.
    pub fn get_datetime_utc(&self, name: &str) -> Option<DateTime<Utc>> {
        self.get(name).and_then(AttributeValue::to_datetime)
    }

    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(AttributeValue::as_bytes)
    }

    pub fn get_byte_arrays(&self, name: &str) -> Vec<&[u8]> {
        self.get(name)
            .map(|value| value.values().iter().filter_map(AttributeValue::as_bytes).collect())
            .unwrap_or_default()
    }

    /// Attribute names in their original casing, sorted case-insensitively.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.values().map(|named| named.name.as_str())
    }

    /// (name, value) pairs in their original casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes
            .values()
            .map(|named| (named.name.as_str(), &named.value))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// A new snapshot with `name` replaced. An empty multi-value removes it.
    pub fn with_attribute(&self, name: &str, value: AttributeValue) -> Self {
        let mut pairs: Vec<(String, AttributeValue)> = self
            .iter()
            .filter(|(n, _)| !n.eq_ignore_ascii_case(name))
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        let empty = matches!(&value, AttributeValue::Multi(values) if values.is_empty());
        if !empty {
            pairs.push((name.to_string(), value));
        }
        Self::new(self.distinguished_name.clone(), pairs)
    }

    /// A new snapshot at a different distinguished name.
    pub fn with_distinguished_name(&self, distinguished_name: &str) -> Self {
        let pairs = self
            .iter()
            .filter(|(n, _)| !n.eq_ignore_ascii_case(DISTINGUISHED_NAME))
            .map(|(n, v)| (n.to_string(), v.clone()));
        Self::new(distinguished_name, pairs)
    }

    /// A new snapshot holding only the requested attributes.
    ///
    /// The distinguished name and GUID are always kept. An empty request keeps
    /// everything.
    pub fn project(&self, requested: &[String]) -> Self {
        if requested.is_empty() || requested.iter().any(|r| r == "*") {
            return self.clone();
        }
        let pairs = self
            .iter()
            .filter(|(n, _)| {
                n.eq_ignore_ascii_case(OBJECT_GUID)
                    || n.eq_ignore_ascii_case(DISTINGUISHED_NAME)
                    || requested.iter().any(|r| r.eq_ignore_ascii_case(n))
            })
            .map(|(n, v)| (n.to_string(), v.clone()));
        Self::new(self.distinguished_name.clone(), pairs)
    }
}

/// Fluent builder for [`AttributeCollection`].
#[derive(Debug, Clone)]
pub struct AttributeCollectionBuilder {
    distinguished_name: String,
    attributes: Vec<(String, AttributeValue)>,
}

impl AttributeCollectionBuilder {
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Set `objectGUID` from a UUID, stored in the directory's byte order.
    pub fn object_guid(self, guid: Uuid) -> Self {
        self.attribute(OBJECT_GUID, guid.to_bytes_le().to_vec())
    }

    pub fn build(self) -> AttributeCollection {
        AttributeCollection::new(self.distinguished_name, self.attributes)
    }
}

fn decode_guid(value: &AttributeValue) -> Option<Uuid> {
    match value.first()? {
        AttributeValue::Binary(bytes) => {
            let bytes: [u8; 16] = bytes.as_slice().try_into().ok()?;
            Some(Uuid::from_bytes_le(bytes))
        }
        AttributeValue::String(s) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    }
}

mod base64_bytes {
    use super::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
