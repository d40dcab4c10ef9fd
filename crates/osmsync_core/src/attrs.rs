//! Typed attributes and tags.
//!
//! Attributes are an open-ended key/value map. A handful of reserved keys
//! are typed on parse and re-stringified on serialize; every other key is
//! kept as an opaque string.

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;
use std::fmt;

/// Tags of a primitive. A `BTreeMap` keeps serialization in key order.
pub type Tags = BTreeMap<String, String>;

/// Attribute keys parsed as integers.
pub const INTEGER_KEYS: [&str; 5] = ["id", "version", "changeset", "uid", "ref"];

/// Attribute keys parsed as floats.
pub const FLOAT_KEYS: [&str; 6] = ["lat", "lon", "min_lat", "min_lon", "max_lat", "max_lon"];

/// Attribute keys parsed as booleans.
pub const BOOL_KEYS: [&str; 2] = ["open", "visible"];

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Integer attribute (`id`, `version`, `changeset`, `uid`, `ref`).
    Integer(i64),
    /// Float attribute (coordinates and bounding box fields).
    Float(f64),
    /// Boolean attribute (`open`, `visible`).
    Bool(bool),
    /// Any other attribute.
    Text(String),
}

impl AttrValue {
    /// Parses raw wire text according to the type declared for `key`.
    ///
    /// Booleans follow the wire convention: only `"true"` is true.
    pub fn parse(key: &str, raw: &str) -> CoreResult<Self> {
        if INTEGER_KEYS.contains(&key) {
            raw.trim()
                .parse()
                .map(AttrValue::Integer)
                .map_err(|_| CoreError::invalid_attribute(key, raw))
        } else if FLOAT_KEYS.contains(&key) {
            raw.trim()
                .parse()
                .map(AttrValue::Float)
                .map_err(|_| CoreError::invalid_attribute(key, raw))
        } else if BOOL_KEYS.contains(&key) {
            Ok(AttrValue::Bool(raw == "true"))
        } else {
            Ok(AttrValue::Text(raw.to_string()))
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float value, if this is a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Integer(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Integer(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// Secondary attributes of a primitive.
///
/// Identity (`id`, `version`) and geometry (`lat`, `lon`) live in typed
/// fields on the primitive itself; this map holds the rest (`changeset`,
/// `visible`, `user`, `uid`, `timestamp`, bounding boxes, unknown keys).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    /// Creates an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a sequence of raw wire attributes.
    pub fn from_wire<'a, I>(raw: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut attrs = Self::new();
        for (key, value) in raw {
            attrs.insert(key, AttrValue::parse(key, value)?);
        }
        Ok(attrs)
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    /// Inserts a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Option<AttrValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.0.remove(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Changeset the primitive was last written in.
    pub fn changeset(&self) -> Option<i64> {
        self.get("changeset").and_then(AttrValue::as_integer)
    }

    /// Sets the changeset id.
    pub fn set_changeset(&mut self, changeset: i64) {
        self.insert("changeset", changeset);
    }

    /// Visibility flag. Absent means visible.
    pub fn visible(&self) -> Option<bool> {
        self.get("visible").and_then(AttrValue::as_bool)
    }

    /// Sets the visibility flag.
    pub fn set_visible(&mut self, visible: bool) {
        self.insert("visible", visible);
    }

    /// Id of the last editor.
    pub fn uid(&self) -> Option<i64> {
        self.get("uid").and_then(AttrValue::as_integer)
    }

    /// Name of the last editor.
    pub fn user(&self) -> Option<&str> {
        self.get("user").and_then(AttrValue::as_text)
    }

    /// Timestamp of the last edit, as sent by the server.
    pub fn timestamp(&self) -> Option<&str> {
        self.get("timestamp").and_then(AttrValue::as_text)
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a AttrValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_are_typed() {
        assert_eq!(AttrValue::parse("uid", "42").unwrap(), AttrValue::Integer(42));
        assert_eq!(AttrValue::parse("ref", "-3").unwrap(), AttrValue::Integer(-3));
        assert_eq!(AttrValue::parse("max_lat", "51.5").unwrap(), AttrValue::Float(51.5));
        assert_eq!(AttrValue::parse("visible", "true").unwrap(), AttrValue::Bool(true));
        assert_eq!(AttrValue::parse("open", "yes").unwrap(), AttrValue::Bool(false));
        assert_eq!(
            AttrValue::parse("user", "mapper").unwrap(),
            AttrValue::Text("mapper".into())
        );
    }

    #[test]
    fn bad_integer_is_rejected() {
        let err = AttrValue::parse("changeset", "abc").unwrap_err();
        assert_eq!(err, CoreError::invalid_attribute("changeset", "abc"));
    }

    #[test]
    fn display_restringifies() {
        assert_eq!(AttrValue::Bool(false).to_string(), "false");
        assert_eq!(AttrValue::Integer(-5).to_string(), "-5");
        assert_eq!(AttrValue::Float(0.25).to_string(), "0.25");
    }

    #[test]
    fn typed_accessors() {
        let attrs = Attributes::from_wire([
            ("changeset", "99"),
            ("visible", "false"),
            ("user", "alice"),
            ("timestamp", "2010-01-01T00:00:00Z"),
        ])
        .unwrap();
        assert_eq!(attrs.changeset(), Some(99));
        assert_eq!(attrs.visible(), Some(false));
        assert_eq!(attrs.user(), Some("alice"));
        assert_eq!(attrs.uid(), None);
        assert_eq!(attrs.timestamp(), Some("2010-01-01T00:00:00Z"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn integers_restringify(v in any::<i64>()) {
                let parsed = AttrValue::parse("uid", &v.to_string()).unwrap();
                prop_assert_eq!(parsed.to_string(), v.to_string());
            }

            #[test]
            fn floats_restringify(v in -1.0e6..1.0e6f64) {
                let parsed = AttrValue::parse("lat", &v.to_string()).unwrap();
                prop_assert_eq!(parsed, AttrValue::Float(v));
            }

            #[test]
            fn unknown_keys_stay_text(key in "[a-z_]{1,10}", raw in "[ -~]{0,16}") {
                prop_assume!(!INTEGER_KEYS.contains(&key.as_str()));
                prop_assume!(!FLOAT_KEYS.contains(&key.as_str()));
                prop_assume!(!BOOL_KEYS.contains(&key.as_str()));
                prop_assert_eq!(AttrValue::parse(&key, &raw).unwrap(), AttrValue::Text(raw));
            }
        }
    }
}
