//! Changeset handles.

use crate::attrs::{AttrValue, Attributes, Tags};

/// A changeset: the administrative grouping a batch of writes is
/// attributed to. Changesets are not versioned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    /// Server id, `None` until the changeset has been created remotely.
    pub id: Option<i64>,
    /// Attributes (`open`, `user`, `uid`, `created_at`, bounding box...).
    pub attrs: Attributes,
    /// Tags (`comment`, `created_by`...).
    pub tags: Tags,
}

impl Changeset {
    /// Creates a changeset that has not been opened yet.
    pub fn new(tags: Tags) -> Self {
        Self {
            id: None,
            attrs: Attributes::new(),
            tags,
        }
    }

    /// Creates a handle to an existing changeset.
    pub fn with_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Sets the `comment` tag.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.tags.insert("comment".into(), comment.into());
        self
    }

    /// Whether the server reports the changeset as open.
    pub fn is_open(&self) -> Option<bool> {
        self.attrs.get("open").and_then(AttrValue::as_bool)
    }

    /// Bounding box as `(min_lat, min_lon, max_lat, max_lon)`, when known.
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        let get = |key| self.attrs.get(key).and_then(AttrValue::as_float);
        Some((
            get("min_lat")?,
            get("min_lon")?,
            get("max_lat")?,
            get("max_lon")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_needs_all_fields() {
        let mut cs = Changeset::with_id(3);
        cs.attrs.insert("min_lat", 1.0);
        cs.attrs.insert("min_lon", 2.0);
        cs.attrs.insert("max_lat", 3.0);
        assert_eq!(cs.bbox(), None);
        cs.attrs.insert("max_lon", 4.0);
        assert_eq!(cs.bbox(), Some((1.0, 2.0, 3.0, 4.0)));
    }

    #[test]
    fn comment_and_open() {
        let mut cs = Changeset::new(Tags::new()).with_comment("fix names");
        assert_eq!(cs.tags["comment"], "fix names");
        assert_eq!(cs.is_open(), None);
        cs.attrs.insert("open", true);
        assert_eq!(cs.is_open(), Some(true));
    }
}
