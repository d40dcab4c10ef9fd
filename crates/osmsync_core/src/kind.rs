//! Primitive kinds.

use std::fmt;
use std::str::FromStr;

/// The four kinds of OSM element handled by osmsync.
///
/// Node, way and relation are versioned primitives. Changesets are
/// administrative and carry no history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveKind {
    /// A point.
    Node,
    /// An ordered list of node references.
    Way,
    /// An ordered list of typed members.
    Relation,
    /// A changeset grouping a batch of writes.
    Changeset,
}

impl PrimitiveKind {
    /// Versioned kinds, in document iteration order.
    pub const VERSIONED: [PrimitiveKind; 3] =
        [PrimitiveKind::Node, PrimitiveKind::Way, PrimitiveKind::Relation];

    /// Returns the wire element name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Node => "node",
            PrimitiveKind::Way => "way",
            PrimitiveKind::Relation => "relation",
            PrimitiveKind::Changeset => "changeset",
        }
    }

    /// Returns true for node, way and relation.
    pub fn is_versioned(&self) -> bool {
        !matches!(self, PrimitiveKind::Changeset)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown primitive kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for PrimitiveKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(PrimitiveKind::Node),
            "way" => Ok(PrimitiveKind::Way),
            "relation" => Ok(PrimitiveKind::Relation),
            "changeset" => Ok(PrimitiveKind::Changeset),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}
