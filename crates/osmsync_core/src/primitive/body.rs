//! Kind-specific payloads of versioned primitives.

use crate::id::IdAllocator;
use crate::kind::PrimitiveKind;
use std::fmt;

/// Payload carried by a versioned primitive.
///
/// The payload is part of structural equality: coordinates for nodes,
/// the ordered node list for ways, the ordered member list for relations.
pub trait Body: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Kind of primitive carrying this payload.
    const KIND: PrimitiveKind;

    /// Draws the next placeholder id for this kind.
    fn allocate_id(alloc: &mut IdAllocator) -> i64;

    /// Rewrites references to `(kind, old)` so they point at `new`.
    ///
    /// Returns true if anything changed.
    fn remap_reference(&mut self, _kind: PrimitiveKind, _old: i64, _new: i64) -> bool {
        false
    }
}

/// Coordinates of a node. Either may be absent on delete payloads.
///
/// Equality treats two NaN coordinates as equal so that every node
/// compares equal to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeBody {
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lon: Option<f64>,
}

impl NodeBody {
    /// Creates a positioned node payload.
    pub fn at(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
        }
    }
}

impl PartialEq for NodeBody {
    fn eq(&self, other: &Self) -> bool {
        same_coordinate(self.lat, other.lat) && same_coordinate(self.lon, other.lon)
    }
}

fn same_coordinate(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
        (None, None) => true,
        _ => false,
    }
}

impl Body for NodeBody {
    const KIND: PrimitiveKind = PrimitiveKind::Node;

    fn allocate_id(alloc: &mut IdAllocator) -> i64 {
        alloc.next_node_id()
    }
}

/// Ordered node references of a way. Ids may repeat; a closed way repeats
/// its first node as its last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WayBody {
    /// Referenced node ids, in order.
    pub nds: Vec<i64>,
}

impl Body for WayBody {
    const KIND: PrimitiveKind = PrimitiveKind::Way;

    fn allocate_id(alloc: &mut IdAllocator) -> i64 {
        alloc.next_way_id()
    }

    fn remap_reference(&mut self, kind: PrimitiveKind, old: i64, new: i64) -> bool {
        if kind != PrimitiveKind::Node {
            return false;
        }
        let mut changed = false;
        for nd in self.nds.iter_mut().filter(|nd| **nd == old) {
            *nd = new;
            changed = true;
        }
        changed
    }
}

/// A relation member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Kind of the referenced primitive.
    pub kind: PrimitiveKind,
    /// Id of the referenced primitive.
    pub ref_id: i64,
    /// Role of the member within the relation. May be empty.
    pub role: String,
}

impl Member {
    /// Creates a member.
    pub fn new(kind: PrimitiveKind, ref_id: i64, role: impl Into<String>) -> Self {
        Self {
            kind,
            ref_id,
            role: role.into(),
        }
    }
}

/// Ordered members of a relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationBody {
    /// Members, in order.
    pub members: Vec<Member>,
}

impl Body for RelationBody {
    const KIND: PrimitiveKind = PrimitiveKind::Relation;

    fn allocate_id(alloc: &mut IdAllocator) -> i64 {
        alloc.next_relation_id()
    }

    fn remap_reference(&mut self, kind: PrimitiveKind, old: i64, new: i64) -> bool {
        let mut changed = false;
        for member in self
            .members
            .iter_mut()
            .filter(|m| m.kind == kind && m.ref_id == old)
        {
            member.ref_id = new;
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_equality_is_reflexive() {
        let nan = NodeBody::at(f64::NAN, 1.0);
        assert_eq!(nan, nan);
        assert_ne!(nan, NodeBody::at(0.0, 1.0));
        assert_ne!(NodeBody::at(1.0, 1.0), NodeBody { lat: Some(1.0), lon: None });
        assert_eq!(NodeBody::at(0.0, 2.0), NodeBody::at(-0.0, 2.0));
    }

    #[test]
    fn way_remaps_only_node_refs() {
        let mut body = WayBody {
            nds: vec![-1, 5, -1],
        };
        assert!(!body.remap_reference(PrimitiveKind::Way, -1, 10));
        assert!(body.remap_reference(PrimitiveKind::Node, -1, 10));
        assert_eq!(body.nds, vec![10, 5, 10]);
    }

    #[test]
    fn relation_remaps_matching_kind() {
        let mut body = RelationBody {
            members: vec![
                Member::new(PrimitiveKind::Node, -1, "stop"),
                Member::new(PrimitiveKind::Way, -1, ""),
            ],
        };
        assert!(body.remap_reference(PrimitiveKind::Way, -1, 77));
        assert_eq!(body.members[0].ref_id, -1);
        assert_eq!(body.members[1].ref_id, 77);
    }
}
