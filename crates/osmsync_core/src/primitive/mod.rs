//! Primitives: nodes, ways, relations and changesets.

mod body;
mod changeset;
mod versioned;

pub use body::{Body, Member, NodeBody, RelationBody, WayBody};
pub use changeset::Changeset;
pub use versioned::{HistoryMap, Revision, Versioned};

use crate::attrs::{Attributes, Tags};
use crate::error::{CoreError, CoreResult};
use crate::id::IdAllocator;
use crate::kind::PrimitiveKind;

/// A node.
pub type Node = Versioned<NodeBody>;
/// A way.
pub type Way = Versioned<WayBody>;
/// A relation.
pub type Relation = Versioned<RelationBody>;

impl Versioned<NodeBody> {
    /// Creates a node at the given position.
    pub fn node(id: i64, lat: f64, lon: f64) -> Self {
        Self::new(id, NodeBody::at(lat, lon))
    }

    /// Creates a local node with a placeholder id.
    pub fn new_node(alloc: &mut IdAllocator, lat: f64, lon: f64) -> Self {
        Self::placeholder(alloc, NodeBody::at(lat, lon))
    }

    /// Latitude.
    pub fn lat(&self) -> Option<f64> {
        self.body.lat
    }

    /// Longitude.
    pub fn lon(&self) -> Option<f64> {
        self.body.lon
    }

    /// Moves the node.
    pub fn set_position(&mut self, lat: f64, lon: f64) {
        self.body = NodeBody::at(lat, lon);
    }
}

impl Versioned<WayBody> {
    /// Creates a way over the given node ids.
    pub fn way(id: i64, nds: impl IntoIterator<Item = i64>) -> Self {
        Self::new(
            id,
            WayBody {
                nds: nds.into_iter().collect(),
            },
        )
    }

    /// Creates a local way with a placeholder id.
    pub fn new_way(alloc: &mut IdAllocator, nds: impl IntoIterator<Item = i64>) -> Self {
        Self::placeholder(
            alloc,
            WayBody {
                nds: nds.into_iter().collect(),
            },
        )
    }

    /// Node ids, in order.
    pub fn nds(&self) -> &[i64] {
        &self.body.nds
    }

    /// Returns true if the way references node `id`.
    pub fn contains_node(&self, id: i64) -> bool {
        self.body.nds.contains(&id)
    }

    /// Returns true if the first and last node are the same.
    pub fn is_closed(&self) -> bool {
        self.body.nds.len() > 1 && self.body.nds.first() == self.body.nds.last()
    }
}

impl Versioned<RelationBody> {
    /// Creates a relation with the given members.
    pub fn relation(id: i64, members: impl IntoIterator<Item = Member>) -> Self {
        Self::new(
            id,
            RelationBody {
                members: members.into_iter().collect(),
            },
        )
    }

    /// Creates a local relation with a placeholder id.
    pub fn new_relation(
        alloc: &mut IdAllocator,
        members: impl IntoIterator<Item = Member>,
    ) -> Self {
        Self::placeholder(
            alloc,
            RelationBody {
                members: members.into_iter().collect(),
            },
        )
    }

    /// Members, in order.
    pub fn members(&self) -> &[Member] {
        &self.body.members
    }

    /// Returns true if `(kind, id)` is a member.
    pub fn has_member(&self, kind: PrimitiveKind, id: i64) -> bool {
        self.body
            .members
            .iter()
            .any(|m| m.kind == kind && m.ref_id == id)
    }
}

/// Any primitive. Document, diff and codec match on this exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// A node.
    Node(Node),
    /// A way.
    Way(Way),
    /// A relation.
    Relation(Relation),
    /// A changeset.
    Changeset(Changeset),
}

impl Primitive {
    /// Kind of the wrapped primitive.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Node(_) => PrimitiveKind::Node,
            Primitive::Way(_) => PrimitiveKind::Way,
            Primitive::Relation(_) => PrimitiveKind::Relation,
            Primitive::Changeset(_) => PrimitiveKind::Changeset,
        }
    }

    /// Id, if assigned. Versioned primitives always have one.
    pub fn id(&self) -> Option<i64> {
        match self {
            Primitive::Node(p) => Some(p.id),
            Primitive::Way(p) => Some(p.id),
            Primitive::Relation(p) => Some(p.id),
            Primitive::Changeset(c) => c.id,
        }
    }

    /// Version, for versioned primitives that have one.
    pub fn version(&self) -> Option<u64> {
        match self {
            Primitive::Node(p) => p.version,
            Primitive::Way(p) => p.version,
            Primitive::Relation(p) => p.version,
            Primitive::Changeset(_) => None,
        }
    }

    /// Tags.
    pub fn tags(&self) -> &Tags {
        match self {
            Primitive::Node(p) => &p.tags,
            Primitive::Way(p) => &p.tags,
            Primitive::Relation(p) => &p.tags,
            Primitive::Changeset(c) => &c.tags,
        }
    }

    /// Mutable tags.
    pub fn tags_mut(&mut self) -> &mut Tags {
        match self {
            Primitive::Node(p) => &mut p.tags,
            Primitive::Way(p) => &mut p.tags,
            Primitive::Relation(p) => &mut p.tags,
            Primitive::Changeset(c) => &mut c.tags,
        }
    }

    /// Secondary attributes.
    pub fn attrs(&self) -> &Attributes {
        match self {
            Primitive::Node(p) => &p.attrs,
            Primitive::Way(p) => &p.attrs,
            Primitive::Relation(p) => &p.attrs,
            Primitive::Changeset(c) => &c.attrs,
        }
    }

    /// Mutable secondary attributes.
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        match self {
            Primitive::Node(p) => &mut p.attrs,
            Primitive::Way(p) => &mut p.attrs,
            Primitive::Relation(p) => &mut p.attrs,
            Primitive::Changeset(c) => &mut c.attrs,
        }
    }

    /// Merges history of two primitives of the same kind and id.
    ///
    /// Kinds must match, otherwise this fails with `IdentityMismatch`.
    /// Changesets have no history and fail with `InvalidPrimitiveKind`.
    pub fn merge_history(&mut self, other: &mut Primitive) -> CoreResult<Primitive> {
        match (self, other) {
            (Primitive::Node(a), Primitive::Node(b)) => a.merge_history(b).map(Primitive::Node),
            (Primitive::Way(a), Primitive::Way(b)) => a.merge_history(b).map(Primitive::Way),
            (Primitive::Relation(a), Primitive::Relation(b)) => {
                a.merge_history(b).map(Primitive::Relation)
            }
            (Primitive::Changeset(_), Primitive::Changeset(_)) => Err(CoreError::invalid_kind(
                PrimitiveKind::Changeset,
                "merge history",
            )),
            (a, b) => Err(CoreError::IdentityMismatch {
                kind: a.kind(),
                id: a.id().unwrap_or_default(),
                other_kind: b.kind(),
                other_id: b.id().unwrap_or_default(),
            }),
        }
    }

    /// Marks the primitive as deleted on the server (`visible=false`).
    pub fn mark_deleted(&mut self) {
        self.attrs_mut().set_visible(false);
    }

    /// Sets version and changeset after a successful write and restarts
    /// history at the new version.
    pub fn record_write(&mut self, version: u64, changeset: i64) -> CoreResult<()> {
        match self {
            Primitive::Node(p) => apply_write(p, version, changeset),
            Primitive::Way(p) => apply_write(p, version, changeset),
            Primitive::Relation(p) => apply_write(p, version, changeset),
            Primitive::Changeset(_) => {
                return Err(CoreError::invalid_kind(PrimitiveKind::Changeset, "record write"))
            }
        }
        Ok(())
    }

    /// Sets the id. Changeset ids cannot be reassigned this way.
    pub fn set_id(&mut self, id: i64) -> CoreResult<()> {
        match self {
            Primitive::Node(p) => p.id = id,
            Primitive::Way(p) => p.id = id,
            Primitive::Relation(p) => p.id = id,
            Primitive::Changeset(_) => {
                return Err(CoreError::invalid_kind(PrimitiveKind::Changeset, "set id"))
            }
        }
        Ok(())
    }

    /// Rewrites references to `(kind, old)` so they point at `new`.
    pub fn remap_reference(&mut self, kind: PrimitiveKind, old: i64, new: i64) -> bool {
        match self {
            Primitive::Node(p) => p.body.remap_reference(kind, old, new),
            Primitive::Way(p) => p.body.remap_reference(kind, old, new),
            Primitive::Relation(p) => p.body.remap_reference(kind, old, new),
            Primitive::Changeset(_) => false,
        }
    }
}

fn apply_write<B: Body>(p: &mut Versioned<B>, version: u64, changeset: i64) {
    p.version = Some(version);
    p.attrs.set_changeset(changeset);
    p.reset_history();
}

impl From<Node> for Primitive {
    fn from(p: Node) -> Self {
        Primitive::Node(p)
    }
}

impl From<Way> for Primitive {
    fn from(p: Way) -> Self {
        Primitive::Way(p)
    }
}

impl From<Relation> for Primitive {
    fn from(p: Relation) -> Self {
        Primitive::Relation(p)
    }
}

impl From<Changeset> for Primitive {
    fn from(c: Changeset) -> Self {
        Primitive::Changeset(c)
    }
}

impl TryFrom<Primitive> for Node {
    type Error = CoreError;

    fn try_from(p: Primitive) -> Result<Self, Self::Error> {
        match p {
            Primitive::Node(n) => Ok(n),
            other => Err(CoreError::type_mismatch(PrimitiveKind::Node, other.kind())),
        }
    }
}

impl TryFrom<Primitive> for Way {
    type Error = CoreError;

    fn try_from(p: Primitive) -> Result<Self, Self::Error> {
        match p {
            Primitive::Way(w) => Ok(w),
            other => Err(CoreError::type_mismatch(PrimitiveKind::Way, other.kind())),
        }
    }
}

impl TryFrom<Primitive> for Relation {
    type Error = CoreError;

    fn try_from(p: Primitive) -> Result<Self, Self::Error> {
        match p {
            Primitive::Relation(r) => Ok(r),
            other => Err(CoreError::type_mismatch(PrimitiveKind::Relation, other.kind())),
        }
    }
}

impl TryFrom<Primitive> for Changeset {
    type Error = CoreError;

    fn try_from(p: Primitive) -> Result<Self, Self::Error> {
        match p {
            Primitive::Changeset(c) => Ok(c),
            other => Err(CoreError::type_mismatch(PrimitiveKind::Changeset, other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_per_kind() {
        let mut alloc = IdAllocator::new();
        let n1 = Node::new_node(&mut alloc, 0.0, 0.0);
        let n2 = Node::new_node(&mut alloc, 0.0, 0.0);
        let w1 = Way::new_way(&mut alloc, [n1.id, n2.id]);
        assert_eq!(n1.id, -1);
        assert_eq!(n2.id, -2);
        assert_eq!(w1.id, -1);
        assert!(w1.is_placeholder());
        assert!(w1.contains_node(-2));
        assert!(!w1.is_closed());
    }

    #[test]
    fn relation_membership() {
        let rel = Relation::relation(
            1,
            [
                Member::new(PrimitiveKind::Way, 10, "outer"),
                Member::new(PrimitiveKind::Node, 3, "label"),
            ],
        );
        assert!(rel.has_member(PrimitiveKind::Way, 10));
        assert!(!rel.has_member(PrimitiveKind::Node, 10));
    }

    #[test]
    fn try_from_reports_type_mismatch() {
        let p = Primitive::from(Way::way(1, [1, 2, 1]));
        let err = Node::try_from(p.clone()).unwrap_err();
        assert_eq!(
            err,
            CoreError::type_mismatch(PrimitiveKind::Node, PrimitiveKind::Way)
        );
        assert!(Way::try_from(p).unwrap().is_closed());
    }

    #[test]
    fn merging_different_kinds_fails() {
        let mut a = Primitive::from(Node::node(1, 0.0, 0.0).with_version(1));
        let mut b = Primitive::from(Way::way(1, []).with_version(1));
        assert!(matches!(
            a.merge_history(&mut b),
            Err(CoreError::IdentityMismatch {
                kind: PrimitiveKind::Node,
                other_kind: PrimitiveKind::Way,
                ..
            })
        ));
    }

    #[test]
    fn record_write_restarts_history() {
        let mut a = Node::node(8, 1.0, 1.0).with_version(1);
        let mut b = Node::node(8, 1.0, 1.5).with_version(2);
        a.merge_history(&mut b).unwrap();

        let mut p = Primitive::from(b);
        p.record_write(3, 77).unwrap();
        let Primitive::Node(n) = &p else { unreachable!() };
        assert_eq!(n.version, Some(3));
        assert_eq!(n.attrs.changeset(), Some(77));
        assert_eq!(n.history_versions(), vec![3]);
        assert!(Primitive::from(Changeset::default()).record_write(1, 1).is_err());
    }
}
