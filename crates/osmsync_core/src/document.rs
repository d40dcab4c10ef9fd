//! The versioned set of primitives.

use crate::error::{CoreError, CoreResult};
use crate::id::{is_placeholder, IdAllocator};
use crate::kind::PrimitiveKind;
use crate::primitive::{
    Body, Node, NodeBody, Primitive, Relation, RelationBody, Versioned, Way, WayBody,
};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

/// Id mapping produced when a created primitive receives its server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdRemap {
    /// Kind of the created primitive.
    pub kind: PrimitiveKind,
    /// Placeholder id used in the upload.
    pub old_id: i64,
    /// Id assigned by the server.
    pub new_id: i64,
}

/// Kinds that a [`Document`] stores in a keyed map of their own.
pub trait DocumentSlot: Body {
    /// The map holding this kind.
    fn slot(doc: &Document) -> &BTreeMap<i64, Versioned<Self>>;

    /// The map holding this kind, mutably.
    fn slot_mut(doc: &mut Document) -> &mut BTreeMap<i64, Versioned<Self>>;
}

impl DocumentSlot for NodeBody {
    fn slot(doc: &Document) -> &BTreeMap<i64, Node> {
        &doc.nodes
    }

    fn slot_mut(doc: &mut Document) -> &mut BTreeMap<i64, Node> {
        &mut doc.nodes
    }
}

impl DocumentSlot for WayBody {
    fn slot(doc: &Document) -> &BTreeMap<i64, Way> {
        &doc.ways
    }

    fn slot_mut(doc: &mut Document) -> &mut BTreeMap<i64, Way> {
        &mut doc.ways
    }
}

impl DocumentSlot for RelationBody {
    fn slot(doc: &Document) -> &BTreeMap<i64, Relation> {
        &doc.relations
    }

    fn slot_mut(doc: &mut Document) -> &mut BTreeMap<i64, Relation> {
        &mut doc.relations
    }
}

/// Borrowed view of a primitive stored in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveRef<'a> {
    /// A node.
    Node(&'a Node),
    /// A way.
    Way(&'a Way),
    /// A relation.
    Relation(&'a Relation),
}

impl PrimitiveRef<'_> {
    /// Kind of the referenced primitive.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveRef::Node(_) => PrimitiveKind::Node,
            PrimitiveRef::Way(_) => PrimitiveKind::Way,
            PrimitiveRef::Relation(_) => PrimitiveKind::Relation,
        }
    }

    /// Id of the referenced primitive.
    pub fn id(&self) -> i64 {
        match self {
            PrimitiveRef::Node(p) => p.id,
            PrimitiveRef::Way(p) => p.id,
            PrimitiveRef::Relation(p) => p.id,
        }
    }

    /// Version of the referenced primitive.
    pub fn version(&self) -> Option<u64> {
        match self {
            PrimitiveRef::Node(p) => p.version,
            PrimitiveRef::Way(p) => p.version,
            PrimitiveRef::Relation(p) => p.version,
        }
    }

    /// Number of versions recorded in the primitive's history.
    pub fn history_len(&self) -> usize {
        match self {
            PrimitiveRef::Node(p) => p.history_versions().len(),
            PrimitiveRef::Way(p) => p.history_versions().len(),
            PrimitiveRef::Relation(p) => p.history_versions().len(),
        }
    }

    /// Clones into an owned primitive. The clone shares history.
    pub fn to_primitive(&self) -> Primitive {
        match *self {
            PrimitiveRef::Node(p) => Primitive::Node(p.clone()),
            PrimitiveRef::Way(p) => Primitive::Way(p.clone()),
            PrimitiveRef::Relation(p) => Primitive::Relation(p.clone()),
        }
    }
}

/// A mutable set of nodes, ways and relations keyed by `(kind, id)`.
///
/// Adding a primitive whose identity is already present merges the two
/// histories; the highest version becomes the stored representative.
/// Each document owns the [`IdAllocator`] used for its local placeholders.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: BTreeMap<i64, Node>,
    ways: BTreeMap<i64, Way>,
    relations: BTreeMap<i64, Relation>,
    allocator: IdAllocator,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document by adding every primitive in turn.
    pub fn from_primitives(primitives: impl IntoIterator<Item = Primitive>) -> CoreResult<Self> {
        let mut doc = Self::new();
        for primitive in primitives {
            doc.add(primitive)?;
        }
        Ok(doc)
    }

    /// Adds a primitive, merging history with any stored primitive of the
    /// same identity.
    ///
    /// When both carry a version, the incoming primitive's history is
    /// merged into the stored one and the highest version is kept; on a
    /// version tie the stored state wins. Otherwise the incoming
    /// primitive replaces the stored one. Changesets are rejected.
    pub fn add(&mut self, primitive: impl Into<Primitive>) -> CoreResult<()> {
        match primitive.into() {
            Primitive::Node(p) => self.add_versioned(p),
            Primitive::Way(p) => self.add_versioned(p),
            Primitive::Relation(p) => self.add_versioned(p),
            Primitive::Changeset(_) => {
                Err(CoreError::invalid_kind(PrimitiveKind::Changeset, "add to document"))
            }
        }
    }

    /// Typed form of [`Document::add`].
    pub fn add_versioned<B: DocumentSlot>(&mut self, mut incoming: Versioned<B>) -> CoreResult<()> {
        self.allocator.observe(B::KIND, incoming.id);
        match B::slot_mut(self).entry(incoming.id) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => {
                let stored = slot.get_mut();
                let winner = if incoming.version.is_some() && stored.version.is_some() {
                    stored.merge_history(&mut incoming)?
                } else {
                    incoming
                };
                let kind = B::KIND;
                debug!(%kind, id = winner.id, version = ?winner.version, "merged into document");
                slot.insert(winner);
            }
        }
        Ok(())
    }

    /// Stores a primitive under its identity, replacing whatever was there
    /// without merging history. Returns the replaced primitive.
    pub fn insert<B: DocumentSlot>(&mut self, primitive: Versioned<B>) -> Option<Versioned<B>> {
        self.allocator.observe(B::KIND, primitive.id);
        B::slot_mut(self).insert(primitive.id, primitive)
    }

    /// Removes the primitive with the identity of `primitive`, if any.
    ///
    /// Returns whether something was removed.
    pub fn discard(&mut self, primitive: &Primitive) -> CoreResult<bool> {
        let id = match primitive {
            Primitive::Changeset(_) => {
                return Err(CoreError::invalid_kind(
                    PrimitiveKind::Changeset,
                    "discard from document",
                ))
            }
            other => other.id().unwrap_or_default(),
        };
        Ok(self.remove(primitive.kind(), id).is_some())
    }

    /// Removes and returns the primitive stored at `(kind, id)`.
    pub fn remove(&mut self, kind: PrimitiveKind, id: i64) -> Option<Primitive> {
        match kind {
            PrimitiveKind::Node => self.nodes.remove(&id).map(Primitive::Node),
            PrimitiveKind::Way => self.ways.remove(&id).map(Primitive::Way),
            PrimitiveKind::Relation => self.relations.remove(&id).map(Primitive::Relation),
            PrimitiveKind::Changeset => None,
        }
    }

    /// True if the stored primitive at this identity is structurally equal
    /// to `primitive`. Presence of the identity alone is not enough.
    pub fn contains(&self, primitive: &Primitive) -> bool {
        match primitive {
            Primitive::Node(p) => self.nodes.get(&p.id) == Some(p),
            Primitive::Way(p) => self.ways.get(&p.id) == Some(p),
            Primitive::Relation(p) => self.relations.get(&p.id) == Some(p),
            Primitive::Changeset(_) => false,
        }
    }

    /// True if some primitive is stored at `(kind, id)`.
    pub fn contains_key(&self, kind: PrimitiveKind, id: i64) -> bool {
        self.get(kind, id).is_some()
    }

    /// Node with the given id.
    pub fn node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Way with the given id.
    pub fn way(&self, id: i64) -> Option<&Way> {
        self.ways.get(&id)
    }

    /// Relation with the given id.
    pub fn relation(&self, id: i64) -> Option<&Relation> {
        self.relations.get(&id)
    }

    /// Mutable node with the given id.
    pub fn node_mut(&mut self, id: i64) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Mutable way with the given id.
    pub fn way_mut(&mut self, id: i64) -> Option<&mut Way> {
        self.ways.get_mut(&id)
    }

    /// Mutable relation with the given id.
    pub fn relation_mut(&mut self, id: i64) -> Option<&mut Relation> {
        self.relations.get_mut(&id)
    }

    /// Primitive stored at `(kind, id)`.
    pub fn get(&self, kind: PrimitiveKind, id: i64) -> Option<PrimitiveRef<'_>> {
        match kind {
            PrimitiveKind::Node => self.nodes.get(&id).map(PrimitiveRef::Node),
            PrimitiveKind::Way => self.ways.get(&id).map(PrimitiveRef::Way),
            PrimitiveKind::Relation => self.relations.get(&id).map(PrimitiveRef::Relation),
            PrimitiveKind::Changeset => None,
        }
    }

    /// All primitives of one kind, keyed by id.
    pub fn entries<B: DocumentSlot>(&self) -> &BTreeMap<i64, Versioned<B>> {
        B::slot(self)
    }

    /// Nodes, by ascending id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Ways, by ascending id.
    pub fn ways(&self) -> impl Iterator<Item = &Way> + '_ {
        self.ways.values()
    }

    /// Relations, by ascending id.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.relations.values()
    }

    /// Every primitive: nodes, then ways, then relations.
    pub fn iter(&self) -> impl Iterator<Item = PrimitiveRef<'_>> + '_ {
        self.nodes
            .values()
            .map(PrimitiveRef::Node)
            .chain(self.ways.values().map(PrimitiveRef::Way))
            .chain(self.relations.values().map(PrimitiveRef::Relation))
    }

    /// Number of primitives of one kind.
    pub fn count(&self, kind: PrimitiveKind) -> usize {
        match kind {
            PrimitiveKind::Node => self.nodes.len(),
            PrimitiveKind::Way => self.ways.len(),
            PrimitiveKind::Relation => self.relations.len(),
            PrimitiveKind::Changeset => 0,
        }
    }

    /// Total number of primitives.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    /// True if the document holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds every primitive of `other` (set union with history merge).
    pub fn extend_from(&mut self, other: &Document) -> CoreResult<()> {
        for primitive in other.iter() {
            self.add(primitive.to_primitive())?;
        }
        Ok(())
    }

    /// The allocator used for this document's placeholders.
    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    /// Mutable access to the allocator, for constructing new primitives.
    pub fn allocator_mut(&mut self) -> &mut IdAllocator {
        &mut self.allocator
    }

    /// Writes uploaded primitives back after a successful upload.
    ///
    /// Created primitives are re-keyed from their placeholder to the
    /// server id, references to the placeholder in ways and relations are
    /// rewritten, and every reconciled primitive replaces the stored one.
    pub fn apply_upload(
        &mut self,
        reconciled: impl IntoIterator<Item = Primitive>,
        remaps: &[IdRemap],
    ) -> CoreResult<()> {
        for remap in remaps {
            self.remove(remap.kind, remap.old_id);
        }
        for primitive in reconciled {
            match primitive {
                Primitive::Node(p) => {
                    self.insert(p);
                }
                Primitive::Way(p) => {
                    self.insert(p);
                }
                Primitive::Relation(p) => {
                    self.insert(p);
                }
                Primitive::Changeset(_) => {
                    return Err(CoreError::invalid_kind(
                        PrimitiveKind::Changeset,
                        "apply upload",
                    ))
                }
            }
        }
        for remap in remaps {
            self.remap_references(remap);
        }
        Ok(())
    }

    /// Number of placeholder primitives.
    pub fn placeholder_count(&self) -> usize {
        self.iter().filter(|p| is_placeholder(p.id())).count()
    }

    fn remap_references(&mut self, remap: &IdRemap) {
        for way in self.ways.values_mut() {
            way.body
                .remap_reference(remap.kind, remap.old_id, remap.new_id);
        }
        for relation in self.relations.values_mut() {
            relation
                .body
                .remap_reference(remap.kind, remap.old_id, remap.new_id);
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.ways == other.ways && self.relations == other.relations
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = PrimitiveRef<'a>;
    type IntoIter = Box<dyn Iterator<Item = PrimitiveRef<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Member;

    fn node(id: i64, version: u64, name: &str) -> Node {
        Node::node(id, 1.0, 2.0)
            .with_tag("name", name)
            .with_version(version)
    }

    #[test]
    fn add_then_contains() {
        let mut doc = Document::new();
        let x = Primitive::from(node(1, 1, "a"));
        doc.add(x.clone()).unwrap();
        assert!(doc.contains(&x));

        let y = Primitive::from(node(1, 2, "b"));
        doc.add(y.clone()).unwrap();
        assert!(!doc.contains(&x));
        assert!(doc.contains(&y));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn add_keeps_highest_version_and_both_histories() {
        let mut doc = Document::new();
        doc.add(node(5, 3, "new")).unwrap();
        doc.add(node(5, 1, "old")).unwrap();
        let stored = doc.node(5).unwrap();
        assert_eq!(stored.version, Some(3));
        assert_eq!(stored.tags["name"], "new");
        assert_eq!(stored.history_versions(), vec![1, 3]);
    }

    #[test]
    fn stored_entry_wins_version_tie() {
        let mut doc = Document::new();
        doc.add(node(1, 1, "a")).unwrap();
        doc.add(node(1, 1, "b")).unwrap();
        let stored = doc.node(1).unwrap();
        assert_eq!(stored.tags["name"], "a");
        assert_eq!(stored.history_versions(), vec![1]);
        assert_eq!(stored.revision_at(1).unwrap().tags["name"], "a");
    }

    #[test]
    fn repeated_ids_collapse_into_one_entry() {
        let doc = Document::from_primitives([
            node(9, 1, "a").into(),
            node(9, 2, "b").into(),
            node(9, 3, "c").into(),
        ])
        .unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.node(9).unwrap().history_versions(), vec![1, 2, 3]);
    }

    #[test]
    fn unversioned_add_replaces() {
        let mut doc = Document::new();
        doc.add(Node::node(-1, 0.0, 0.0)).unwrap();
        doc.add(Node::node(-1, 5.0, 5.0)).unwrap();
        assert_eq!(doc.node(-1).unwrap().lat(), Some(5.0));
    }

    #[test]
    fn contains_is_structural() {
        let mut doc = Document::new();
        doc.add(node(1, 1, "a")).unwrap();
        assert!(doc.contains(&node(1, 1, "a").into()));
        assert!(!doc.contains(&node(1, 1, "z").into()));
        assert!(!doc.contains(&Way::way(1, []).into()));
    }

    #[test]
    fn discard_is_best_effort() {
        let mut doc = Document::new();
        let p = Primitive::from(node(1, 1, "a"));
        assert!(!doc.discard(&p).unwrap());
        doc.add(p.clone()).unwrap();
        assert!(doc.discard(&p).unwrap());
        assert!(doc.is_empty());
        assert!(doc.discard(&crate::primitive::Changeset::default().into()).is_err());
    }

    #[test]
    fn changesets_are_rejected() {
        let mut doc = Document::new();
        let err = doc.add(crate::primitive::Changeset::with_id(1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPrimitiveKind { .. }));
    }

    #[test]
    fn iterates_nodes_then_ways_then_relations() {
        let mut doc = Document::new();
        doc.add(Relation::relation(1, [])).unwrap();
        doc.add(Way::way(1, [1])).unwrap();
        doc.add(Node::node(1, 0.0, 0.0)).unwrap();
        let kinds: Vec<_> = doc.iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            [PrimitiveKind::Node, PrimitiveKind::Way, PrimitiveKind::Relation]
        );
    }

    #[test]
    fn loaded_placeholders_advance_allocator() {
        let mut doc = Document::new();
        doc.add(Node::node(-7, 0.0, 0.0)).unwrap();
        let fresh = Node::new_node(doc.allocator_mut(), 1.0, 1.0);
        assert_eq!(fresh.id, -8);
        assert_eq!(doc.allocator().last_id(PrimitiveKind::Way), 0);
    }

    #[test]
    fn extend_from_merges() {
        let mut a = Document::from_primitives([node(1, 1, "a").into()]).unwrap();
        let b = Document::from_primitives([node(1, 2, "b").into(), node(2, 1, "c").into()])
            .unwrap();
        a.extend_from(&b).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.node(1).unwrap().history_versions(), vec![1, 2]);
    }

    #[test]
    fn apply_upload_rekeys_and_rewrites_references() {
        let mut doc = Document::new();
        let n = Node::new_node(doc.allocator_mut(), 1.0, 1.0);
        let w = Way::new_way(doc.allocator_mut(), [n.id, 10]);
        let r = Relation::relation(3, [Member::new(PrimitiveKind::Way, w.id, "outer")]);
        doc.add(n.clone()).unwrap();
        doc.add(w.clone()).unwrap();
        doc.add(r).unwrap();

        let mut created = n.clone();
        created.id = 100;
        created.version = Some(1);
        created.reset_history();
        let remaps = [
            IdRemap {
                kind: PrimitiveKind::Node,
                old_id: n.id,
                new_id: 100,
            },
            IdRemap {
                kind: PrimitiveKind::Way,
                old_id: w.id,
                new_id: 200,
            },
        ];
        // Reconciled copies still carry placeholder references.
        let mut created_way = w.clone();
        created_way.id = 200;
        created_way.version = Some(1);
        doc.apply_upload(
            [Primitive::from(created), Primitive::from(created_way)],
            &remaps,
        )
        .unwrap();

        assert!(doc.node(-1).is_none());
        assert_eq!(doc.node(100).unwrap().version, Some(1));
        assert!(doc.way(-1).is_none());
        assert_eq!(doc.way(200).unwrap().nds(), &[100, 10]);
        assert!(doc.relation(3).unwrap().has_member(PrimitiveKind::Way, 200));
    }
}
