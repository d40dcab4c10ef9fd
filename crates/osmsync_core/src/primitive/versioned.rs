//! Versioned primitives and their shared history.

use super::body::Body;
use crate::attrs::{Attributes, Tags};
use crate::error::{CoreError, CoreResult};
use crate::id::{is_placeholder, IdAllocator};
use crate::kind::PrimitiveKind;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Version number to recorded revision.
pub type HistoryMap<B> = BTreeMap<u64, Revision<B>>;

/// History table shared by every instance of one `(kind, id)` that has
/// been merged. Cloning the handle shares the table.
///
/// Merging two tables folds one into the other and leaves a forwarding
/// link behind, so handles to either table keep reading the same
/// revisions.
pub(crate) struct History<B: Body>(Arc<RwLock<Table<B>>>);

struct Table<B: Body> {
    revisions: HistoryMap<B>,
    forward: Option<History<B>>,
}

impl<B: Body> History<B> {
    fn empty() -> Self {
        Self(Arc::new(RwLock::new(Table {
            revisions: BTreeMap::new(),
            forward: None,
        })))
    }

    fn seeded(revision: Revision<B>) -> Self {
        let history = Self::empty();
        if let Some(version) = revision.version {
            history.0.write().revisions.insert(version, revision);
        }
        history
    }

    /// The table this handle ultimately forwards to.
    fn root(&self) -> History<B> {
        let mut current = self.clone();
        loop {
            let next = current.0.read().forward.clone();
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    fn snapshot(&self) -> HistoryMap<B> {
        self.root().0.read().revisions.clone()
    }

    fn get(&self, version: u64) -> Option<Revision<B>> {
        self.root().0.read().revisions.get(&version).cloned()
    }

    fn replace(&self, map: HistoryMap<B>) {
        self.root().0.write().revisions = map;
    }

    /// Makes `other`'s table forward to this one. Both must be roots.
    fn absorb(&self, other: &History<B>) {
        let mut table = other.0.write();
        table.revisions.clear();
        table.forward = Some(self.clone());
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root().0, &other.root().0)
    }
}

impl<B: Body> Clone for History<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<B: Body> fmt::Debug for History<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot().keys()).finish()
    }
}

/// A recorded state of a primitive at one version.
#[derive(Debug, Clone)]
pub struct Revision<B: Body> {
    /// Primitive id.
    pub id: i64,
    /// Version this revision was recorded at.
    pub version: Option<u64>,
    /// Secondary attributes.
    pub attrs: Attributes,
    /// Tags.
    pub tags: Tags,
    /// Kind-specific payload.
    pub body: B,
}

impl<B: Body> Revision<B> {
    fn into_versioned(self, history: History<B>) -> Versioned<B> {
        Versioned {
            id: self.id,
            version: self.version,
            attrs: self.attrs,
            tags: self.tags,
            body: self.body,
            history,
        }
    }
}

impl<B: Body> PartialEq for Revision<B> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.tags == other.tags
            && self.body == other.body
    }
}

/// A node, way or relation together with a handle to its history.
///
/// Equality is structural over id, version, tags and payload. Secondary
/// attributes and history are ignored.
#[derive(Debug, Clone)]
pub struct Versioned<B: Body> {
    /// Primitive id. Negative for local placeholders.
    pub id: i64,
    /// Server version, `None` until the primitive has been written.
    pub version: Option<u64>,
    /// Secondary attributes.
    pub attrs: Attributes,
    /// Tags.
    pub tags: Tags,
    /// Kind-specific payload.
    pub body: B,
    history: History<B>,
}

impl<B: Body> Versioned<B> {
    /// Creates an unversioned primitive with the given id.
    pub fn new(id: i64, body: B) -> Self {
        Self {
            id,
            version: None,
            attrs: Attributes::new(),
            tags: Tags::new(),
            body,
            history: History::empty(),
        }
    }

    /// Creates a local primitive with a fresh placeholder id.
    pub fn placeholder(alloc: &mut IdAllocator, body: B) -> Self {
        Self::new(B::allocate_id(alloc), body)
    }

    /// Assembles a primitive from decoded parts. A versioned primitive
    /// starts with a single-entry history.
    pub fn from_parts(
        id: i64,
        version: Option<u64>,
        attrs: Attributes,
        tags: Tags,
        body: B,
    ) -> Self {
        let revision = Revision {
            id,
            version,
            attrs,
            tags,
            body,
        };
        let history = History::seeded(revision.clone());
        revision.into_versioned(history)
    }

    /// Sets the version and starts a fresh history at it.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self.reset_history();
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Replaces the secondary attributes.
    #[must_use]
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    /// Kind of this primitive.
    pub fn kind(&self) -> PrimitiveKind {
        B::KIND
    }

    /// Returns true if the id is a local placeholder.
    pub fn is_placeholder(&self) -> bool {
        is_placeholder(self.id)
    }

    /// Snapshot of the current state.
    pub fn revision(&self) -> Revision<B> {
        Revision {
            id: self.id,
            version: self.version,
            attrs: self.attrs.clone(),
            tags: self.tags.clone(),
            body: self.body.clone(),
        }
    }

    /// All known revisions. The entry at this instance's own version
    /// reflects its current state.
    pub fn history(&self) -> HistoryMap<B> {
        let mut map = self.history.snapshot();
        if let Some(version) = self.version {
            map.insert(version, self.revision());
        }
        map
    }

    /// Version numbers with a recorded revision, ascending.
    pub fn history_versions(&self) -> Vec<u64> {
        self.history().into_keys().collect()
    }

    /// The revision recorded at `version`.
    pub fn revision_at(&self, version: u64) -> Option<Revision<B>> {
        if self.version == Some(version) {
            return Some(self.revision());
        }
        self.history.get(version)
    }

    /// Returns true if both instances point at the same history table.
    pub fn shares_history_with(&self, other: &Self) -> bool {
        self.history.ptr_eq(&other.history)
    }

    /// Merges the history of `other` into this primitive's history.
    ///
    /// Both instances end up sharing one table holding the union of their
    /// revisions; on a version collision the entry from `self` wins. The
    /// returned instance is the revision with the highest version.
    /// Merging an already merged pair again is a no-op.
    pub fn merge_history(&mut self, other: &mut Self) -> CoreResult<Self> {
        if self.id != other.id {
            return Err(CoreError::IdentityMismatch {
                kind: B::KIND,
                id: self.id,
                other_kind: B::KIND,
                other_id: other.id,
            });
        }
        let (Some(own_version), Some(other_version)) = (self.version, other.version) else {
            return Err(CoreError::MissingVersion {
                kind: B::KIND,
                id: self.id,
            });
        };

        let mut merged = other.history.snapshot();
        merged.insert(other_version, other.revision());
        merged.extend(self.history.snapshot());
        merged.insert(own_version, self.revision());

        let latest = merged
            .last_key_value()
            .map(|(_, revision)| revision.clone())
            .unwrap_or_else(|| self.revision());

        let root = self.history.root();
        let other_root = other.history.root();
        if !Arc::ptr_eq(&root.0, &other_root.0) {
            root.absorb(&other_root);
        }
        root.replace(merged);
        self.history = root.clone();
        other.history = root.clone();

        Ok(latest.into_versioned(root))
    }

    /// Drops all recorded revisions and starts over from the current state.
    ///
    /// Detaches this instance from any table it shared with others.
    pub fn reset_history(&mut self) {
        self.history = History::seeded(self.revision());
    }
}

impl<B: Body> PartialEq for Versioned<B> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.tags == other.tags
            && self.body == other.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::body::{NodeBody, WayBody};

    fn node(id: i64, version: u64, name: &str) -> Versioned<NodeBody> {
        Versioned::new(id, NodeBody::at(1.0, 2.0))
            .with_tag("name", name)
            .with_version(version)
    }

    #[test]
    fn new_primitive_has_no_history() {
        let n = Versioned::new(3, NodeBody::default());
        assert!(n.history().is_empty());
        let n = n.with_version(2);
        assert_eq!(n.history_versions(), vec![2]);
    }

    #[test]
    fn merge_returns_highest_version() {
        let mut v1 = node(5, 1, "old");
        let mut v2 = node(5, 2, "new");

        let latest = v1.merge_history(&mut v2).unwrap();
        assert_eq!(latest.version, Some(2));
        assert_eq!(latest.tags["name"], "new");
        assert_eq!(latest.history_versions(), vec![1, 2]);
        assert!(v1.shares_history_with(&v2));
        assert!(latest.shares_history_with(&v1));
        assert_eq!(v2.revision_at(1).unwrap().tags["name"], "old");
    }

    #[test]
    fn own_entry_wins_on_collision() {
        let mut a = node(5, 1, "mine");
        let mut b = node(5, 1, "theirs");
        let latest = a.merge_history(&mut b).unwrap();
        assert_eq!(latest.tags["name"], "mine");
        assert_eq!(b.revision_at(1).unwrap().tags["name"], "theirs");
        assert_eq!(a.revision_at(1).unwrap().tags["name"], "mine");
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = node(9, 3, "a");
        let mut b = node(9, 1, "b");
        a.merge_history(&mut b).unwrap();
        let first = a.history();
        let latest = a.merge_history(&mut b).unwrap();
        assert_eq!(a.history(), first);
        assert_eq!(first.len(), 2);
        assert_eq!(latest.version, Some(3));
    }

    #[test]
    fn merge_rejects_distinct_ids() {
        let mut a = node(1, 1, "a");
        let mut b = node(2, 1, "b");
        assert!(matches!(
            a.merge_history(&mut b),
            Err(CoreError::IdentityMismatch { id: 1, other_id: 2, .. })
        ));
    }

    #[test]
    fn merge_requires_versions() {
        let mut a = node(1, 1, "a");
        let mut b = Versioned::new(1, NodeBody::default());
        assert!(matches!(
            a.merge_history(&mut b),
            Err(CoreError::MissingVersion { id: 1, .. })
        ));
    }

    #[test]
    fn three_way_merge_shares_one_table() {
        let mut a = node(4, 1, "a");
        let mut b = node(4, 2, "b");
        let mut c = node(4, 3, "c");
        let mut latest = a.merge_history(&mut b).unwrap();
        let latest = latest.merge_history(&mut c).unwrap();
        assert_eq!(latest.history_versions(), vec![1, 2, 3]);
        assert_eq!(a.history_versions(), vec![1, 2, 3]);
        assert!(c.shares_history_with(&a));
    }

    #[test]
    fn merge_reaches_every_sharer() {
        let mut a = node(6, 1, "a");
        let mut b = node(6, 2, "b");
        let mut c = node(6, 3, "c");
        let mut d = node(6, 4, "d");
        a.merge_history(&mut b).unwrap();
        c.merge_history(&mut d).unwrap();
        // b and d are bystanders of the next merge.
        a.merge_history(&mut c).unwrap();
        assert_eq!(b.history_versions(), vec![1, 2, 3, 4]);
        assert_eq!(d.history_versions(), vec![1, 2, 3, 4]);
        assert!(b.shares_history_with(&d));

        let mut e = node(6, 5, "e");
        d.merge_history(&mut e).unwrap();
        assert_eq!(b.history_versions(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn reset_detaches_history() {
        let mut a = node(4, 1, "a");
        let mut b = node(4, 2, "b");
        a.merge_history(&mut b).unwrap();
        b.version = Some(3);
        b.reset_history();
        assert_eq!(b.history_versions(), vec![3]);
        assert!(!b.shares_history_with(&a));
        assert_eq!(a.history_versions(), vec![1, 2]);
    }

    #[test]
    fn equality_ignores_attributes() {
        let mut a = Versioned::new(1, WayBody { nds: vec![1, 2] }).with_version(1);
        let b = a.clone();
        a.attrs.set_visible(false);
        assert_eq!(a, b);
        a.body.nds.reverse();
        assert_ne!(a, b);
    }
}
