//! Placeholder id allocation.

use crate::error::{CoreError, CoreResult};
use crate::kind::PrimitiveKind;

/// Hands out placeholder ids for locally created primitives.
///
/// Server ids are positive. Placeholders are strictly negative and strictly
/// decreasing per kind, so they never collide with server ids and are
/// recognizable by sign. Each allocator is independent: two documents with
/// their own allocators do not share counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdAllocator {
    node: i64,
    way: i64,
    relation: i64,
}

impl IdAllocator {
    /// Creates an allocator whose first id for every kind is `-1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next placeholder id for `kind`.
    pub fn next_id(&mut self, kind: PrimitiveKind) -> CoreResult<i64> {
        let counter = self.counter_mut(kind)?;
        *counter -= 1;
        Ok(*counter)
    }

    /// Allocates the next node placeholder.
    pub fn next_node_id(&mut self) -> i64 {
        self.node -= 1;
        self.node
    }

    /// Allocates the next way placeholder.
    pub fn next_way_id(&mut self) -> i64 {
        self.way -= 1;
        self.way
    }

    /// Allocates the next relation placeholder.
    pub fn next_relation_id(&mut self) -> i64 {
        self.relation -= 1;
        self.relation
    }

    /// Records an id seen on input so later allocations stay below it.
    pub fn observe(&mut self, kind: PrimitiveKind, id: i64) {
        if let Ok(counter) = self.counter_mut(kind) {
            if id < *counter {
                *counter = id;
            }
        }
    }

    /// The most recently allocated (or observed) placeholder for `kind`,
    /// or 0 if none.
    pub fn last_id(&self, kind: PrimitiveKind) -> i64 {
        match kind {
            PrimitiveKind::Node => self.node,
            PrimitiveKind::Way => self.way,
            PrimitiveKind::Relation => self.relation,
            PrimitiveKind::Changeset => 0,
        }
    }

    fn counter_mut(&mut self, kind: PrimitiveKind) -> CoreResult<&mut i64> {
        match kind {
            PrimitiveKind::Node => Ok(&mut self.node),
            PrimitiveKind::Way => Ok(&mut self.way),
            PrimitiveKind::Relation => Ok(&mut self.relation),
            PrimitiveKind::Changeset => {
                Err(CoreError::invalid_kind(kind, "allocate placeholder id"))
            }
        }
    }
}

/// Returns true if `id` is a local placeholder rather than a server id.
pub fn is_placeholder(id: i64) -> bool {
    id < 0
}
