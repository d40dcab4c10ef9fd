//! Property-based test generators using proptest.
//!
//! Documents produced here always hold positive (server) ids and versions,
//! so they look like something downloaded from an API.

use osmsync_core::{Document, Node, Tags, Way};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for tag maps with short lowercase keys and values.
pub fn tags_strategy() -> impl Strategy<Value = Tags> {
    prop::collection::btree_map("[a-z]{1,4}", "[a-z0-9 ]{0,8}", 0..4)
}

/// Strategy for a versioned node with the given id.
pub fn node_strategy(id: i64) -> impl Strategy<Value = Node> {
    (1..6u64, -90.0..90.0f64, -180.0..180.0f64, tags_strategy()).prop_map(
        move |(version, lat, lon, tags)| {
            let mut node = Node::node(id, lat, lon).with_version(version);
            node.tags = tags;
            node
        },
    )
}

/// Strategy for server ids.
pub fn server_id_strategy() -> impl Strategy<Value = i64> {
    1..100_000i64
}

/// Strategy for a document of 1 to 20 nodes plus up to 4 ways over them.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_set(1..500i64, 1..20)
        .prop_flat_map(|ids| {
            let ids: Vec<i64> = ids.into_iter().collect();
            let nodes: Vec<_> = ids.iter().map(|id| node_strategy(*id)).collect();
            let len = ids.len();
            let ways = prop::collection::btree_map(
                1..50i64,
                (
                    prop::sample::subsequence(ids, 0..=len),
                    1..4u64,
                    tags_strategy(),
                ),
                0..4,
            );
            (nodes, ways)
        })
        .prop_map(|(nodes, ways)| build_document(nodes, ways))
}

fn build_document(nodes: Vec<Node>, ways: BTreeMap<i64, (Vec<i64>, u64, Tags)>) -> Document {
    let mut doc = Document::new();
    for node in nodes {
        doc.add(node).expect("generated node is valid");
    }
    for (id, (nds, version, tags)) in ways {
        let mut way = Way::way(id, nds).with_version(version);
        way.tags = tags;
        doc.add(way).expect("generated way is valid");
    }
    doc
}

/// What happens to one node of the parent when deriving a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEdit {
    /// Left as is.
    Keep,
    /// Tag added.
    Retag,
    /// Removed.
    Delete,
}

fn node_edit_strategy() -> impl Strategy<Value = NodeEdit> {
    prop_oneof![Just(NodeEdit::Keep), Just(NodeEdit::Retag), Just(NodeEdit::Delete)]
}

/// A parent document and a child derived from it by editing nodes and
/// adding placeholder nodes.
#[derive(Debug, Clone)]
pub struct EditedPair {
    /// The original document.
    pub parent: Document,
    /// The edited document.
    pub child: Document,
    /// Edit applied to each parent node, by id.
    pub edits: BTreeMap<i64, NodeEdit>,
    /// Number of placeholder nodes added to the child.
    pub added: usize,
}

/// Strategy for [`EditedPair`].
pub fn edited_pair_strategy() -> impl Strategy<Value = EditedPair> {
    document_strategy()
        .prop_flat_map(|parent| {
            let count = parent.count(osmsync_core::PrimitiveKind::Node);
            (
                Just(parent),
                prop::collection::vec(node_edit_strategy(), count),
                0..4usize,
            )
        })
        .prop_map(|(parent, edits, added)| {
            let mut child = parent.clone();
            let ids: Vec<i64> = parent.nodes().map(|n| n.id).collect();
            let edits: BTreeMap<i64, NodeEdit> = ids.into_iter().zip(edits).collect();
            for (id, edit) in &edits {
                match edit {
                    NodeEdit::Keep => {}
                    NodeEdit::Retag => {
                        if let Some(node) = child.node_mut(*id) {
                            node.tags.insert("edited".into(), "yes".into());
                        }
                    }
                    NodeEdit::Delete => {
                        child.remove(osmsync_core::PrimitiveKind::Node, *id);
                    }
                }
            }
            for i in 0..added {
                let node = Node::new_node(child.allocator_mut(), i as f64, i as f64);
                child.add(node).expect("placeholder node is valid");
            }
            EditedPair {
                parent,
                child,
                edits,
                added,
            }
        })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmsync_core::PrimitiveKind;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_ids_are_server_ids(doc in document_strategy()) {
            prop_assert!(!doc.is_empty());
            prop_assert_eq!(doc.placeholder_count(), 0);
            for p in doc.iter() {
                prop_assert!(p.version().is_some());
            }
        }

        #[test]
        fn ways_reference_existing_nodes(doc in document_strategy()) {
            for way in doc.ways() {
                for nd in way.nds() {
                    prop_assert!(doc.contains_key(PrimitiveKind::Node, *nd));
                }
            }
        }

        #[test]
        fn edited_pair_adds_placeholders(pair in edited_pair_strategy()) {
            prop_assert_eq!(pair.child.placeholder_count(), pair.added);
        }
    }
}
