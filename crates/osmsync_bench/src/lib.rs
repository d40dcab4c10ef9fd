//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use osmsync_core::{Document, Node, Way};
use rand::Rng;

/// Builds a document of `nodes` random nodes and ways of `way_len` nodes
/// over them, all with server ids and version 1.
pub fn random_network(nodes: usize, way_len: usize) -> Document {
    let mut rng = rand::thread_rng();
    let mut doc = Document::new();
    for id in 1..=nodes as i64 {
        let mut node = Node::node(id, rng.gen_range(-90.0..90.0), rng.gen_range(-180.0..180.0))
            .with_version(1);
        if rng.gen_bool(0.2) {
            node.tags.insert("amenity".into(), "bench".into());
        }
        doc.add(node).expect("node ids are unique");
    }
    if way_len > 0 {
        for (index, chunk) in (1..=nodes as i64).collect::<Vec<_>>().chunks(way_len).enumerate() {
            let way = Way::way(index as i64 + 1, chunk.iter().copied())
                .with_version(1)
                .with_tag("highway", "residential");
            doc.add(way).expect("way ids are unique");
        }
    }
    doc
}

/// Derives a child of `parent` with roughly `ratio` of its nodes retagged,
/// the same share deleted, and that many placeholder nodes added.
pub fn edited_child(parent: &Document, ratio: f64) -> Document {
    let mut rng = rand::thread_rng();
    let mut child = parent.clone();
    let ids: Vec<i64> = parent.nodes().map(|n| n.id).collect();
    let mut added = 0;
    for id in ids {
        if rng.gen_bool(ratio) {
            if let Some(node) = child.node_mut(id) {
                node.tags.insert("edited".into(), "yes".into());
            }
        } else if rng.gen_bool(ratio) {
            child.remove(osmsync_core::PrimitiveKind::Node, id);
            added += 1;
        }
    }
    for _ in 0..added {
        let node = Node::new_node(child.allocator_mut(), 0.0, 0.0);
        child.add(node).expect("placeholder ids are unique");
    }
    child
}
