//! Diff command implementation.

use osmsync_codec::{encode_osc, load_document, save_osc, EncodeOptions};
use osmsync_protocol::{diff, Action, Osc};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Counts of a computed change batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    /// Primitives only in the child.
    pub created: usize,
    /// Primitives changed between parent and child.
    pub modified: usize,
    /// Primitives only in the parent.
    pub deleted: usize,
}

/// Loads both documents and computes the change batch between them.
pub fn compute(parent: &Path, child: &Path) -> Result<Osc, Box<dyn std::error::Error>> {
    let parent = load_document(parent)?;
    let child = load_document(child)?;
    Ok(Osc::from_diff(diff(&parent, &child)))
}

/// Runs the diff command.
pub fn run(
    parent: &Path,
    child: &Path,
    output: Option<&Path>,
) -> Result<DiffSummary, Box<dyn std::error::Error>> {
    let osc = compute(parent, child)?;
    let summary = DiffSummary {
        created: osc.count(Action::Create),
        modified: osc.count(Action::Modify),
        deleted: osc.count(Action::Delete),
    };

    match output {
        Some(path) => {
            save_osc(path, &osc)?;
            info!(
                created = summary.created,
                modified = summary.modified,
                deleted = summary.deleted,
                "wrote {}",
                path.display()
            );
        }
        None => {
            let xml = encode_osc(&osc, &EncodeOptions::new())?;
            std::io::stdout().write_all(&xml)?;
            println!();
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmsync_codec::{load_osc, save_document};
    use osmsync_core::{Document, Node};
    use tempfile::tempdir;

    #[test]
    fn diff_writes_osmchange() {
        let dir = tempdir().unwrap();
        let parent_path = dir.path().join("parent.osm");
        let child_path = dir.path().join("child.osm");
        let out_path = dir.path().join("out.osc");

        let mut parent = Document::new();
        parent.add(Node::node(1, 1.0, 1.0).with_version(1)).unwrap();
        parent.add(Node::node(2, 2.0, 2.0).with_version(1)).unwrap();
        let mut child = parent.clone();
        child.remove(osmsync_core::PrimitiveKind::Node, 2);
        child.node_mut(1).unwrap().set_position(1.5, 1.0);
        let fresh = Node::new_node(child.allocator_mut(), 3.0, 3.0);
        child.add(fresh).unwrap();

        save_document(&parent_path, &parent).unwrap();
        save_document(&child_path, &child).unwrap();

        let summary = run(&parent_path, &child_path, Some(&out_path)).unwrap();
        assert_eq!(
            summary,
            DiffSummary {
                created: 1,
                modified: 1,
                deleted: 1
            }
        );

        let osc = load_osc(&out_path).unwrap();
        assert_eq!(osc.count(Action::Create), 1);
        assert_eq!(osc.count(Action::Modify), 1);
        assert_eq!(osc.count(Action::Delete), 1);
    }

    #[test]
    fn identical_files_give_empty_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same.osm");
        let mut doc = Document::new();
        doc.add(Node::node(1, 1.0, 1.0).with_version(1)).unwrap();
        save_document(&path, &doc).unwrap();

        let osc = compute(&path, &path).unwrap();
        assert!(osc.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.osm");
        assert!(compute(&missing, &missing).is_err());
    }
}
