//! Diff engine.

use osmsync_core::{Document, DocumentSlot, NodeBody, RelationBody, WayBody};
use tracing::debug;

/// Create, modify and delete sets between two documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    /// Present in the child only.
    pub create: Document,
    /// Present in both, structurally different. Taken from the child.
    pub modify: Document,
    /// Present in the parent only.
    pub delete: Document,
}

impl Diff {
    /// True if there is nothing to upload.
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.modify.is_empty() && self.delete.is_empty()
    }

    /// Total number of changed primitives.
    pub fn len(&self) -> usize {
        self.create.len() + self.modify.len() + self.delete.len()
    }
}

/// Computes the changes that turn `parent` into `child`.
///
/// Runs independently per kind. Neither document is modified, and the
/// result depends only on their contents.
pub fn diff(parent: &Document, child: &Document) -> Diff {
    let mut out = Diff::default();
    diff_kind::<NodeBody>(parent, child, &mut out);
    diff_kind::<WayBody>(parent, child, &mut out);
    diff_kind::<RelationBody>(parent, child, &mut out);
    debug!(
        create = out.create.len(),
        modify = out.modify.len(),
        delete = out.delete.len(),
        "computed diff"
    );
    out
}

fn diff_kind<B: DocumentSlot>(parent: &Document, child: &Document, out: &mut Diff) {
    let old = parent.entries::<B>();
    let new = child.entries::<B>();

    for (id, before) in old {
        match new.get(id) {
            None => {
                out.delete.insert(before.clone());
            }
            Some(after) if after != before => {
                out.modify.insert(after.clone());
            }
            Some(_) => {}
        }
    }
    for (id, after) in new {
        if !old.contains_key(id) {
            out.create.insert(after.clone());
        }
    }
}
