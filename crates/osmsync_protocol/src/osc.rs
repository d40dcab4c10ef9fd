//! Change batches (osmChange).

use crate::action::Action;
use crate::diff::Diff;
use osmsync_core::{CoreResult, Document, IdRemap, Primitive, PrimitiveRef};

/// One typed section of a change batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// What the section does.
    pub action: Action,
    /// The primitives it applies to.
    pub document: Document,
}

/// An ordered list of create/modify/delete sections destined for upload.
///
/// Section order is preserved: appending create, modify, create yields
/// three sections, not two.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Osc {
    sections: Vec<Section>,
}

impl Osc {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a batch from a diff: create, then modify, then delete,
    /// skipping empty sets.
    pub fn from_diff(diff: Diff) -> Self {
        let Diff {
            create,
            modify,
            delete,
        } = diff;
        let sections = [
            (Action::Create, create),
            (Action::Modify, modify),
            (Action::Delete, delete),
        ]
        .into_iter()
        .filter(|(_, document)| !document.is_empty())
        .map(|(action, document)| Section { action, document })
        .collect();
        Self { sections }
    }

    /// Appends a primitive under `action`.
    ///
    /// Joins the last section if it has the same action, otherwise opens a
    /// new one.
    pub fn append(&mut self, action: Action, primitive: impl Into<Primitive>) -> CoreResult<()> {
        match self.sections.last_mut() {
            Some(last) if last.action == action => last.document.add(primitive),
            _ => {
                let mut document = Document::new();
                document.add(primitive)?;
                self.sections.push(Section { action, document });
                Ok(())
            }
        }
    }

    /// Appends a whole section. Empty documents are ignored.
    pub fn push_section(&mut self, action: Action, document: Document) {
        if !document.is_empty() {
            self.sections.push(Section { action, document });
        }
    }

    /// Sections in order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Sections in order, mutably.
    pub fn sections_mut(&mut self) -> &mut [Section] {
        &mut self.sections
    }

    /// Non-empty sections in order.
    pub fn non_empty_sections(&self) -> impl Iterator<Item = &Section> + '_ {
        self.sections.iter().filter(|s| !s.document.is_empty())
    }

    /// Every primitive with the action it is submitted under.
    pub fn iter(&self) -> impl Iterator<Item = (Action, PrimitiveRef<'_>)> + '_ {
        self.sections
            .iter()
            .flat_map(|s| s.document.iter().map(move |p| (s.action, p)))
    }

    /// Number of primitives submitted under `action`.
    pub fn count(&self, action: Action) -> usize {
        self.sections
            .iter()
            .filter(|s| s.action == action)
            .map(|s| s.document.len())
            .sum()
    }

    /// Total number of primitives.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.document.len()).sum()
    }

    /// True if no section holds anything.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes this batch back into `doc` after it has been reconciled.
    ///
    /// Created and modified primitives replace their stored counterparts,
    /// placeholder ids are remapped, and deleted primitives are removed.
    pub fn write_back(&self, doc: &mut Document, remaps: &[IdRemap]) -> CoreResult<()> {
        let kept: Vec<Primitive> = self
            .iter()
            .filter(|(action, _)| *action != Action::Delete)
            .map(|(_, p)| p.to_primitive())
            .collect();
        doc.apply_upload(kept, remaps)?;
        for (_, p) in self.iter().filter(|(action, _)| *action == Action::Delete) {
            doc.remove(p.kind(), p.id());
        }
        Ok(())
    }
}

impl From<Diff> for Osc {
    fn from(diff: Diff) -> Self {
        Self::from_diff(diff)
    }
}
