//! Upload reconciliation.
//!
//! The server answers a write with one acknowledgement per submitted
//! primitive, naming it by the id it had in the request. Reconciling an
//! acknowledgement stamps the new version and changeset on the primitive,
//! swaps placeholder ids for server ids on create, hides deleted primitives
//! and restarts history at the new version.

use crate::action::Action;
use crate::osc::Osc;
use osmsync_core::{CoreError, CoreResult, IdRemap, Primitive, PrimitiveKind};
use tracing::{debug, info};

/// One per-primitive acknowledgement of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Kind of the acknowledged primitive.
    pub kind: PrimitiveKind,
    /// Id the primitive had in the request payload.
    pub old_id: i64,
    /// Id assigned by the server. Absent for deletes.
    pub new_id: Option<i64>,
    /// Version assigned by the server. Absent for deletes.
    pub new_version: Option<u64>,
}

impl Ack {
    /// Acknowledgement of a create or modify.
    pub fn written(kind: PrimitiveKind, old_id: i64, new_id: i64, new_version: u64) -> Self {
        Self {
            kind,
            old_id,
            new_id: Some(new_id),
            new_version: Some(new_version),
        }
    }

    /// Acknowledgement of a delete.
    pub fn deleted(kind: PrimitiveKind, old_id: i64) -> Self {
        Self {
            kind,
            old_id,
            new_id: None,
            new_version: None,
        }
    }

    fn mismatch(&self) -> CoreError {
        CoreError::ReconciliationMismatch {
            kind: self.kind,
            old_id: self.old_id,
        }
    }
}

/// Applies one acknowledgement to the primitive it names.
///
/// Nothing is modified if the acknowledgement does not fit the primitive.
/// Returns the id remap for a create that received a new id.
pub fn reconcile_one(
    primitive: &mut Primitive,
    action: Action,
    ack: &Ack,
    changeset: i64,
) -> CoreResult<Option<IdRemap>> {
    if primitive.kind() != ack.kind || primitive.id() != Some(ack.old_id) {
        return Err(ack.mismatch());
    }
    let version = match (action, ack.new_version) {
        (_, Some(version)) => version,
        (Action::Delete, None) => primitive.version().ok_or_else(|| ack.mismatch())?,
        _ => return Err(ack.mismatch()),
    };
    let new_id = match (action, ack.new_id) {
        (Action::Create, Some(id)) => Some(id),
        (Action::Create, None) => return Err(ack.mismatch()),
        _ => None,
    };

    let mut remap = None;
    if let Some(new_id) = new_id.filter(|id| *id != ack.old_id) {
        primitive.set_id(new_id)?;
        remap = Some(IdRemap {
            kind: ack.kind,
            old_id: ack.old_id,
            new_id,
        });
    }
    if action == Action::Delete {
        primitive.mark_deleted();
    }
    primitive.record_write(version, changeset)?;
    debug!(kind = %ack.kind, old_id = ack.old_id, version, %action, "reconciled");
    Ok(remap)
}

/// Reconciles a whole batch in place.
///
/// Every acknowledgement must name a primitive that was submitted;
/// otherwise this fails with `ReconciliationMismatch`. Acknowledgements
/// processed before a failure keep their effect.
pub fn reconcile(osc: &mut Osc, acks: &[Ack], changeset: i64) -> CoreResult<Vec<IdRemap>> {
    let mut remaps = Vec::new();
    reconcile_into(osc, acks, changeset, &mut remaps)?;
    Ok(remaps)
}

/// Like [`reconcile`], but collects remaps into `remaps` so the ones
/// produced before a failure are still available to the caller.
pub fn reconcile_into(
    osc: &mut Osc,
    acks: &[Ack],
    changeset: i64,
    remaps: &mut Vec<IdRemap>,
) -> CoreResult<()> {
    let before = remaps.len();
    for ack in acks {
        let section = osc
            .sections_mut()
            .iter_mut()
            .find(|s| s.document.contains_key(ack.kind, ack.old_id))
            .ok_or_else(|| ack.mismatch())?;

        let mut primitive = section
            .document
            .get(ack.kind, ack.old_id)
            .map(|p| p.to_primitive())
            .ok_or_else(|| ack.mismatch())?;
        let remap = reconcile_one(&mut primitive, section.action, ack, changeset)?;

        section.document.remove(ack.kind, ack.old_id);
        section.document.add(primitive)?;
        remaps.extend(remap);
    }
    info!(
        acknowledged = acks.len(),
        remapped = remaps.len() - before,
        changeset,
        "reconciled upload"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmsync_core::{Node, Way};

    #[test]
    fn create_takes_server_identity() {
        let mut osc = Osc::new();
        osc.append(Action::Create, Node::node(-5, 1.0, 2.0)).unwrap();

        let acks = [Ack::written(PrimitiveKind::Node, -5, 42, 1)];
        let remaps = reconcile(&mut osc, &acks, 900).unwrap();
        assert_eq!(
            remaps,
            [IdRemap {
                kind: PrimitiveKind::Node,
                old_id: -5,
                new_id: 42
            }]
        );

        let node = osc.sections()[0].document.node(42).unwrap();
        assert_eq!(node.version, Some(1));
        assert_eq!(node.attrs.changeset(), Some(900));
        assert_eq!(node.history_versions(), vec![1]);
        assert_eq!(node.revision_at(1).unwrap().id, 42);
        assert!(osc.sections()[0].document.node(-5).is_none());
    }

    #[test]
    fn modify_bumps_version_and_restarts_history() {
        let mut older = Node::node(3, 0.0, 0.0).with_version(1);
        let mut newer = Node::node(3, 0.0, 1.0).with_version(2);
        let merged = older.merge_history(&mut newer).unwrap();
        assert_eq!(merged.history_versions(), vec![1, 2]);

        let mut osc = Osc::new();
        osc.append(Action::Modify, merged).unwrap();
        let remaps = reconcile(&mut osc, &[Ack::written(PrimitiveKind::Node, 3, 3, 3)], 7).unwrap();
        assert!(remaps.is_empty());
        let node = osc.sections()[0].document.node(3).unwrap();
        assert_eq!(node.version, Some(3));
        assert_eq!(node.history_versions(), vec![3]);
    }

    #[test]
    fn delete_hides_primitive() {
        let mut osc = Osc::new();
        osc.append(Action::Delete, Way::way(8, [1, 2]).with_version(4))
            .unwrap();
        reconcile(&mut osc, &[Ack::deleted(PrimitiveKind::Way, 8)], 7).unwrap();
        let way = osc.sections()[0].document.way(8).unwrap();
        assert_eq!(way.attrs.visible(), Some(false));
        assert_eq!(way.version, Some(4));
    }

    #[test]
    fn unmatched_ack_is_an_error() {
        let mut osc = Osc::new();
        osc.append(Action::Create, Node::node(-1, 0.0, 0.0)).unwrap();
        let err = reconcile(&mut osc, &[Ack::written(PrimitiveKind::Node, -2, 10, 1)], 1)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::ReconciliationMismatch {
                kind: PrimitiveKind::Node,
                old_id: -2
            }
        );
    }

    #[test]
    fn partial_failure_keeps_earlier_results() {
        let mut osc = Osc::new();
        osc.append(Action::Create, Node::node(-1, 0.0, 0.0)).unwrap();
        osc.append(Action::Create, Node::node(-2, 0.0, 0.0)).unwrap();
        let acks = [
            Ack::written(PrimitiveKind::Node, -1, 10, 1),
            Ack::written(PrimitiveKind::Way, -2, 11, 1),
        ];
        assert!(reconcile(&mut osc, &acks, 1).is_err());
        let doc = &osc.sections()[0].document;
        assert!(doc.node(10).is_some());
        assert!(doc.node(-2).is_some());
    }

    #[test]
    fn remaps_before_a_failure_are_kept() {
        let mut osc = Osc::new();
        osc.append(Action::Create, Node::node(-1, 0.0, 0.0)).unwrap();
        let acks = [
            Ack::written(PrimitiveKind::Node, -1, 10, 1),
            Ack::written(PrimitiveKind::Node, -9, 11, 1),
        ];
        let mut remaps = Vec::new();
        assert!(reconcile_into(&mut osc, &acks, 1, &mut remaps).is_err());
        assert_eq!(
            remaps,
            [IdRemap {
                kind: PrimitiveKind::Node,
                old_id: -1,
                new_id: 10
            }]
        );
    }

    #[test]
    fn create_without_new_id_is_rejected() {
        let mut p = Primitive::from(Node::node(-1, 0.0, 0.0));
        let ack = Ack {
            kind: PrimitiveKind::Node,
            old_id: -1,
            new_id: None,
            new_version: Some(1),
        };
        assert!(reconcile_one(&mut p, Action::Create, &ack, 1).is_err());
        assert_eq!(p.id(), Some(-1));
        assert_eq!(p.version(), None);
    }
}
