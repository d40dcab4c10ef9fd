//! The API facade: reads, changesets, writes and the push flow.

use crate::config::ApiConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{parse_integer, Remote};
use crate::retry::RetryingClient;
use crate::session::{ChangesetRef, ChangesetSession};
use crate::transport::HttpClient;
use osmsync_codec::{
    decode_changeset, decode_diff_result, decode_document, decode_osc, encode_changeset,
    encode_osc, encode_payload, EncodeOptions,
};
use osmsync_core::{Changeset, CoreError, Document, IdRemap, Primitive, PrimitiveKind};
use osmsync_protocol::{diff, reconcile_into, reconcile_one, Ack, Action, Osc};
use tracing::{debug, info, warn};

/// Which revision(s) of an element to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionSelector {
    /// The current version.
    #[default]
    Latest,
    /// One specific version.
    Exact(u64),
    /// Every version, merged into one history.
    History,
}

/// Result of a diff upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// Changeset the upload was attributed to.
    pub changeset: i64,
    /// Acknowledgements returned by the server.
    pub acks: Vec<Ack>,
    /// Placeholder ids replaced by server ids.
    pub remaps: Vec<IdRemap>,
}

/// Summary of a [`Api::push`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushReport {
    /// Changeset used, `None` if there was nothing to push.
    pub changeset: Option<i64>,
    /// Number of created primitives.
    pub created: usize,
    /// Number of modified primitives.
    pub modified: usize,
    /// Number of deleted primitives.
    pub deleted: usize,
    /// Placeholder ids replaced by server ids.
    pub remaps: Vec<IdRemap>,
}

/// An upload the server accepted, with whatever went wrong afterwards.
struct Accepted {
    changeset: i64,
    acks: Vec<Ack>,
    remaps: Vec<IdRemap>,
    error: Option<SyncError>,
}

impl Accepted {
    fn into_outcome(self) -> SyncResult<UploadOutcome> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(UploadOutcome {
                changeset: self.changeset,
                acks: self.acks,
                remaps: self.remaps,
            }),
        }
    }
}

impl PushReport {
    /// True if nothing was uploaded.
    pub fn is_empty(&self) -> bool {
        self.created + self.modified + self.deleted == 0
    }
}

/// Client for an OSM-style editing API.
///
/// Write calls without an explicit changeset go through the automatic
/// changeset session. Dropping the facade closes any changeset the
/// session still holds open.
pub struct Api<C: HttpClient> {
    client: C,
    config: ApiConfig,
    session: ChangesetSession,
}

impl<C: HttpClient> Api<RetryingClient<C>> {
    /// Wraps `client` in a [`RetryingClient`] using the configured policy.
    pub fn retrying(client: C, config: ApiConfig) -> Self {
        let client = RetryingClient::new(client, config.retry.clone());
        Self::new(client, config)
    }
}

impl<C: HttpClient> Api<C> {
    /// Creates a facade over `client`.
    pub fn new(client: C, config: ApiConfig) -> Self {
        let session = ChangesetSession::new(config.auto_changeset.clone());
        Self {
            client,
            config,
            session,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The automatic changeset session.
    pub fn session(&self) -> &ChangesetSession {
        &self.session
    }

    fn remote(&self) -> Remote<'_, C> {
        Remote::new(&self.client, &self.config)
    }

    /// Everything inside a bounding box.
    pub fn get_bbox(
        &self,
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> SyncResult<Document> {
        let body = self
            .remote()
            .get(&format!("map?bbox={min_lon},{min_lat},{max_lon},{max_lat}"))?;
        Ok(decode_document(&body)?)
    }

    /// One element. With [`VersionSelector::History`] the result carries
    /// every version in its history.
    pub fn get_element(
        &self,
        kind: PrimitiveKind,
        id: i64,
        selector: VersionSelector,
    ) -> SyncResult<Primitive> {
        versioned_only(kind, "get element")?;
        let path = match selector {
            VersionSelector::Latest => format!("{kind}/{id}"),
            VersionSelector::Exact(version) => format!("{kind}/{id}/{version}"),
            VersionSelector::History => format!("{kind}/{id}/history"),
        };
        let doc = decode_document(&self.remote().get(&path)?)?;
        doc.get(kind, id)
            .map(|p| p.to_primitive())
            .ok_or_else(|| SyncError::InvalidResponse(format!("response holds no {kind} {id}")))
    }

    /// Every version of one element, merged into one history.
    pub fn get_history(&self, kind: PrimitiveKind, id: i64) -> SyncResult<Primitive> {
        self.get_element(kind, id, VersionSelector::History)
    }

    /// A way or relation together with everything it references.
    pub fn get_element_full(&self, kind: PrimitiveKind, id: i64) -> SyncResult<Document> {
        if !matches!(kind, PrimitiveKind::Way | PrimitiveKind::Relation) {
            return Err(CoreError::invalid_kind(kind, "get full element").into());
        }
        Ok(decode_document(&self.remote().get(&format!("{kind}/{id}/full"))?)?)
    }

    /// Several elements of one kind.
    pub fn get_elements(&self, kind: PrimitiveKind, ids: &[i64]) -> SyncResult<Document> {
        versioned_only(kind, "get elements")?;
        if ids.is_empty() {
            return Ok(Document::new());
        }
        let list = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Ok(decode_document(&self.remote().get(&format!("{kind}s?{kind}s={list}"))?)?)
    }

    /// Relations referencing an element.
    pub fn get_element_rels(&self, kind: PrimitiveKind, id: i64) -> SyncResult<Document> {
        versioned_only(kind, "get relations")?;
        Ok(decode_document(&self.remote().get(&format!("{kind}/{id}/relations"))?)?)
    }

    /// Ways using a node.
    pub fn get_node_ways(&self, id: i64) -> SyncResult<Document> {
        Ok(decode_document(&self.remote().get(&format!("node/{id}/ways"))?)?)
    }

    /// A changeset's metadata.
    pub fn get_changeset(&self, id: i64) -> SyncResult<Changeset> {
        Ok(decode_changeset(&self.remote().get(&format!("changeset/{id}"))?)?)
    }

    /// The changes made in a changeset.
    pub fn get_changeset_full(&self, id: i64) -> SyncResult<Osc> {
        Ok(decode_osc(&self.remote().get(&format!("changeset/{id}/download"))?)?)
    }

    /// Opens a changeset. Tags default to the configured defaults, then
    /// the tags of `changeset`, then `comment`.
    pub fn create_changeset(
        &self,
        changeset: Option<Changeset>,
        comment: Option<&str>,
    ) -> SyncResult<Changeset> {
        let mut tags = self.config.auto_changeset.default_tags.clone();
        let mut changeset = changeset.unwrap_or_default();
        tags.append(&mut changeset.tags);
        if let Some(comment) = comment {
            tags.insert("comment".into(), comment.into());
        }
        changeset.tags = tags;

        let payload = encode_changeset(&changeset)?;
        let id = parse_integer(&self.remote().put("changeset/create", Some(payload))?)?;
        info!(changeset = id, "created changeset");
        changeset.id = Some(id);
        Ok(changeset)
    }

    /// Replaces a changeset's tags and returns the server's view of it.
    pub fn update_changeset(&self, changeset: &Changeset) -> SyncResult<Changeset> {
        let id = changeset.id.ok_or(CoreError::MissingChangesetId)?;
        let payload = encode_changeset(changeset)?;
        let body = self.remote().put(&format!("changeset/{id}"), Some(payload))?;
        Ok(decode_changeset(&body)?)
    }

    /// Closes a changeset. The automatic session is not involved.
    pub fn close_changeset(&self, changeset: impl Into<ChangesetRef>) -> SyncResult<()> {
        let id = changeset.into().id()?;
        self.remote().put(&format!("changeset/{id}/close"), None)?;
        info!(changeset = id, "closed changeset");
        Ok(())
    }

    /// Closes the automatically opened changeset, if any.
    pub fn flush(&mut self) -> SyncResult<Option<i64>> {
        let remote = Remote::new(&self.client, &self.config);
        self.session.flush(&remote)
    }

    fn resolve(&mut self, explicit: Option<&ChangesetRef>) -> SyncResult<i64> {
        let remote = Remote::new(&self.client, &self.config);
        self.session.resolve(explicit, &remote)
    }

    fn finish_operation(&mut self) -> SyncResult<bool> {
        let remote = Remote::new(&self.client, &self.config);
        self.session.finish_operation(&remote)
    }

    /// Uploads a change batch and reconciles it in place.
    ///
    /// The server's acknowledgements are applied before the changeset is
    /// closed: the automatic one through the session, an explicit one
    /// directly. A failed close is reported after reconciliation, so the
    /// batch still carries the server ids.
    pub fn upload_diff(
        &mut self,
        osc: &mut Osc,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<UploadOutcome> {
        self.upload_accepted(osc, changeset.as_ref())?.into_outcome()
    }

    /// Posts `osc` and, once the server has accepted it, reconciles and
    /// closes. `Err` means nothing was accepted.
    fn upload_accepted(
        &mut self,
        osc: &mut Osc,
        changeset: Option<&ChangesetRef>,
    ) -> SyncResult<Accepted> {
        let id = self.resolve(changeset)?;
        let payload = encode_osc(osc, &EncodeOptions::upload(id))?;
        let body = self.remote().post(&format!("changeset/{id}/upload"), payload)?;

        let mut accepted = Accepted {
            changeset: id,
            acks: Vec::new(),
            remaps: Vec::new(),
            error: None,
        };
        let reconciled = decode_diff_result(&body)
            .map_err(SyncError::from)
            .and_then(|acks| {
                let applied = reconcile_into(osc, &acks, id, &mut accepted.remaps);
                accepted.acks = acks;
                applied.map_err(SyncError::from)
            });
        let closed = if changeset.is_none() {
            self.flush().map(|_| ())
        } else {
            self.close_changeset(id)
        };
        if let Err(error) = &closed {
            warn!(changeset = id, %error, "upload accepted but changeset close failed");
        }
        accepted.error = reconciled.and(closed).err();

        info!(
            changeset = id,
            create = osc.count(Action::Create),
            modify = osc.count(Action::Modify),
            delete = osc.count(Action::Delete),
            "uploaded diff"
        );
        Ok(accepted)
    }

    fn write_element(
        &mut self,
        element: &mut Primitive,
        action: Action,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<Option<IdRemap>> {
        let kind = element.kind();
        versioned_only(kind, "write element")?;
        let element_id = element.id().unwrap_or_default();
        let id = self.resolve(changeset.as_ref())?;

        let options = EncodeOptions::upload(id);
        let remote = self.remote();
        let body = match action {
            Action::Create => {
                let payload = encode_payload(element, &options)?;
                remote.put(&format!("{kind}/create"), Some(payload))?
            }
            Action::Modify => {
                let payload = encode_payload(element, &options)?;
                remote.put(&format!("{kind}/{element_id}"), Some(payload))?
            }
            Action::Delete => {
                let payload = encode_payload(element, &options.bare())?;
                remote.delete(&format!("{kind}/{element_id}"), payload)?
            }
        };
        let number = parse_integer(&body)?;

        let ack = match action {
            Action::Create => Ack::written(kind, element_id, number, 1),
            Action::Modify => Ack::written(kind, element_id, element_id, as_version(number)?),
            Action::Delete => Ack {
                kind,
                old_id: element_id,
                new_id: None,
                new_version: Some(as_version(number)?),
            },
        };
        let remap = reconcile_one(element, action, &ack, id)?;
        debug!(%kind, id = element_id, %action, changeset = id, "wrote element");

        if changeset.is_none() {
            self.finish_operation()?;
        }
        Ok(remap)
    }

    /// Creates an element. On success it carries its server id, version 1
    /// and a fresh history.
    pub fn create_element(
        &mut self,
        element: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<Option<IdRemap>> {
        self.write_element(element, Action::Create, changeset)
    }

    /// Updates an element. On success it carries its new version.
    pub fn update_element(
        &mut self,
        element: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        self.write_element(element, Action::Modify, changeset).map(|_| ())
    }

    /// Deletes an element. On success it is marked invisible.
    pub fn delete_element(
        &mut self,
        element: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        self.write_element(element, Action::Delete, changeset).map(|_| ())
    }

    /// [`Api::create_element`] for nodes only.
    pub fn create_node(
        &mut self,
        node: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<Option<IdRemap>> {
        expect_kind(node, PrimitiveKind::Node)?;
        self.create_element(node, changeset)
    }

    /// [`Api::create_element`] for ways only.
    pub fn create_way(
        &mut self,
        way: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<Option<IdRemap>> {
        expect_kind(way, PrimitiveKind::Way)?;
        self.create_element(way, changeset)
    }

    /// [`Api::create_element`] for relations only.
    pub fn create_relation(
        &mut self,
        relation: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<Option<IdRemap>> {
        expect_kind(relation, PrimitiveKind::Relation)?;
        self.create_element(relation, changeset)
    }

    /// [`Api::update_element`] for nodes only.
    pub fn update_node(
        &mut self,
        node: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        expect_kind(node, PrimitiveKind::Node)?;
        self.update_element(node, changeset)
    }

    /// [`Api::update_element`] for ways only.
    pub fn update_way(
        &mut self,
        way: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        expect_kind(way, PrimitiveKind::Way)?;
        self.update_element(way, changeset)
    }

    /// [`Api::update_element`] for relations only.
    pub fn update_relation(
        &mut self,
        relation: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        expect_kind(relation, PrimitiveKind::Relation)?;
        self.update_element(relation, changeset)
    }

    /// [`Api::delete_element`] for nodes only.
    pub fn delete_node(
        &mut self,
        node: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        expect_kind(node, PrimitiveKind::Node)?;
        self.delete_element(node, changeset)
    }

    /// [`Api::delete_element`] for ways only.
    pub fn delete_way(
        &mut self,
        way: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        expect_kind(way, PrimitiveKind::Way)?;
        self.delete_element(way, changeset)
    }

    /// [`Api::delete_element`] for relations only.
    pub fn delete_relation(
        &mut self,
        relation: &mut Primitive,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<()> {
        expect_kind(relation, PrimitiveKind::Relation)?;
        self.delete_element(relation, changeset)
    }

    /// Deletes several elements of one kind in a single upload.
    pub fn delete_elements(
        &mut self,
        kind: PrimitiveKind,
        ids: &[i64],
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<UploadOutcome> {
        let current = self.get_elements(kind, ids)?;
        let mut osc = Osc::new();
        osc.push_section(Action::Delete, current);
        self.upload_diff(&mut osc, changeset)
    }

    /// Uploads the changes that turn `parent` into `child`, then writes
    /// the reconciled primitives back into `child`.
    ///
    /// Placeholder ids in `child` are replaced by server ids, along with
    /// every way and relation reference to them. Once the server has
    /// accepted the upload this happens even if reconciliation or the
    /// changeset close then fails; the error is returned afterwards.
    pub fn push(
        &mut self,
        parent: &Document,
        child: &mut Document,
        changeset: Option<ChangesetRef>,
    ) -> SyncResult<PushReport> {
        let changes = diff(parent, child);
        if changes.is_empty() {
            debug!("nothing to push");
            return Ok(PushReport::default());
        }
        let mut osc = Osc::from_diff(changes);
        let accepted = self.upload_accepted(&mut osc, changeset.as_ref())?;
        osc.write_back(child, &accepted.remaps)?;
        let outcome = accepted.into_outcome()?;

        Ok(PushReport {
            changeset: Some(outcome.changeset),
            created: osc.count(Action::Create),
            modified: osc.count(Action::Modify),
            deleted: osc.count(Action::Delete),
            remaps: outcome.remaps,
        })
    }
}

impl<C: HttpClient> Drop for Api<C> {
    fn drop(&mut self) {
        if !self.session.is_open() {
            return;
        }
        if let Err(error) = self.flush() {
            warn!(%error, "failed to close changeset on teardown");
        }
    }
}

fn versioned_only(kind: PrimitiveKind, operation: &'static str) -> Result<(), CoreError> {
    if kind.is_versioned() {
        Ok(())
    } else {
        Err(CoreError::invalid_kind(kind, operation))
    }
}

fn expect_kind(primitive: &Primitive, expected: PrimitiveKind) -> Result<(), CoreError> {
    let found = primitive.kind();
    if found == expected {
        Ok(())
    } else {
        Err(CoreError::type_mismatch(expected, found))
    }
}

fn as_version(number: i64) -> SyncResult<u64> {
    u64::try_from(number)
        .map_err(|_| SyncError::InvalidResponse(format!("negative version {number}")))
}
