//! Automatic changeset session.
//!
//! The session is a small state machine, closed or open. Resolving a
//! changeset for a write without an explicit one opens a changeset if none
//! is open and counts the operation against `max_ops`. The changeset that
//! reaches the limit is still used for the operation that reached it and
//! is closed afterwards, so a changeset holds exactly `max_ops` operations.

use crate::config::AutoChangesetConfig;
use crate::error::SyncResult;
use osmsync_core::{Changeset, CoreError, Tags};
use tracing::info;

/// The two remote calls a session makes.
pub trait ChangesetBackend {
    /// Opens a changeset tagged with `tags` and returns its id.
    fn open_changeset(&self, tags: &Tags) -> SyncResult<i64>;

    /// Closes changeset `id`.
    fn close_changeset(&self, id: i64) -> SyncResult<()>;
}

/// A caller-supplied changeset.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangesetRef {
    /// A bare changeset id.
    Id(i64),
    /// A changeset handle, which must carry an id.
    Handle(Changeset),
}

impl ChangesetRef {
    /// The changeset id. A handle without an id fails with
    /// `MissingChangesetId`.
    pub fn id(&self) -> Result<i64, CoreError> {
        match self {
            ChangesetRef::Id(id) => Ok(*id),
            ChangesetRef::Handle(changeset) => changeset.id.ok_or(CoreError::MissingChangesetId),
        }
    }
}

impl From<i64> for ChangesetRef {
    fn from(id: i64) -> Self {
        ChangesetRef::Id(id)
    }
}

impl From<Changeset> for ChangesetRef {
    fn from(changeset: Changeset) -> Self {
        ChangesetRef::Handle(changeset)
    }
}

impl From<&Changeset> for ChangesetRef {
    fn from(changeset: &Changeset) -> Self {
        ChangesetRef::Handle(changeset.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenChangeset {
    id: i64,
    ops: u32,
}

/// Tracks the automatically opened changeset.
#[derive(Debug, Clone)]
pub struct ChangesetSession {
    config: AutoChangesetConfig,
    current: Option<OpenChangeset>,
}

impl ChangesetSession {
    /// Creates a closed session.
    pub fn new(config: AutoChangesetConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// The policy in effect.
    pub fn config(&self) -> &AutoChangesetConfig {
        &self.config
    }

    /// Id of the open changeset, if any.
    pub fn current_id(&self) -> Option<i64> {
        self.current.map(|c| c.id)
    }

    /// Operations counted against the open changeset.
    pub fn ops(&self) -> u32 {
        self.current.map_or(0, |c| c.ops)
    }

    /// True if a changeset is open.
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Picks the changeset id for one write operation.
    ///
    /// An explicit changeset is used as is and never touches the session.
    /// Without one, the session opens a changeset when needed and counts
    /// the operation.
    pub fn resolve(
        &mut self,
        explicit: Option<&ChangesetRef>,
        backend: &dyn ChangesetBackend,
    ) -> SyncResult<i64> {
        if let Some(explicit) = explicit {
            return Ok(explicit.id()?);
        }
        if !self.config.enabled {
            return Err(CoreError::AutoChangesetDisabled.into());
        }
        self.finish_operation(backend)?;

        let mut open = match self.current {
            Some(open) => open,
            None => {
                let id = backend.open_changeset(&self.config.default_tags)?;
                info!(changeset = id, max_ops = self.config.max_ops, "opened changeset");
                OpenChangeset { id, ops: 0 }
            }
        };
        open.ops += 1;
        self.current = Some(open);
        Ok(open.id)
    }

    /// Closes the open changeset if it has reached `max_ops`.
    ///
    /// Returns whether a changeset was closed.
    pub fn finish_operation(&mut self, backend: &dyn ChangesetBackend) -> SyncResult<bool> {
        match self.current {
            Some(open) if open.ops >= self.config.max_ops => {
                self.close(backend)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Closes the open changeset regardless of its counter.
    ///
    /// Returns the id of the closed changeset.
    pub fn flush(&mut self, backend: &dyn ChangesetBackend) -> SyncResult<Option<i64>> {
        if self.current.is_none() {
            return Ok(None);
        }
        self.close(backend).map(Some)
    }

    /// Drops the session state without contacting the server.
    pub fn forget(&mut self) -> Option<i64> {
        self.current.take().map(|c| c.id)
    }

    fn close(&mut self, backend: &dyn ChangesetBackend) -> SyncResult<i64> {
        // Detach before the remote call so the close cannot re-enter the session.
        let Some(open) = self.current.take() else {
            return Err(CoreError::MissingChangesetId.into());
        };
        backend.close_changeset(open.id)?;
        info!(changeset = open.id, ops = open.ops, "closed changeset");
        Ok(open.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        next: Mutex<i64>,
        opened: Mutex<Vec<Tags>>,
        closed: Mutex<Vec<i64>>,
        fail_close: bool,
    }

    impl ChangesetBackend for FakeBackend {
        fn open_changeset(&self, tags: &Tags) -> SyncResult<i64> {
            self.opened.lock().push(tags.clone());
            let mut next = self.next.lock();
            *next += 100;
            Ok(*next)
        }

        fn close_changeset(&self, id: i64) -> SyncResult<()> {
            if self.fail_close {
                return Err(SyncError::transport(409, "Conflict", "already closed"));
            }
            self.closed.lock().push(id);
            Ok(())
        }
    }

    fn session(max_ops: u32) -> ChangesetSession {
        ChangesetSession::new(AutoChangesetConfig::default().with_max_ops(max_ops))
    }

    #[test]
    fn rotates_after_max_ops() {
        let backend = FakeBackend::default();
        let mut session = session(2);
        let ids: Vec<_> = (0..3)
            .map(|_| session.resolve(None, &backend).unwrap())
            .collect();
        assert_eq!(ids, [100, 100, 200]);
        assert_eq!(*backend.closed.lock(), [100]);
        assert_eq!(session.ops(), 1);
    }

    #[test]
    fn finish_closes_at_limit() {
        let backend = FakeBackend::default();
        let mut session = session(2);
        session.resolve(None, &backend).unwrap();
        assert!(!session.finish_operation(&backend).unwrap());
        session.resolve(None, &backend).unwrap();
        assert!(session.finish_operation(&backend).unwrap());
        assert!(!session.is_open());
        assert_eq!(session.resolve(None, &backend).unwrap(), 200);
    }

    #[test]
    fn explicit_changeset_bypasses_session() {
        let backend = FakeBackend::default();
        let mut session = session(2);
        assert_eq!(session.resolve(Some(&ChangesetRef::Id(7)), &backend).unwrap(), 7);
        assert_eq!(
            session
                .resolve(Some(&Changeset::with_id(8).into()), &backend)
                .unwrap(),
            8
        );
        assert!(!session.is_open());
        assert!(backend.opened.lock().is_empty());

        let err = session
            .resolve(Some(&ChangesetRef::Handle(Changeset::default())), &backend)
            .unwrap_err();
        assert_eq!(err, SyncError::Core(CoreError::MissingChangesetId));
    }

    #[test]
    fn disabled_session_refuses() {
        let backend = FakeBackend::default();
        let mut session = ChangesetSession::new(AutoChangesetConfig::disabled());
        assert_eq!(
            session.resolve(None, &backend).unwrap_err(),
            SyncError::Core(CoreError::AutoChangesetDisabled)
        );
        assert_eq!(session.resolve(Some(&ChangesetRef::Id(3)), &backend).unwrap(), 3);
    }

    #[test]
    fn opens_with_default_tags() {
        let backend = FakeBackend::default();
        let mut session = ChangesetSession::new(
            AutoChangesetConfig::default().with_tag("comment", "bulk fix"),
        );
        session.resolve(None, &backend).unwrap();
        let opened = backend.opened.lock();
        assert_eq!(opened[0]["comment"], "bulk fix");
        assert!(opened[0].contains_key("created_by"));
    }

    #[test]
    fn flush_force_closes() {
        let backend = FakeBackend::default();
        let mut session = session(10);
        assert_eq!(session.flush(&backend).unwrap(), None);
        session.resolve(None, &backend).unwrap();
        assert_eq!(session.flush(&backend).unwrap(), Some(100));
        assert!(!session.is_open());
        assert_eq!(session.flush(&backend).unwrap(), None);
    }

    #[test]
    fn failed_close_still_detaches() {
        let backend = FakeBackend {
            fail_close: true,
            ..FakeBackend::default()
        };
        let mut session = session(10);
        session.resolve(None, &backend).unwrap();
        assert!(session.flush(&backend).is_err());
        assert!(!session.is_open());
    }
}
