//! Error types for osmsync core.

use crate::kind::PrimitiveKind;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by the primitive model, the document set and the
/// changeset bookkeeping.
///
/// All of these are local logic errors. None of them are retryable: they
/// indicate a caller or remote-protocol contract violation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Two primitives with different identities were asked to share history.
    #[error("cannot merge history of {other_kind} {other_id} into {kind} {id}")]
    IdentityMismatch {
        /// Kind of the receiving primitive.
        kind: PrimitiveKind,
        /// Id of the receiving primitive.
        id: i64,
        /// Kind of the other primitive.
        other_kind: PrimitiveKind,
        /// Id of the other primitive.
        other_id: i64,
    },

    /// History merge requested on a primitive without a version number.
    #[error("cannot merge history of {kind} {id} without version numbers")]
    MissingVersion {
        /// Kind of the offending primitive.
        kind: PrimitiveKind,
        /// Id of the offending primitive.
        id: i64,
    },

    /// An explicit changeset handle was supplied but carries no id.
    #[error("changeset has no id")]
    MissingChangesetId,

    /// No changeset was supplied and automatic changesets are disabled.
    #[error("auto changeset is disabled and no changeset was supplied")]
    AutoChangesetDisabled,

    /// A server acknowledgement does not match any submitted primitive.
    #[error("acknowledgement for {kind} {old_id} does not match a submitted primitive")]
    ReconciliationMismatch {
        /// Kind named by the acknowledgement.
        kind: PrimitiveKind,
        /// Id named by the acknowledgement.
        old_id: i64,
    },

    /// Operation is not supported for this kind of primitive.
    #[error("operation '{operation}' is not supported for {kind}")]
    InvalidPrimitiveKind {
        /// The rejected kind.
        kind: PrimitiveKind,
        /// Name of the operation.
        operation: &'static str,
    },

    /// A primitive of the wrong kind was passed to a kind-specific operation.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Kind the operation expects.
        expected: PrimitiveKind,
        /// Kind that was supplied.
        found: PrimitiveKind,
    },

    /// A reserved attribute could not be parsed as its declared type.
    #[error("invalid value {value:?} for attribute '{key}'")]
    InvalidAttribute {
        /// Attribute name.
        key: String,
        /// Raw attribute text.
        value: String,
    },
}

impl CoreError {
    /// Creates an invalid primitive kind error.
    pub fn invalid_kind(kind: PrimitiveKind, operation: &'static str) -> Self {
        Self::InvalidPrimitiveKind { kind, operation }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: PrimitiveKind, found: PrimitiveKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Creates an invalid attribute error.
    pub fn invalid_attribute(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            key: key.into(),
            value: value.into(),
        }
    }
}
