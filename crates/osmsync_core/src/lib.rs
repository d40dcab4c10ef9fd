//! # osmsync core
//!
//! Versioned primitive model for OpenStreetMap-style map data.
//!
//! This crate provides:
//! - Nodes, ways and relations with shared version history
//! - Changeset handles
//! - `Document`, the versioned set holding primitives by kind
//! - Per-document placeholder id allocation
//! - Typed attributes (`id`, `version`, `lat`, `visible`...)
//!
//! ## Key Invariants
//!
//! - Server ids are positive, local placeholders are negative
//! - Every merged instance of one `(kind, id)` shares one history table
//! - A history merge always yields the highest version
//! - Equality is structural over id, version, tags and payload

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attrs;
mod document;
mod error;
mod id;
mod kind;
mod primitive;

pub use attrs::{AttrValue, Attributes, Tags, BOOL_KEYS, FLOAT_KEYS, INTEGER_KEYS};
pub use document::{Document, DocumentSlot, IdRemap, PrimitiveRef};
pub use error::{CoreError, CoreResult};
pub use id::{is_placeholder, IdAllocator};
pub use kind::{PrimitiveKind, UnknownKind};
pub use primitive::{
    Body, Changeset, HistoryMap, Member, Node, NodeBody, Primitive, Relation, RelationBody,
    Revision, Versioned, Way, WayBody,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
