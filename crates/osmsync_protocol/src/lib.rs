//! # osmsync protocol
//!
//! Change computation and reconciliation for osmsync.
//!
//! This crate provides:
//! - `diff` for computing create/modify/delete sets between two documents
//! - `Osc` change batches with ordered, typed sections
//! - `Ack` server acknowledgements and the upload reconciler
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod diff;
mod osc;
mod reconcile;

pub use action::{Action, UnknownAction};
pub use diff::{diff, Diff};
pub use osc::{Osc, Section};
pub use osmsync_core::IdRemap;
pub use reconcile::{reconcile, reconcile_into, reconcile_one, Ack};
