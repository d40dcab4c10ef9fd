//! # osmsync testkit
//!
//! Test utilities for osmsync.
//!
//! This crate provides:
//! - XML fixtures and sample documents
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use osmsync_testkit::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn diff_of_self_is_empty(doc in document_strategy()) {
//!         prop_assert!(diff(&doc, &doc).is_empty());
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
