//! # osmsync engine
//!
//! Talks to an OSM-style editing API.
//!
//! This crate provides:
//! - `Api`: reads, changeset management, single-element and batch writes,
//!   and `push` (diff, upload, reconcile, write back)
//! - Automatic changeset sessions that open, batch and close changesets
//! - A pluggable blocking `HttpClient` with retry and redirect handling
//! - `MockClient` for scripted tests
//!
//! ## Usage
//!
//! ```
//! use osmsync_core::{Document, Node};
//! use osmsync_engine::{Api, ApiConfig, MockClient};
//! use std::sync::Arc;
//!
//! let client = Arc::new(MockClient::new());
//! client.push_ok("77"); // changeset/create
//! client.push_ok(r#"<diffResult><node old_id="-1" new_id="5" new_version="1"/></diffResult>"#);
//! client.push_ok(""); // changeset close
//!
//! let mut api = Api::new(client.clone(), ApiConfig::default());
//! let parent = Document::new();
//! let mut child = Document::new();
//! let node = Node::new_node(child.allocator_mut(), 51.5, -0.1);
//! child.add(node).unwrap();
//!
//! let report = api.push(&parent, &mut child, None).unwrap();
//! assert_eq!(report.changeset, Some(77));
//! assert_eq!(child.node(5).unwrap().version, Some(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod config;
mod error;
mod remote;
mod retry;
mod session;
mod transport;

pub use api::{Api, PushReport, UploadOutcome, VersionSelector};
pub use config::{
    default_agent, ApiConfig, AutoChangesetConfig, RetryConfig, DEFAULT_API_VERSION,
    DEFAULT_SERVER,
};
pub use error::{SyncError, SyncResult};
pub use remote::basic_auth;
pub use retry::RetryingClient;
pub use session::{ChangesetBackend, ChangesetRef, ChangesetSession};
pub use transport::{HttpClient, HttpRequest, HttpResponse, Method, MockClient};
