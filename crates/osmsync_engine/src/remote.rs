//! Request plumbing shared by the API facade and the changeset session.

use crate::config::ApiConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::ChangesetBackend;
use crate::transport::{HttpClient, HttpRequest, Method};
use base64::Engine;
use osmsync_codec::encode_changeset;
use osmsync_core::{Changeset, Tags};
use tracing::debug;

/// Builds the value of a Basic `Authorization` header.
pub fn basic_auth(username: &str, password: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {token}")
}

/// Parses a plain-text integer response body.
pub(crate) fn parse_integer(body: &[u8]) -> SyncResult<i64> {
    let text = String::from_utf8_lossy(body);
    text.trim()
        .parse()
        .map_err(|_| SyncError::InvalidResponse(format!("expected an integer, got {text:?}")))
}

/// A borrowed client plus the configuration needed to address it.
pub(crate) struct Remote<'a, C> {
    client: &'a C,
    config: &'a ApiConfig,
}

impl<'a, C: HttpClient> Remote<'a, C> {
    pub(crate) fn new(client: &'a C, config: &'a ApiConfig) -> Self {
        Self { client, config }
    }

    /// Sends a request under the API base path and returns the body of a
    /// successful response.
    pub(crate) fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        auth: bool,
    ) -> SyncResult<Vec<u8>> {
        let full_path = format!("{}{}", self.config.base_path(), path);
        let mut request = HttpRequest::new(method, &self.config.server, full_path)
            .with_header("User-Agent", &self.config.user_agent);
        if auth {
            if let (Some(user), Some(password)) = (&self.config.username, &self.config.password) {
                request = request.with_header("Authorization", basic_auth(user, password));
            }
        }
        if let Some(body) = body {
            request = request
                .with_header("Content-Type", "text/xml; charset=utf-8")
                .with_body(body);
        }

        debug!(%method, path = %request.path, "sending request");
        let response = self.client.request(&request)?;
        if !response.is_success() {
            return Err(response.into_error());
        }
        Ok(response.body)
    }

    pub(crate) fn get(&self, path: &str) -> SyncResult<Vec<u8>> {
        self.send(Method::Get, path, None, false)
    }

    pub(crate) fn put(&self, path: &str, body: Option<Vec<u8>>) -> SyncResult<Vec<u8>> {
        self.send(Method::Put, path, body, true)
    }

    pub(crate) fn post(&self, path: &str, body: Vec<u8>) -> SyncResult<Vec<u8>> {
        self.send(Method::Post, path, Some(body), true)
    }

    pub(crate) fn delete(&self, path: &str, body: Vec<u8>) -> SyncResult<Vec<u8>> {
        self.send(Method::Delete, path, Some(body), true)
    }
}

impl<C: HttpClient> ChangesetBackend for Remote<'_, C> {
    fn open_changeset(&self, tags: &Tags) -> SyncResult<i64> {
        let payload = encode_changeset(&Changeset::new(tags.clone()))?;
        parse_integer(&self.put("changeset/create", Some(payload))?)
    }

    fn close_changeset(&self, id: i64) -> SyncResult<()> {
        self.put(&format!("changeset/{id}/close"), None)?;
        Ok(())
    }
}
