//! Redirect-following, retrying client decorator.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{HttpClient, HttpRequest, HttpResponse, Method};
use std::thread;
use tracing::{debug, warn};

/// Wraps a client with redirect following and retry with backoff.
///
/// Redirects (301, 302, 303, 307, 308) are followed up to
/// `max_redirects`; a 303 turns the request into a body-less GET.
/// Server errors and connection failures are retried with exponential
/// backoff, but only for idempotent methods unless `retry_writes` is set.
/// Any other failure status is returned as `SyncError::Transport`.
#[derive(Debug)]
pub struct RetryingClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: HttpClient> RetryingClient<C> {
    /// Wraps `inner`.
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The retry policy.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn may_retry(&self, method: Method, error: &SyncError, attempt: u32) -> bool {
        error.is_retryable()
            && (method.is_idempotent() || self.config.retry_writes)
            && attempt + 1 < self.config.max_attempts
    }

    fn follow(&self, request: &mut HttpRequest, response: &HttpResponse) -> SyncResult<()> {
        let location = response.header("Location").ok_or_else(|| {
            SyncError::InvalidResponse(format!("{} redirect without Location", response.status))
        })?;
        match split_location(location) {
            (Some(host), path) => {
                request.host = host.to_string();
                request.path = path.to_string();
            }
            (None, path) => request.path = path.to_string(),
        }
        if response.status == 303 {
            request.method = Method::Get;
            request.body = None;
        }
        debug!(
            status = response.status,
            host = %request.host,
            path = %request.path,
            "following redirect"
        );
        Ok(())
    }
}

impl<C: HttpClient> HttpClient for RetryingClient<C> {
    fn request(&self, request: &HttpRequest) -> SyncResult<HttpResponse> {
        let mut current = request.clone();
        let mut redirects = 0;
        let mut attempt = 0;

        loop {
            let error = match self.inner.request(&current) {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.is_redirect() => {
                    if redirects >= self.config.max_redirects {
                        return Err(SyncError::TooManyRedirects {
                            limit: self.config.max_redirects,
                        });
                    }
                    redirects += 1;
                    self.follow(&mut current, &response)?;
                    continue;
                }
                Ok(response) => response.into_error(),
                Err(error) => error,
            };

            if !self.may_retry(current.method, &error, attempt) {
                return Err(error);
            }
            attempt += 1;
            let delay = self.config.delay_for_attempt(attempt);
            warn!(
                method = %current.method,
                path = %current.path,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying request"
            );
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }
}

/// Splits a `Location` value into an optional host and a path.
fn split_location(location: &str) -> (Option<&str>, &str) {
    let rest = location
        .strip_prefix("https://")
        .or_else(|| location.strip_prefix("http://"));
    match rest {
        Some(rest) => match rest.find('/') {
            Some(slash) => (Some(&rest[..slash]), &rest[slash..]),
            None => (Some(rest), "/"),
        },
        None => (None, location),
    }
}
