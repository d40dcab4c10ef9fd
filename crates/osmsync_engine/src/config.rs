//! Configuration for the API facade.

use osmsync_core::Tags;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};

/// Default API host.
pub const DEFAULT_SERVER: &str = "api.openstreetmap.org";

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "0.6";

/// Identifies this library in `User-Agent` and `created_by`.
pub fn default_agent() -> String {
    format!("osmsync/{}", env!("CARGO_PKG_VERSION"))
}

/// Configuration for [`crate::Api`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API host name.
    pub server: String,
    /// API version, used to derive the base path.
    pub api_version: String,
    /// User name for write calls.
    pub username: Option<String>,
    /// Password for write calls.
    pub password: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Automatic changeset policy.
    pub auto_changeset: AutoChangesetConfig,
    /// Retry and redirect policy.
    pub retry: RetryConfig,
}

impl ApiConfig {
    /// Creates a configuration for the given host.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Path prefix of every API call, e.g. `/api/0.6/`.
    pub fn base_path(&self) -> String {
        format!("/api/{}/", self.api_version)
    }

    /// Sets the credentials used for write calls.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the `User-Agent` header.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Sets the automatic changeset policy.
    pub fn with_auto_changeset(mut self, auto_changeset: AutoChangesetConfig) -> Self {
        self.auto_changeset = auto_changeset;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            username: None,
            password: None,
            user_agent: default_agent(),
            auto_changeset: AutoChangesetConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Policy for opening and rotating changesets on behalf of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutoChangesetConfig {
    /// Open changesets automatically when none is supplied.
    pub enabled: bool,
    /// Operations per changeset before it is closed and a new one opened.
    pub max_ops: u32,
    /// Tags of automatically opened changesets.
    pub default_tags: Tags,
}

impl AutoChangesetConfig {
    /// Automatic changesets turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the operation limit.
    pub fn with_max_ops(mut self, max_ops: u32) -> Self {
        self.max_ops = max_ops;
        self
    }

    /// Adds a default tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_tags.insert(key.into(), value.into());
        self
    }
}

impl Default for AutoChangesetConfig {
    fn default() -> Self {
        let mut default_tags = Tags::new();
        default_tags.insert("created_by".into(), default_agent());
        Self {
            enabled: true,
            max_ops: 200,
            default_tags,
        }
    }
}

/// Configuration for retry and redirect behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
    /// Retry non-idempotent methods too. Off by default: a repeated create
    /// can create twice.
    pub retry_writes: bool,
    /// Redirects followed before giving up.
    pub max_redirects: u32,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
            retry_writes: false,
            max_redirects: 5,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
            ..Self::new(1)
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Turns jitter on or off.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Allows retrying non-idempotent methods.
    pub fn with_retry_writes(mut self, retry_writes: bool) -> Self {
        self.retry_writes = retry_writes;
        self
    }

    /// Sets the redirect limit.
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            let jitter = delay_secs * 0.25 * rand::thread_rng().gen::<f64>();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
