use std::sync::{Arc, Once};
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use tracing::warn;
use url::Url;

use crate::error::{ApiError, Result};
use crate::retry::RetryConfig;

static INSECURE_TLS_WARNING: Once = Once::new();

/// HTTP session parameters, derived from the application settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub verify_ssl: bool,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            verify_ssl: false,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// A configured HTTP client plus the cookie jar it reads from.
///
/// Built once per client construction and handed to exactly one
/// [`crate::ApiClient`]; sessions are not shared across service clients.
#[derive(Clone)]
pub struct Session {
    pub(crate) client: reqwest::Client,
    pub(crate) retry: RetryConfig,
    pub(crate) cookies: Arc<Jar>,
}

impl Session {
    /// Build a client with the TLS policy, timeout and default headers the
    /// Atlassian REST APIs expect.
    ///
    /// When TLS verification is off, a single process-wide warning is
    /// emitted the first time an insecure session is created.
    pub fn create(config: &SessionConfig) -> Result<Self> {
        let cookies = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .user_agent(format!("atlassian-client/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .default_headers(headers)
            .cookie_provider(Arc::clone(&cookies));

        if !config.verify_ssl {
            INSECURE_TLS_WARNING.call_once(|| {
                warn!("TLS certificate verification is disabled");
            });
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(ApiError::RequestFailed)?;

        Ok(Self {
            client,
            retry: RetryConfig::new(config.max_retries),
            cookies,
        })
    }

    /// Add a cookie to the session jar, scoped to `url`.
    pub fn add_cookie(&self, cookie: &str, url: &Url) {
        self.cookies.add_cookie_str(cookie, url);
    }

    /// Retry policy the session was configured with.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }
}
