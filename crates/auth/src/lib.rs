use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use atlassian_client_api::{
    ApiClient, ApiError, ConfluenceService, JiraService, Session, SessionConfig,
};
use atlassian_client_config::{ConfigError, Settings, ENV_URL};

mod cookies;
mod error;

pub use cookies::{BrowserCookie, ChromeCookies, CookieSource};
pub use error::AuthError;

/// Atlassian product, addressed by a subdomain prefix spliced into the
/// configured base URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Product {
    Jira,
    Confluence,
}

impl Product {
    pub fn prefix(&self) -> &'static str {
        match self {
            Product::Jira => "jira.",
            Product::Confluence => "confluence.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Jira => "jira",
            Product::Confluence => "confluence",
        }
    }

    /// Service URL: the prefix inserted immediately after the scheme
    /// separator. `https://example.atlassian.net` becomes
    /// `https://jira.example.atlassian.net`.
    pub fn service_url(&self, base_url: &str) -> String {
        base_url.replacen("//", &format!("//{}", self.prefix()), 1)
    }

    /// Domain the browser stores this service's cookies under: the prefix
    /// plus the last path segment of the base URL. Base URLs are expected to
    /// be scheme plus bare host.
    pub fn cookie_domain(&self, base_url: &str) -> String {
        let host = base_url.split('/').next_back().unwrap_or_default();
        format!("{}{}", self.prefix(), host)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How credentials are attached to a session.
#[derive(Clone, Debug)]
pub enum AuthStrategy {
    /// HTTP basic credentials from `ATLASSIAN_USERNAME` / `ATLASSIAN_TOKEN`.
    Token { username: String, token: String },
    /// Session cookies lifted from a local browser profile.
    BrowserCookies,
}

impl AuthStrategy {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        if settings.use_browser_cookies {
            return Ok(AuthStrategy::BrowserCookies);
        }

        match (&settings.username, &settings.token) {
            (Some(username), Some(token)) => Ok(AuthStrategy::Token {
                username: username.clone(),
                token: token.clone(),
            }),
            _ => Err(ConfigError::MissingRequired {
                vars: settings.missing_required(),
            }),
        }
    }
}

/// Builds authenticated, connection-checked clients for Atlassian products.
///
/// The product is passed explicitly through session and client construction,
/// so cookie-domain derivation never depends on initialization order.
pub struct AuthManager {
    settings: Settings,
    cookie_source: Box<dyn CookieSource>,
}

impl AuthManager {
    /// Manager reading browser cookies from the local Chrome profile when
    /// browser-cookie mode is configured.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cookie_source: Box::new(ChromeCookies),
        }
    }

    /// Replace the browser cookie source (other browsers, tests).
    pub fn with_cookie_source(mut self, source: Box<dyn CookieSource>) -> Self {
        self.cookie_source = source;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create a Jira client and verify it can reach the service.
    pub async fn create_jira_client(&self) -> Result<ApiClient, AuthError> {
        self.create_client(Product::Jira).await
    }

    /// Create a Confluence client and verify it can reach the service.
    pub async fn create_confluence_client(&self) -> Result<ApiClient, AuthError> {
        self.create_client(Product::Confluence).await
    }

    /// Build an authenticated client for `product` and run the product's
    /// connectivity check, propagating any failure from it.
    pub async fn create_client(&self, product: Product) -> Result<ApiClient, AuthError> {
        let client = self.build_client(product)?;

        match product {
            Product::Jira => JiraService::new(client.clone()).test_connection().await?,
            Product::Confluence => {
                ConfluenceService::new(client.clone())
                    .test_connection()
                    .await?
            }
        }

        info!(product = %product, url = %client.base_url(), "Connection verified");
        Ok(client)
    }

    /// Build an authenticated client for `product` without the connectivity
    /// check. A fresh session is created on every call.
    pub fn build_client(&self, product: Product) -> Result<ApiClient, AuthError> {
        let base_url = self
            .settings
            .base_url
            .as_deref()
            .ok_or(ConfigError::MissingRequired {
                vars: vec![ENV_URL],
            })?;
        let strategy = AuthStrategy::from_settings(&self.settings)?;
        let service_url = product.service_url(base_url);

        let session = Session::create(&self.session_config())?;

        if matches!(strategy, AuthStrategy::BrowserCookies) {
            self.install_browser_cookies(&session, product, base_url, &service_url)?;
        }

        let client = ApiClient::new(&service_url, session)?;

        Ok(match strategy {
            AuthStrategy::Token { username, token } => client.with_basic_auth(username, token),
            AuthStrategy::BrowserCookies => client,
        })
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            verify_ssl: self.settings.verify_ssl,
            timeout: Duration::from_secs(self.settings.request_timeout),
            max_retries: self.settings.max_retries,
        }
    }

    fn install_browser_cookies(
        &self,
        session: &Session,
        product: Product,
        base_url: &str,
        service_url: &str,
    ) -> Result<(), AuthError> {
        let domain = product.cookie_domain(base_url);
        debug!(%domain, "Loading browser cookies");

        let cookies = self.cookie_source.cookies_for(&domain)?;
        if cookies.is_empty() {
            warn!(%domain, "No browser cookies found for domain");
        }

        let url = Url::parse(service_url).map_err(ApiError::InvalidUrl)?;
        for cookie in &cookies {
            session.add_cookie(&cookie.to_cookie_str(), &url);
        }

        debug!(count = cookies.len(), %domain, "Browser cookies installed");
        Ok(())
    }
}
