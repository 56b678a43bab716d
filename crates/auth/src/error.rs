use atlassian_client_api::ApiError;
use atlassian_client_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Browser cookie extraction failed: browser missing, cookie store
    /// unreadable, or no access to the requested domain.
    #[error("Failed to get browser cookies for {domain}: {reason}")]
    BrowserCookies { domain: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
