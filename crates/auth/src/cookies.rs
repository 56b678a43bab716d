use crate::error::AuthError;

/// A cookie lifted from a local browser profile.
#[derive(Clone, Debug)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
}

impl BrowserCookie {
    /// Render in `Set-Cookie` attribute form for the session jar.
    pub(crate) fn to_cookie_str(&self) -> String {
        let mut rendered = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if self.secure {
            rendered.push_str("; Secure");
        }
        rendered
    }
}

/// Source of browser cookies for a domain. The production implementation
/// reads a local browser's cookie store; tests substitute their own.
pub trait CookieSource: Send + Sync {
    fn cookies_for(&self, domain: &str) -> Result<Vec<BrowserCookie>, AuthError>;
}

/// Reads the local Chrome profile's cookie store.
#[derive(Debug, Default)]
pub struct ChromeCookies;

impl CookieSource for ChromeCookies {
    fn cookies_for(&self, domain: &str) -> Result<Vec<BrowserCookie>, AuthError> {
        let cookies =
            rookie::chrome(Some(vec![domain.to_string()])).map_err(|err| {
                AuthError::BrowserCookies {
                    domain: domain.to_string(),
                    reason: err.to_string(),
                }
            })?;

        Ok(cookies
            .into_iter()
            .map(|cookie| BrowserCookie {
                name: cookie.name,
                value: cookie.value,
                domain: cookie.domain,
                path: cookie.path,
                secure: cookie.secure,
            })
            .collect())
    }
}
