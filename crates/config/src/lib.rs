use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub mod logging;

pub const ENV_URL: &str = "ATLASSIAN_URL";
pub const ENV_USERNAME: &str = "ATLASSIAN_USERNAME";
pub const ENV_TOKEN: &str = "ATLASSIAN_TOKEN";
pub const ENV_CONFLUENCE_SPACE_KEY: &str = "CONFLUENCE_SPACE_KEY";
pub const ENV_JIRA_PROJECT_KEY: &str = "JIRA_PROJECT_KEY";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "MAX_RETRIES";
pub const ENV_VERIFY_SSL: &str = "VERIFY_SSL";
pub const ENV_USE_BROWSER_COOKIES: &str = "USE_BROWSER_COOKIES";

const DEFAULT_LOG_LEVEL: &str = "INFO";
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Missing required configuration: {}. Set these environment variables or create a .env file",
        .vars.join(", ")
    )]
    MissingRequired { vars: Vec<&'static str> },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime settings for the Atlassian services.
///
/// Loaded once at process entry and passed by reference to the components
/// that need it. Required fields depend on the authentication mode: token
/// mode needs url, username and token; browser-cookie mode only needs the
/// url (the cookie domain is derived from it).
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,

    pub confluence_space_key: Option<String>,
    pub jira_project_key: Option<String>,

    pub log_level: String,
    pub request_timeout: u64,
    pub max_retries: usize,
    pub verify_ssl: bool,
    pub use_browser_cookies: bool,
}

impl Settings {
    /// Load settings from the environment, seeding it from a dotenv file
    /// first (`~/.cfg/.env.atlassian`, falling back to `./.env`).
    ///
    /// Variables already present in the process environment win over the
    /// dotenv file.
    pub fn load() -> Result<Self, ConfigError> {
        load_env_file();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build and validate settings from an arbitrary variable lookup.
    ///
    /// Empty and whitespace-only values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let settings = Settings {
            base_url: get(ENV_URL),
            username: get(ENV_USERNAME),
            token: get(ENV_TOKEN),
            confluence_space_key: get(ENV_CONFLUENCE_SPACE_KEY),
            jira_project_key: get(ENV_JIRA_PROJECT_KEY),
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            request_timeout: parse_var(
                ENV_REQUEST_TIMEOUT,
                get(ENV_REQUEST_TIMEOUT),
                DEFAULT_REQUEST_TIMEOUT,
            )?,
            max_retries: parse_var(ENV_MAX_RETRIES, get(ENV_MAX_RETRIES), DEFAULT_MAX_RETRIES)?,
            verify_ssl: get(ENV_VERIFY_SSL).is_some_and(|value| truthy(&value)),
            use_browser_cookies: get(ENV_USE_BROWSER_COOKIES).is_some_and(|value| truthy(&value)),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Required variables that are absent, in field-check order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.base_url.is_none() {
            missing.push(ENV_URL);
        }
        if !self.use_browser_cookies {
            if self.username.is_none() {
                missing.push(ENV_USERNAME);
            }
            if self.token.is_none() {
                missing.push(ENV_TOKEN);
            }
        }
        missing
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingRequired { vars: missing })
        }
    }
}

/// Only a case-insensitive `true` enables a boolean flag; anything else
/// disables it.
fn truthy(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_var<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

fn load_env_file() {
    if let Some(path) = fixed_env_file() {
        if let Err(err) = dotenvy::from_path(&path) {
            tracing::warn!(path = %path.display(), error = %err, "Unable to load dotenv file");
        }
        return;
    }
    // No user-level file; pick up ./.env when present.
    let _ = dotenvy::dotenv();
}

fn fixed_env_file() -> Option<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".cfg").join(".env.atlassian"))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: Vec<(&'static str, &'static str)>) -> impl Fn(&str) -> Option<String> {
        move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_URL, "https://example.atlassian.net"),
            (ENV_USERNAME, "user@example.com"),
            (ENV_TOKEN, "api-token"),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::from_lookup(lookup(required())).unwrap();

        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.request_timeout, 30);
        assert_eq!(settings.max_retries, 3);
        assert!(!settings.verify_ssl);
        assert!(!settings.use_browser_cookies);
        assert!(settings.confluence_space_key.is_none());
        assert!(settings.jira_project_key.is_none());
    }

    #[test]
    fn test_all_variables_read() {
        let mut vars = required();
        vars.extend([
            (ENV_CONFLUENCE_SPACE_KEY, "DOCS"),
            (ENV_JIRA_PROJECT_KEY, "PROJ"),
            (ENV_LOG_LEVEL, "DEBUG"),
            (ENV_REQUEST_TIMEOUT, "60"),
            (ENV_MAX_RETRIES, "5"),
            (ENV_VERIFY_SSL, "true"),
        ]);

        let settings = Settings::from_lookup(lookup(vars)).unwrap();

        assert_eq!(
            settings.base_url.as_deref(),
            Some("https://example.atlassian.net")
        );
        assert_eq!(settings.confluence_space_key.as_deref(), Some("DOCS"));
        assert_eq!(settings.jira_project_key.as_deref(), Some("PROJ"));
        assert_eq!(settings.log_level, "DEBUG");
        assert_eq!(settings.request_timeout, 60);
        assert_eq!(settings.max_retries, 5);
        assert!(settings.verify_ssl);
    }

    #[test]
    fn test_missing_all_required() {
        let err = Settings::from_lookup(lookup(vec![])).unwrap_err();

        assert!(matches!(err, ConfigError::MissingRequired { .. }));
        assert!(err
            .to_string()
            .contains("ATLASSIAN_URL, ATLASSIAN_USERNAME, ATLASSIAN_TOKEN"));
    }

    #[test]
    fn test_missing_username_and_token() {
        let err = Settings::from_lookup(lookup(vec![(ENV_URL, "https://example.atlassian.net")]))
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("ATLASSIAN_USERNAME, ATLASSIAN_TOKEN"));
        assert!(!message.contains("ATLASSIAN_URL,"));
        assert!(!message.contains(": ATLASSIAN_URL"));
    }

    #[test]
    fn test_missing_token_only() {
        let err = Settings::from_lookup(lookup(vec![
            (ENV_URL, "https://example.atlassian.net"),
            (ENV_USERNAME, "user@example.com"),
        ]))
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("ATLASSIAN_TOKEN"));
        assert!(!message.contains("ATLASSIAN_USERNAME"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = Settings::from_lookup(lookup(vec![
            (ENV_URL, "https://example.atlassian.net"),
            (ENV_USERNAME, "   "),
            (ENV_TOKEN, ""),
        ]))
        .unwrap_err();

        assert!(err
            .to_string()
            .contains("ATLASSIAN_USERNAME, ATLASSIAN_TOKEN"));
    }

    #[test]
    fn test_verify_ssl_case_insensitive() {
        for value in ["true", "TRUE", "True", "tRuE"] {
            let mut vars = required();
            vars.push((ENV_VERIFY_SSL, value));
            let settings = Settings::from_lookup(lookup(vars)).unwrap();
            assert!(settings.verify_ssl, "{value} should enable verify_ssl");
        }

        for value in ["false", "yes", "1", "on", "enabled"] {
            let mut vars = required();
            vars.push((ENV_VERIFY_SSL, value));
            let settings = Settings::from_lookup(lookup(vars)).unwrap();
            assert!(!settings.verify_ssl, "{value} should disable verify_ssl");
        }
    }

    #[test]
    fn test_browser_cookie_mode_skips_credentials() {
        let settings = Settings::from_lookup(lookup(vec![
            (ENV_URL, "https://example.atlassian.net"),
            (ENV_USE_BROWSER_COOKIES, "TRUE"),
        ]))
        .unwrap();

        assert!(settings.use_browser_cookies);
        assert!(settings.username.is_none());
        assert!(settings.token.is_none());
    }

    #[test]
    fn test_browser_cookie_mode_still_requires_url() {
        let err =
            Settings::from_lookup(lookup(vec![(ENV_USE_BROWSER_COOKIES, "true")])).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("ATLASSIAN_URL"));
        assert!(!message.contains("ATLASSIAN_USERNAME"));
        assert!(!message.contains("ATLASSIAN_TOKEN"));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let mut vars = required();
        vars.push((ENV_REQUEST_TIMEOUT, "soon"));

        let err = Settings::from_lookup(lookup(vars)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: ENV_REQUEST_TIMEOUT,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_max_retries_rejected() {
        let mut vars = required();
        vars.push((ENV_MAX_RETRIES, "-1"));

        let err = Settings::from_lookup(lookup(vars)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: ENV_MAX_RETRIES,
                ..
            }
        ));
    }

    #[test]
    fn test_process_env_wins_over_dotenv_file() {
        use std::io::Write;

        // Unique names so parallel tests cannot interfere.
        let preset = "ATLC_TEST_PRESET";
        let fresh = "ATLC_TEST_FRESH";
        env::set_var(preset, "from-process");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{preset}=from-file").unwrap();
        writeln!(file, "{fresh}=from-file").unwrap();
        dotenvy::from_path(file.path()).unwrap();

        assert_eq!(env::var(preset).unwrap(), "from-process");
        assert_eq!(env::var(fresh).unwrap(), "from-file");

        env::remove_var(preset);
        env::remove_var(fresh);
    }
}
