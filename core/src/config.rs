//! Client configuration.
//!
//! The credential is always passed in explicitly. `ClientConfig::from_env`
//! is a convenience for binaries and scripts; it loads a `.env` file if one
//! is present and reads the token from the process environment.

use std::time::Duration;

use crate::auth::{DEFAULT_AUTH_HEADER, DEFAULT_AUTH_METHOD};
use crate::error::HubspotError;
use crate::status::StatusPolicy;

pub const BASE_URL: &str = "https://api.hubapi.com";
pub const USER_AGENT: &str = "Hubspot Tools";

/// Environment variable holding the private-app token.
pub const TOKEN_ENV: &str = "HUBSPOT_PRIVATE_APP_TOKEN";
/// Optional override for the API host, mainly for pointing at a mock server.
pub const BASE_URL_ENV: &str = "HUBSPOT_BASE_URL";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct ClientConfig {
    pub credential: String,
    pub base_url: String,
    pub user_agent: String,
    pub auth_method: String,
    pub auth_header: String,
    pub timeout: Duration,
    pub status_policy: StatusPolicy,
}

impl ClientConfig {
    /// Defaults for everything except the credential.
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            base_url: BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            auth_method: DEFAULT_AUTH_METHOD.to_string(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            status_policy: StatusPolicy::default(),
        }
    }

    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, HubspotError> {
        check_dotenv(dotenvy::dotenv())?;
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup; `from_env` passes the process
    /// environment.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HubspotError> {
        let credential = lookup(TOKEN_ENV)
            .ok_or_else(|| HubspotError::Config(format!("{TOKEN_ENV} is not set")))?;
        let mut config = Self::new(credential);
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config = config.base_url(&base_url);
        }
        Ok(config)
    }

    /// Override the base URL. A trailing slash is dropped so caller paths,
    /// which start with `/`, join cleanly.
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn auth_scheme(mut self, auth_method: &str, auth_header: &str) -> Self {
        self.auth_method = auth_method.to_string();
        self.auth_header = auth_header.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }
}

/// A missing `.env` file is normal outside local development; any other
/// failure (unreadable or malformed file) is a configuration error.
fn check_dotenv<T>(result: Result<T, dotenvy::Error>) -> Result<(), HubspotError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(HubspotError::Config(format!("failed to load .env: {e}"))),
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("credential", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("auth_method", &self.auth_method)
            .field("auth_header", &self.auth_header)
            .field("timeout", &self.timeout)
            .field("status_policy", &self.status_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_point_at_hubspot() {
        let config = ClientConfig::new("pat-na1-8g8g8g8g-b868-4273-97e5-095760ea417f");
        assert_eq!(config.base_url, "https://api.hubapi.com");
        assert_eq!(config.user_agent, "Hubspot Tools");
        assert_eq!(config.auth_method, "Bearer");
        assert_eq!(config.auth_header, "Authorization");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.status_policy, StatusPolicy::LogOnly);
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("x").base_url("http://127.0.0.1:3000/");
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
    }

    #[test]
    fn from_vars_reads_token_and_base_url() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (TOKEN_ENV, "pat-na1-8g8g8g8g-b868-4273-97e5-095760ea417f"),
            (BASE_URL_ENV, "http://127.0.0.1:4010/"),
        ]);
        let config = ClientConfig::from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.credential, "pat-na1-8g8g8g8g-b868-4273-97e5-095760ea417f");
        assert_eq!(config.base_url, "http://127.0.0.1:4010");
    }

    #[test]
    fn from_vars_keeps_default_base_url() {
        let config = ClientConfig::from_vars(|k| {
            (k == TOKEN_ENV).then(|| "pat-na1-8g8g8g8g-b868-4273-97e5-095760ea417f".to_string())
        })
        .unwrap();
        assert_eq!(config.base_url, BASE_URL);
    }

    #[test]
    fn from_vars_requires_token() {
        let err = ClientConfig::from_vars(|_| None).unwrap_err();
        assert!(matches!(err, HubspotError::Config(ref m) if m.contains(TOKEN_ENV)));
    }

    #[test]
    fn missing_dotenv_file_is_ignored() {
        let path = std::env::temp_dir()
            .join(format!("hubspot-tools-absent-{}.env", std::process::id()));
        assert!(check_dotenv(dotenvy::from_path(&path)).is_ok());
    }

    #[test]
    fn malformed_dotenv_file_is_an_error() {
        let path = std::env::temp_dir()
            .join(format!("hubspot-tools-bad-{}.env", std::process::id()));
        std::fs::write(&path, "not valid\n").unwrap();
        let result = check_dotenv(dotenvy::from_path(&path));
        std::fs::remove_file(&path).unwrap();
        let err = result.unwrap_err();
        assert!(matches!(err, HubspotError::Config(ref m) if m.contains(".env")));
    }

    #[test]
    fn debug_output_redacts_credential() {
        let config = ClientConfig::new("pat-na1-8g8g8g8g-b868-4273-97e5-095760ea417f");
        let debug = format!("{config:?}");
        assert!(!debug.contains("8g8g8g8g"));
    }
}
