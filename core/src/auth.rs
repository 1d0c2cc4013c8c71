//! Private-app token validation and header injection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::HubspotError;
use crate::http::HttpRequest;

pub const DEFAULT_AUTH_METHOD: &str = "Bearer";
pub const DEFAULT_AUTH_HEADER: &str = "Authorization";

/// Private-app tokens are always this long.
pub const TOKEN_LENGTH: usize = 44;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^pat-[a-zA-Z0-9]{3}-[a-zA-Z0-9]{8}-[a-zA-Z0-9]{4}-[a-zA-Z0-9]{4}-[a-zA-Z0-9]{4}-[a-zA-Z0-9]{12}$",
    )
    .expect("token pattern is a valid regex")
});

/// Attaches a validated private-app token to outgoing requests.
///
/// Construction fails unless the token has the
/// `pat-XXX-XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX` shape, so an authenticator
/// is never observable in an invalid state.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenAuthenticator {
    token: String,
    auth_method: String,
    auth_header: String,
}

impl TokenAuthenticator {
    /// Validate `token` and use the `Authorization: Bearer <token>` scheme.
    pub fn new(token: &str) -> Result<Self, HubspotError> {
        Self::with_scheme(token, DEFAULT_AUTH_METHOD, DEFAULT_AUTH_HEADER)
    }

    /// Validate `token` with a custom method label and header name. An empty
    /// header name means no header is attached.
    pub fn with_scheme(
        token: &str,
        auth_method: &str,
        auth_header: &str,
    ) -> Result<Self, HubspotError> {
        validate_token(token)?;
        Ok(Self {
            token: token.to_string(),
            auth_method: auth_method.to_string(),
            auth_header: auth_header.to_string(),
        })
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    /// The literal header value, `"<method> <token>"`.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.auth_method, self.token)
    }

    pub fn request_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if !self.auth_header.is_empty() {
            headers.insert(self.auth_header.clone(), self.header_value());
        }
        headers
    }

    /// Merge the auth header into `request` without replacing headers the
    /// caller already set.
    pub fn apply(&self, request: &mut HttpRequest) {
        for (name, value) in self.request_headers() {
            request.insert_header(&name, &value);
        }
    }
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("token", &"<redacted>")
            .field("auth_method", &self.auth_method)
            .field("auth_header", &self.auth_header)
            .finish()
    }
}

fn validate_token(token: &str) -> Result<(), HubspotError> {
    if token.len() != TOKEN_LENGTH {
        return Err(HubspotError::InvalidCredential {
            message: "Token is not 44 characters in length".to_string(),
        });
    }
    if !TOKEN_RE.is_match(token) {
        return Err(HubspotError::InvalidCredential {
            message: r#"Token does not follow correct structure of "pat-XXX-XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX""#
                .to_string(),
        });
    }
    Ok(())
}
