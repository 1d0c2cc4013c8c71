//! Error types for the HubSpot API client.
//!
//! # Design
//! Every status-derived error carries a human-readable message and the
//! originating `HttpResponse`, so callers can inspect headers or the raw body
//! after catching one. `InvalidCredential` is the only kind raised before a
//! request exists; it aborts client construction.

use thiserror::Error;

use crate::http::HttpResponse;

/// Link included in rate-limit messages.
pub const USAGE_DOCS_URL: &str = "https://developers.hubspot.com/docs/api/usage-details";

#[derive(Debug, Error)]
pub enum HubspotError {
    /// The private-app token is malformed. Raised at construction only.
    #[error("invalid credential: {message}")]
    InvalidCredential { message: String },

    /// 401: the token was rejected by HubSpot.
    #[error("{message}")]
    InvalidAuth { message: String, response: HttpResponse },

    /// 429: too many requests. `retry_after` is the raw `Retry-After` header.
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: Option<String>,
        response: HttpResponse,
    },

    /// 502 / 503: HubSpot or an intermediate gateway did not answer in time.
    #[error("{message}")]
    UpstreamTimeout { message: String, response: HttpResponse },

    /// 409: a record with the same unique property already exists.
    #[error("{message}")]
    Duplicate { message: String, response: HttpResponse },

    /// 400, raised only under `StatusPolicy::Strict`.
    #[error("{message}")]
    BadRequest { message: String, response: HttpResponse },

    /// 403, raised only under `StatusPolicy::Strict`.
    #[error("{message}")]
    AccessDenied { message: String, response: HttpResponse },

    /// Any other non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        response: HttpResponse,
    },

    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl HubspotError {
    /// The response that produced this error, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            HubspotError::InvalidAuth { response, .. }
            | HubspotError::RateLimited { response, .. }
            | HubspotError::UpstreamTimeout { response, .. }
            | HubspotError::Duplicate { response, .. }
            | HubspotError::BadRequest { response, .. }
            | HubspotError::AccessDenied { response, .. }
            | HubspotError::Http { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status of the originating response, if any.
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    /// `Retry-After` as whole seconds, when the header holds a delay rather
    /// than an HTTP date.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            HubspotError::RateLimited {
                retry_after: Some(value),
                ..
            } => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HubspotError::RateLimited { .. } | HubspotError::UpstreamTimeout { .. }
        )
    }
}
