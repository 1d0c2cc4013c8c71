//! Status-code classification and error mapping.
//!
//! # Design
//! Mapping happens in two steps. `classify` is a pure function from a status
//! code to a `StatusClass` tag. `check_response` then attaches logging to the
//! 400/403 tags and decides, under the configured `StatusPolicy`, whether a
//! tag becomes an error or falls through to body parsing.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{HubspotError, USAGE_DOCS_URL};
use crate::http::{HttpMethod, HttpResponse};

/// The only content type HubSpot error bodies are trusted to carry.
pub const JSON_ERROR_CONTENT_TYPE: &str = "application/json;charset=utf-8";

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200.
    Ok,
    /// Any other 2xx.
    Success,
    /// 1xx, 3xx and anything outside 100..=599. Never raised.
    Passthrough,
    BadRequest,
    Forbidden,
    Unauthorized,
    RateLimited,
    /// 502 or 503.
    UpstreamTimeout,
    Conflict,
    /// Any other 4xx or 5xx status.
    Other,
}

/// What to do with 400 and 403 responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Log a warning and still parse the body as a successful result.
    #[default]
    LogOnly,
    /// Log a warning, then fail with `BadRequest` / `AccessDenied`.
    Strict,
}

pub fn classify(status: u16) -> StatusClass {
    match status {
        200 => StatusClass::Ok,
        201..=299 => StatusClass::Success,
        400 => StatusClass::BadRequest,
        403 => StatusClass::Forbidden,
        401 => StatusClass::Unauthorized,
        429 => StatusClass::RateLimited,
        502 | 503 => StatusClass::UpstreamTimeout,
        409 => StatusClass::Conflict,
        400..=599 => StatusClass::Other,
        _ => StatusClass::Passthrough,
    }
}

/// Upstream `message` field from a JSON error body, or `"Unknown error"`.
///
/// The body is only consulted for non-200 responses whose content type is
/// exactly `application/json;charset=utf-8`.
pub fn upstream_message(response: &HttpResponse) -> String {
    if response.status == 200 || response.content_type() != Some(JSON_ERROR_CONTENT_TYPE) {
        return UNKNOWN_ERROR.to_string();
    }
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Map `response` to a parsed body or a typed error.
///
/// With `expect_body` unset (delete) a non-failing response yields `None`
/// without reading the body.
pub fn check_response(
    method: HttpMethod,
    response: HttpResponse,
    expect_body: bool,
    policy: StatusPolicy,
) -> Result<(Option<Value>, HttpResponse), HubspotError> {
    let class = classify(response.status);
    debug!(%method, url = %response.url, status = response.status, ?class, "hubspot response");

    match class {
        StatusClass::Ok | StatusClass::Success | StatusClass::Passthrough => {}
        StatusClass::BadRequest => {
            let message = format!(
                "Bad request for {method} {}: {}",
                response.url,
                upstream_message(&response)
            );
            warn!(%method, url = %response.url, status = response.status, "{message}");
            if policy == StatusPolicy::Strict {
                return Err(HubspotError::BadRequest { message, response });
            }
        }
        StatusClass::Forbidden => {
            let message = format!(
                "Access denied for {method} {}: the private app is missing a required scope or the record is not visible to it ({})",
                response.url,
                upstream_message(&response)
            );
            warn!(%method, url = %response.url, status = response.status, "{message}");
            if policy == StatusPolicy::Strict {
                return Err(HubspotError::AccessDenied { message, response });
            }
        }
        StatusClass::Unauthorized => {
            return Err(HubspotError::InvalidAuth {
                message: "HubSpot rejected the credentials: the private app token is invalid, expired or revoked"
                    .to_string(),
                response,
            });
        }
        StatusClass::RateLimited => {
            let retry_after = response.header("retry-after").map(str::to_string);
            let wait = match &retry_after {
                Some(value) => format!("Retry after {value} seconds."),
                None => "No Retry-After header was sent.".to_string(),
            };
            return Err(HubspotError::RateLimited {
                message: format!("HubSpot rate limit reached. {wait} See {USAGE_DOCS_URL}"),
                retry_after,
                response,
            });
        }
        StatusClass::UpstreamTimeout => {
            return Err(HubspotError::UpstreamTimeout {
                message: format!(
                    "HubSpot timed out or is unavailable ({}) for {method} {}",
                    response.status, response.url
                ),
                response,
            });
        }
        StatusClass::Conflict => {
            return Err(HubspotError::Duplicate {
                message: "A record with the same unique property value already exists".to_string(),
                response,
            });
        }
        StatusClass::Other => {
            let status = response.status;
            return Err(HubspotError::Http {
                status,
                message: status_message(status, &response.url),
                response,
            });
        }
    }

    if !expect_body {
        return Ok((None, response));
    }
    let data = parse_body(&response.body)?;
    Ok((data, response))
}

/// `"<code> Client Error: <reason> for url: <url>"` (or `Server Error` for
/// 5xx), mirroring what a generic raise-for-status produces. Only called for
/// 4xx and 5xx.
fn status_message(status: u16, url: &str) -> String {
    let kind = if status >= 500 {
        "Server Error"
    } else {
        "Client Error"
    };
    let reason = ureq::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Status");
    format!("{status} {kind}: {reason} for url: {url}")
}

fn parse_body(body: &str) -> Result<Option<Value>, HubspotError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| HubspotError::Deserialization(e.to_string()))
}
