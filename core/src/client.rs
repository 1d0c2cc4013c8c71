//! Authenticated HubSpot API client.
//!
//! # Design
//! `ApiClient` owns one transport (a pooled `ureq::Agent` by default), the
//! validated `TokenAuthenticator`, and the default headers sent on every
//! call. Each verb builds a plain-data `HttpRequest`, executes it, and hands
//! the response to `status::check_response`. Building is exposed separately
//! through `build_request` so the request shape can be checked without I/O.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::TokenAuthenticator;
use crate::config::ClientConfig;
use crate::error::HubspotError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::status::{check_response, StatusPolicy};

/// Parsed body (absent for deletes and empty bodies) plus the raw response.
pub type ApiResult = Result<(Option<Value>, HttpResponse), HubspotError>;

/// Query-string arguments, in order.
pub type Params<'a> = Option<&'a [(&'a str, &'a str)]>;

pub struct ApiClient<T: Transport = UreqTransport> {
    transport: T,
    authenticator: TokenAuthenticator,
    base_url: String,
    default_headers: Vec<(String, String)>,
    status_policy: StatusPolicy,
}

impl ApiClient<UreqTransport> {
    /// Client for the public HubSpot API with default settings.
    ///
    /// Fails with `InvalidCredential` if `credential` is malformed.
    pub fn new(credential: &str) -> Result<Self, HubspotError> {
        Self::from_config(ClientConfig::new(credential))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, HubspotError> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, HubspotError> {
        let authenticator = TokenAuthenticator::with_scheme(
            &config.credential,
            &config.auth_method,
            &config.auth_header,
        )?;
        let default_headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), config.user_agent.clone()),
        ];
        debug!(base_url = %config.base_url, policy = ?config.status_policy, "hubspot client ready");

        Ok(Self {
            transport,
            authenticator,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_headers,
            status_policy: config.status_policy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn authenticator(&self) -> &TokenAuthenticator {
        &self.authenticator
    }

    pub fn status_policy(&self) -> StatusPolicy {
        self.status_policy
    }

    /// Build the request a verb call would send. `path` is appended to the
    /// base URL verbatim.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        params: Params<'_>,
    ) -> HttpRequest {
        let mut request = HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: self.default_headers.clone(),
            query: params
                .unwrap_or_default()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        };
        self.authenticator.apply(&mut request);
        request
    }

    pub fn get(&self, path: &str, params: Params<'_>) -> ApiResult {
        self.send(HttpMethod::Get, path, None, params, true)
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B, params: Params<'_>) -> ApiResult {
        self.send(HttpMethod::Post, path, Some(to_json(body)?), params, true)
    }

    pub fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B, params: Params<'_>) -> ApiResult {
        self.send(HttpMethod::Put, path, Some(to_json(body)?), params, true)
    }

    pub fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B, params: Params<'_>) -> ApiResult {
        self.send(HttpMethod::Patch, path, Some(to_json(body)?), params, true)
    }

    /// HubSpot deletes answer without content, so the body is never parsed
    /// and the first element is always `None` on success.
    pub fn delete(&self, path: &str, params: Params<'_>) -> ApiResult {
        self.send(HttpMethod::Delete, path, None, params, false)
    }

    fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        params: Params<'_>,
        expect_body: bool,
    ) -> ApiResult {
        let request = self.build_request(method, path, body, params);
        debug!(%method, url = %request.url, "hubspot request");
        let response = self.transport.execute(&request)?;
        check_response(method, response, expect_body, self.status_policy)
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<String, HubspotError> {
    serde_json::to_string(body).map_err(|e| HubspotError::Serialization(e.to_string()))
}
