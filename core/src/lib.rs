//! Thin, synchronous client for the HubSpot CRM REST API.
//!
//! # Overview
//! Authenticates every request with a private-app token, issues HTTP verbs
//! against `https://api.hubapi.com`, and turns status codes into a small set
//! of typed errors. It does not model CRM objects; callers get
//! `serde_json::Value` bodies plus the raw response.
//!
//! # Design
//! - `TokenAuthenticator` validates the token once and injects the
//!   `Authorization` header into each request.
//! - `ApiClient` builds plain-data `HttpRequest` values, runs them through a
//!   `Transport` (blocking `ureq` by default), and maps the `HttpResponse`.
//! - `status::classify` is a pure status-code table; raising and logging are
//!   decided separately in `status::check_response`.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod status;

pub use auth::TokenAuthenticator;
pub use client::{ApiClient, ApiResult, Params};
pub use config::ClientConfig;
pub use error::HubspotError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use status::{classify, StatusClass, StatusPolicy};
