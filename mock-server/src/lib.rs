use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Token accepted by the server unless another one is configured.
pub const TEST_TOKEN: &str = "pat-na1-8g8g8g8g-b868-4273-97e5-095760ea417f";

/// Content type HubSpot uses on error bodies.
pub const ERROR_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// `Retry-After` value sent with forced 429 responses.
pub const RETRY_AFTER_SECS: &str = "10";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: String,
    pub properties: BTreeMap<String, Value>,
    pub archived: bool,
}

#[derive(Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize)]
pub struct ContactPage {
    pub results: Vec<Contact>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Default)]
pub struct Store {
    contacts: HashMap<String, Contact>,
    next_id: u64,
}

impl Store {
    fn email_taken(&self, email: &str, except: Option<&str>) -> Option<&str> {
        self.contacts
            .values()
            .find(|c| Some(c.id.as_str()) != except && email_of(&c.properties) == Some(email))
            .map(|c| c.id.as_str())
    }
}

#[derive(Clone)]
pub struct AppState {
    token: Arc<String>,
    db: Arc<RwLock<Store>>,
}

pub fn app() -> Router {
    app_with_token(TEST_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        token: Arc::new(token.to_string()),
        db: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route(
            "/crm/v3/objects/contacts",
            get(list_contacts).post(create_contact),
        )
        .route(
            "/crm/v3/objects/contacts/{id}",
            get(get_contact)
                .put(replace_contact)
                .patch(update_contact)
                .delete(delete_contact),
        )
        .route("/status/{code}", any(forced_status))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .with_state(state)
}

pub async fn run_with_token(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

/// Error body shaped like HubSpot's, with its exact content type.
pub fn hubspot_error(status: StatusCode, category: &str, message: &str) -> Response {
    let body = json!({
        "status": "error",
        "message": message,
        "correlationId": Uuid::new_v4(),
        "category": category,
    });
    (
        status,
        [(header::CONTENT_TYPE, ERROR_CONTENT_TYPE)],
        body.to_string(),
    )
        .into_response()
}

fn email_of(properties: &BTreeMap<String, Value>) -> Option<&str> {
    properties.get("email").and_then(Value::as_str)
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        debug!(uri = %request.uri(), "rejecting request without valid bearer token");
        return hubspot_error(
            StatusCode::UNAUTHORIZED,
            "INVALID_AUTHENTICATION",
            "Authentication credentials not found.",
        );
    }
    next.run(request).await
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<ContactPage> {
    let store = state.db.read().await;
    let mut results: Vec<Contact> = store.contacts.values().cloned().collect();
    results.sort_by_key(|c| c.id.parse::<u64>().unwrap_or(u64::MAX));
    if let Some(limit) = params.limit {
        results.truncate(limit);
    }
    Json(ContactPage { results })
}

async fn create_contact(
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Response {
    let Some(email) = email_of(&input.properties) else {
        return hubspot_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Property values were not valid: email is required",
        );
    };
    let mut store = state.db.write().await;
    if let Some(existing) = store.email_taken(email, None) {
        return hubspot_error(
            StatusCode::CONFLICT,
            "CONFLICT",
            &format!("Contact already exists. Existing ID: {existing}"),
        );
    }
    store.next_id += 1;
    let contact = Contact {
        id: store.next_id.to_string(),
        properties: input.properties,
        archived: false,
    };
    store.contacts.insert(contact.id.clone(), contact.clone());
    info!(id = %contact.id, "contact created");
    (StatusCode::CREATED, Json(contact)).into_response()
}

async fn get_contact(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let store = state.db.read().await;
    match store.contacts.get(&id) {
        Some(contact) => Json(contact.clone()).into_response(),
        None => not_found(&id),
    }
}

async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ContactInput>,
) -> Response {
    write_contact(state, id, input, false).await
}

async fn replace_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ContactInput>,
) -> Response {
    write_contact(state, id, input, true).await
}

async fn write_contact(state: AppState, id: String, input: ContactInput, replace: bool) -> Response {
    let mut store = state.db.write().await;
    if let Some(email) = email_of(&input.properties) {
        if let Some(existing) = store.email_taken(email, Some(id.as_str())) {
            return hubspot_error(
                StatusCode::CONFLICT,
                "CONFLICT",
                &format!("Contact already exists. Existing ID: {existing}"),
            );
        }
    }
    let Some(contact) = store.contacts.get_mut(&id) else {
        return not_found(&id);
    };
    if replace {
        contact.properties = input.properties;
    } else {
        contact.properties.extend(input.properties);
    }
    Json(contact.clone()).into_response()
}

async fn delete_contact(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let mut store = state.db.write().await;
    match store.contacts.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(&id),
    }
}

fn not_found(id: &str) -> Response {
    hubspot_error(
        StatusCode::NOT_FOUND,
        "OBJECT_NOT_FOUND",
        &format!("resource not found: contact {id}"),
    )
}

/// Answers with whatever status the path names, so clients can exercise
/// their error mapping against real HTTP.
async fn forced_status(Path(code): Path<u16>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return hubspot_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            &format!("not a status code: {code}"),
        );
    };
    if status.is_success() {
        return (status, Json(json!({ "status": code }))).into_response();
    }
    let mut response = hubspot_error(
        status,
        "FORCED",
        &format!("forced {code} response"),
    );
    if status == StatusCode::TOO_MANY_REQUESTS {
        let headers: &mut HeaderMap = response.headers_mut();
        headers.insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
    }
    response
}
