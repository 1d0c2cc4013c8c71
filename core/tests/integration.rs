//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `ApiClient` over real
//! HTTP with the default `ureq` transport. Covers the contact lifecycle, the
//! auth header, and every classified status via the `/status/{code}` route.

use std::io::{Read, Write};
use std::net::SocketAddr;

use hubspot_tools::{ApiClient, ClientConfig, HubspotError, StatusPolicy, UreqTransport};
use serde_json::json;

const TOKEN: &str = mock_server::TEST_TOKEN;
const CONTACTS: &str = "/crm/v3/objects/contacts";

/// Spawn a mock server that accepts `token` and return its address.
fn spawn_server(token: &'static str) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_token(listener, token).await
        })
        .unwrap();
    });

    addr
}

/// Serve `count` connections, each answered with a raw 200 whose body is
/// `body`, and return the address.
fn spawn_raw_server(body: &'static [u8], count: usize) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming().take(count) {
            let mut stream = stream.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
        }
    });

    addr
}

fn client_for(addr: SocketAddr, policy: StatusPolicy) -> ApiClient<UreqTransport> {
    let config = ClientConfig::new(TOKEN)
        .base_url(&format!("http://{addr}"))
        .status_policy(policy);
    ApiClient::from_config(config).unwrap()
}

#[test]
fn contact_lifecycle() {
    let client = client_for(spawn_server(TOKEN), StatusPolicy::LogOnly);

    // Step 1: list should be empty.
    let (data, resp) = client.get(CONTACTS, None).unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(data.unwrap()["results"], json!([]));

    // Step 2: create a contact.
    let body = json!({ "properties": { "email": "ada@example.com", "firstname": "Ada" } });
    let (created, resp) = client.post(CONTACTS, &body, None).unwrap();
    assert_eq!(resp.status, 201);
    let created = created.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    // Step 3: get the created contact.
    let (fetched, _) = client.get(&format!("{CONTACTS}/{id}"), None).unwrap();
    assert_eq!(fetched.unwrap(), created);

    // Step 4: creating the same email again is a duplicate.
    let err = client.post(CONTACTS, &body, None).unwrap_err();
    assert!(matches!(err, HubspotError::Duplicate { .. }), "{err:?}");
    assert_eq!(err.status(), Some(409));

    // Step 5: patch merges.
    let (patched, _) = client
        .patch(
            &format!("{CONTACTS}/{id}"),
            &json!({ "properties": { "lastname": "Lovelace" } }),
            None,
        )
        .unwrap();
    let patched = patched.unwrap();
    assert_eq!(patched["properties"]["firstname"], "Ada");
    assert_eq!(patched["properties"]["lastname"], "Lovelace");

    // Step 6: put replaces.
    let (replaced, _) = client
        .put(
            &format!("{CONTACTS}/{id}"),
            &json!({ "properties": { "email": "ada@example.com" } }),
            None,
        )
        .unwrap();
    assert!(replaced.unwrap()["properties"].get("lastname").is_none());

    // Step 7: list with query params.
    let (page, _) = client.get(CONTACTS, Some(&[("limit", "10")][..])).unwrap();
    assert_eq!(page.unwrap()["results"].as_array().unwrap().len(), 1);

    // Step 8: delete returns no data.
    let (data, resp) = client.delete(&format!("{CONTACTS}/{id}"), None).unwrap();
    assert!(data.is_none());
    assert_eq!(resp.status, 204);

    // Step 9: get after delete is a generic HTTP error.
    let err = client.get(&format!("{CONTACTS}/{id}"), None).unwrap_err();
    match err {
        HubspotError::Http { status, message, .. } => {
            assert_eq!(status, 404);
            assert!(message.starts_with("404 Client Error: Not Found for url: "));
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

#[test]
fn rejected_token_is_invalid_auth() {
    // The server expects a different token than the client sends.
    let addr = spawn_server("pat-eu1-aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee");
    let client = client_for(addr, StatusPolicy::LogOnly);

    let err = client.get(CONTACTS, None).unwrap_err();
    assert!(matches!(err, HubspotError::InvalidAuth { .. }), "{err:?}");
    let resp = err.response().unwrap();
    assert_eq!(resp.status, 401);
    assert!(resp.body.contains("INVALID_AUTHENTICATION"));
}

#[test]
fn classified_statuses_over_http() {
    let client = client_for(spawn_server(TOKEN), StatusPolicy::LogOnly);

    let err = client.get("/status/429", None).unwrap_err();
    assert!(matches!(err, HubspotError::RateLimited { .. }), "{err:?}");
    assert_eq!(err.retry_after_secs(), Some(10));
    assert!(err.to_string().contains("10"));

    for code in ["502", "503"] {
        let err = client.get(&format!("/status/{code}"), None).unwrap_err();
        assert!(matches!(err, HubspotError::UpstreamTimeout { .. }), "{code}: {err:?}");
    }

    let err = client.delete("/status/409", None).unwrap_err();
    assert!(matches!(err, HubspotError::Duplicate { .. }));

    let err = client.get("/status/500", None).unwrap_err();
    assert!(matches!(err, HubspotError::Http { status: 500, .. }));

    let (data, _) = client.get("/status/200", None).unwrap();
    assert_eq!(data.unwrap()["status"], 200);

    let (data, resp) = client.delete("/status/200", None).unwrap();
    assert!(data.is_none());
    assert!(!resp.body.is_empty());
}

#[test]
fn bad_request_and_forbidden_follow_policy() {
    let addr = spawn_server(TOKEN);

    let lenient = client_for(addr, StatusPolicy::LogOnly);
    let (data, resp) = lenient
        .post(CONTACTS, &json!({ "properties": { "firstname": "NoEmail" } }), None)
        .unwrap();
    assert_eq!(resp.status, 400);
    assert_eq!(data.unwrap()["category"], "VALIDATION_ERROR");

    let (data, resp) = lenient.get("/status/403", None).unwrap();
    assert_eq!(resp.status, 403);
    assert_eq!(data.unwrap()["message"], "forced 403 response");

    let strict = client_for(addr, StatusPolicy::Strict);
    let err = strict
        .post(CONTACTS, &json!({ "properties": { "firstname": "NoEmail" } }), None)
        .unwrap_err();
    assert!(matches!(err, HubspotError::BadRequest { .. }), "{err:?}");
    assert!(err.to_string().contains("email is required"));

    let err = strict.get("/status/403", None).unwrap_err();
    assert!(matches!(err, HubspotError::AccessDenied { .. }), "{err:?}");
    assert!(err.to_string().contains("forced 403 response"));
}

#[test]
fn unreachable_host_is_transport_error() {
    // Bind and drop to get a port nobody is listening on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = client_for(addr, StatusPolicy::LogOnly);

    let err = client.get(CONTACTS, None).unwrap_err();
    assert!(matches!(err, HubspotError::Transport(_)), "{err:?}");
    assert!(err.response().is_none());
}

#[test]
fn non_utf8_bodies_keep_the_response() {
    const BODY: &[u8] = &[0xff, 0xfe, 0x00, 0x81];
    let client = client_for(spawn_raw_server(BODY, 2), StatusPolicy::LogOnly);

    let (data, resp) = client.delete(&format!("{CONTACTS}/1"), None).unwrap();
    assert!(data.is_none());
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body.chars().count(), 4);

    // A body that is expected to be JSON fails to parse, not to transfer.
    let err = client.get(&format!("{CONTACTS}/1"), None).unwrap_err();
    assert!(matches!(err, HubspotError::Deserialization(_)), "{err:?}");
}
