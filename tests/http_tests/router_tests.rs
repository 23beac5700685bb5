//! Tests for HTTP routing
//!
//! These tests verify:
//! - `/pks/add` and `/pks/lookup` status codes, bodies and headers
//! - Query and form-body field handling
//! - Unknown operations and paths outside `/pks/`
//! - Request counters

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, Response, StatusCode};
use pksd::http::{handle_request, MAX_FORM_BODY};
use pksd::metrics::{
    ADD_REQUESTS, ADD_REQUEST_ERRORS, LOOKUP_REQUESTS, REQUESTS, UNKNOWN_REQUESTS,
};
use pksd::store::BackendFault;
use pksd::PksHandler;

#[path = "../common/mod.rs"]
mod common;

use common::{handler_with, key_block, memory_handler, FlakyStore, LineParser, ALICE_FP};

// =============================================================================
// Helper Functions
// =============================================================================

fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn post_form(uri: &str, fields: &[(&str, &str)]) -> Request<Full<Bytes>> {
    let body = serde_urlencoded::to_string(fields).unwrap();
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

async fn send(handler: &Arc<PksHandler>, req: Request<Full<Bytes>>) -> (StatusCode, String) {
    let response: Response<Full<Bytes>> = handle_request(Arc::clone(handler), req).await;
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

// =============================================================================
// Add Tests
// =============================================================================

#[tokio::test]
async fn test_add_returns_created() {
    let (handler, counters) = memory_handler();
    let block = key_block(&[ALICE_FP], "alice");

    let (status, body) = send(&handler, post_form("/pks/add", &[("keytext", block.as_str())])).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, "Created\n");
    assert_eq!(counters.get(REQUESTS), 1);
    assert_eq!(counters.get(ADD_REQUESTS), 1);
}

#[tokio::test]
async fn test_add_without_keytext() {
    let (handler, counters) = memory_handler();

    let (status, body) = send(&handler, post_form("/pks/add", &[("other", "x")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "No key in request object\n");
    assert_eq!(counters.get_labeled(ADD_REQUEST_ERRORS, "missing-keytext"), 1);
}

#[tokio::test]
async fn test_add_ignores_keytext_in_query() {
    let (handler, counters) = memory_handler();
    let uri = format!("/pks/add?keytext=Fingerprint%3A+{}", ALICE_FP);

    let (status, _body) = send(&handler, get(&uri)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(counters.get_labeled(ADD_REQUEST_ERRORS, "missing-keytext"), 1);
}

#[tokio::test]
async fn test_add_with_unparseable_block() {
    let (handler, _counters) = memory_handler();

    let (status, body) = send(&handler, post_form("/pks/add", &[("keytext", "GARBAGE")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.ends_with('\n'));
}

#[tokio::test]
async fn test_add_rejects_oversized_body() {
    let store = Arc::new(FlakyStore::new());
    let (handler, _counters) = handler_with(Arc::clone(&store), LineParser);
    let block = key_block(&[ALICE_FP], &"a".repeat(MAX_FORM_BODY));

    let (status, body) = send(&handler, post_form("/pks/add", &[("keytext", block.as_str())])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("Invalid form data"));
    assert_eq!(store.write_attempts(), 0);
}

#[tokio::test]
async fn test_add_store_fault_is_server_error() {
    let store = Arc::new(FlakyStore::new());
    store.fail_writes_from(0, BackendFault::Unavailable);
    let (handler, _counters) = handler_with(store, LineParser);
    let block = key_block(&[ALICE_FP], "alice");

    let (status, _body) = send(&handler, post_form("/pks/add", &[("keytext", block.as_str())])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[tokio::test]
async fn test_lookup_returns_stored_block() {
    let (handler, counters) = memory_handler();
    let block = key_block(&[ALICE_FP], "alice");
    send(&handler, post_form("/pks/add", &[("keytext", block.as_str())])).await;

    let response = handle_request(Arc::clone(&handler), get("/pks/lookup?search=0x06FC811E")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/pgp-keys"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, block.as_bytes());
    assert_eq!(counters.get(LOOKUP_REQUESTS), 1);
}

#[tokio::test]
async fn test_lookup_search_in_form_body() {
    let (handler, _counters) = memory_handler();
    let block = key_block(&[ALICE_FP], "alice");
    send(&handler, post_form("/pks/add", &[("keytext", block.as_str())])).await;

    let (status, body) = send(&handler, post_form("/pks/lookup", &[("search", ALICE_FP)])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, block);
}

#[tokio::test]
async fn test_lookup_without_match_is_empty_ok() {
    let (handler, _counters) = memory_handler();

    let (status, body) = send(&handler, get("/pks/lookup?search=DEADBEEF")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_lookup_without_search() {
    let (handler, _counters) = memory_handler();

    let (status, body) = send(&handler, get("/pks/lookup")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.ends_with('\n'));
}

#[tokio::test]
async fn test_lookup_with_invalid_key_id() {
    let (handler, _counters) = memory_handler();

    let (status, _body) = send(&handler, get("/pks/lookup?search=xyz")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lookup_store_fault_is_server_error() {
    let store = Arc::new(FlakyStore::new());
    store.fail_scans(BackendFault::Other("disk on fire".to_string()));
    let (handler, _counters) = handler_with(store, LineParser);

    let (status, body) = send(&handler, get("/pks/lookup?search=06FC811E")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("disk on fire"));
}

// =============================================================================
// Unknown Operation and Path Tests
// =============================================================================

#[tokio::test]
async fn test_unknown_operation_names_the_operation() {
    let (handler, counters) = memory_handler();

    let (status, body) = send(&handler, get("/pks/bogus")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("bogus"));
    assert_eq!(body, "Requested operation bogus not supported\n");
    assert_eq!(counters.get(UNKNOWN_REQUESTS), 1);
}

#[tokio::test]
async fn test_empty_operation_is_unknown() {
    let (handler, counters) = memory_handler();

    let (status, _body) = send(&handler, get("/pks/")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(counters.get(UNKNOWN_REQUESTS), 1);
}

#[tokio::test]
async fn test_paths_outside_pks_are_teapots() {
    let (handler, counters) = memory_handler();

    for path in ["/", "/index.html", "/pks"] {
        let (status, body) = send(&handler, get(path)).await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT, "path {}", path);
        assert_eq!(body, "feature not supported\n");
    }

    assert_eq!(counters.get(REQUESTS), 0);
}

#[tokio::test]
async fn test_every_pks_request_is_counted() {
    let (handler, counters) = memory_handler();

    send(&handler, get("/pks/lookup?search=01")).await;
    send(&handler, get("/pks/bogus")).await;
    send(&handler, post_form("/pks/add", &[])).await;

    assert_eq!(counters.get(REQUESTS), 3);
    assert_eq!(counters.get(LOOKUP_REQUESTS), 1);
    assert_eq!(counters.get(UNKNOWN_REQUESTS), 1);
    assert_eq!(counters.get(ADD_REQUESTS), 1);
}
