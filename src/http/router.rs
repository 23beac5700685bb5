//! Request routing
//!
//! ```text
//! /pks/add      ──► PksHandler::add     (201 | 400 | 500)
//! /pks/lookup   ──► PksHandler::get     (200 | 400 | 500)
//! /pks/<other>  ──► 400 "Requested operation <other> not supported"
//! anything else ──► 418
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};

use super::form::FormValues;
use crate::error::{PksError, Result};
use crate::metrics::{ADD_REQUESTS, LOOKUP_REQUESTS, REQUESTS, UNKNOWN_REQUESTS};
use crate::pks::PksHandler;

/// Path prefix served by the key server
pub const PKS_PREFIX: &str = "/pks/";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const PGP_KEYS: &str = "application/pgp-keys";

/// Largest request body accepted for form decoding (10 MB)
pub const MAX_FORM_BODY: usize = 10 << 20;

/// Operation named by a `/pks/` path: its first non-empty segment
pub fn operation(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(PKS_PREFIX)?;
    Some(rest.split('/').find(|segment| !segment.is_empty()).unwrap_or(""))
}

/// Serve one HTTP request
pub async fn handle_request<B>(handler: Arc<PksHandler>, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let op = match operation(&path) {
        Some(op) => op.to_string(),
        None => {
            tracing::info!("No handler for {} {}", req.method(), path);
            return text(StatusCode::IM_A_TEAPOT, "feature not supported");
        }
    };

    handler.metrics().increment(REQUESTS);

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, MAX_FORM_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return error_response(&PksError::InvalidForm(e.to_string()));
        }
    };

    let form = match FormValues::parse(&parts.method, &parts.uri, &parts.headers, &body) {
        Ok(form) => form,
        Err(e) => {
            tracing::debug!("Rejecting {} request: {}", op, e);
            return error_response(&e);
        }
    };

    tracing::debug!("{} /pks/{}", parts.method, op);

    match op.as_str() {
        "add" => {
            handler.metrics().increment(ADD_REQUESTS);
            let keytext = form.post_value("keytext").unwrap_or_default().to_string();
            match add(handler, keytext).await {
                Ok(status) => text(status, "Created"),
                Err(e) => error_response(&e),
            }
        }
        "lookup" => {
            handler.metrics().increment(LOOKUP_REQUESTS);
            let search = form.value("search").unwrap_or_default().to_string();
            match lookup(handler, search).await {
                Ok(keys) => keys_response(keys),
                Err(e) => error_response(&e),
            }
        }
        _ => {
            handler.metrics().increment(UNKNOWN_REQUESTS);
            tracing::info!("Unsupported operation {:?}", op);
            text(
                StatusCode::BAD_REQUEST,
                &format!("Requested operation {} not supported", op),
            )
        }
    }
}

async fn add(handler: Arc<PksHandler>, keytext: String) -> Result<StatusCode> {
    tokio::task::spawn_blocking(move || handler.add(&keytext))
        .await
        .map_err(|e| PksError::Runtime(e.to_string()))?
}

async fn lookup(handler: Arc<PksHandler>, search: String) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let mut keys = Vec::new();
        handler.get(&mut keys, &search)?;
        Ok(keys)
    })
    .await
    .map_err(|e| PksError::Runtime(e.to_string()))?
}

fn error_response(e: &PksError) -> Response<Full<Bytes>> {
    if !e.is_input_error() {
        tracing::error!("Request failed: {}", e);
    }
    text(e.status(), &e.to_string())
}

fn keys_response(keys: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(keys)));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(PGP_KEYS));
    response
}

/// Plain text response; the body always ends in a newline
fn text(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut body = message.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}
