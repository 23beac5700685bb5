//! Form values
//!
//! HKP clients send fields either in the query string or as an
//! `application/x-www-form-urlencoded` body. Both are merged here; a body
//! field shadows a query field of the same name.

use hyper::header::CONTENT_TYPE;
use hyper::{HeaderMap, Method, Uri};

use crate::error::{PksError, Result};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parsed request fields
#[derive(Debug, Default, Clone)]
pub struct FormValues {
    query: Vec<(String, String)>,
    body: Vec<(String, String)>,
}

impl FormValues {
    /// Parse the query string and, when the request carries a form body,
    /// the body
    pub fn parse(method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Result<Self> {
        let query = match uri.query() {
            Some(query) => decode(query.as_bytes())?,
            None => Vec::new(),
        };

        let body = if has_form_body(method, headers) {
            decode(body)?
        } else {
            Vec::new()
        };

        Ok(Self { query, body })
    }

    /// First value of `name` from the body only
    pub fn post_value(&self, name: &str) -> Option<&str> {
        first(&self.body, name)
    }

    /// First value of `name`, body before query
    pub fn value(&self, name: &str) -> Option<&str> {
        first(&self.body, name).or_else(|| first(&self.query, name))
    }
}

fn has_form_body(method: &Method, headers: &HeaderMap) -> bool {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH) {
        return false;
    }

    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

fn decode(input: &[u8]) -> Result<Vec<(String, String)>> {
    serde_urlencoded::from_bytes(input).map_err(|e| PksError::InvalidForm(e.to_string()))
}

fn first<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
