//! Request correlation extraction.
//!
//! Callers may supply `x-request-id` / `x-correlation-id`; values are only
//! honored when well-formed, otherwise a fresh id is generated. Proxy IP
//! headers are trusted only when the operator opted in.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::context::RequestMeta;

const REQUEST_ID_MAX_LENGTH: usize = 128;

fn is_valid_header_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= REQUEST_ID_MAX_LENGTH
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-'))
}

fn header_id(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if is_valid_header_id(value) {
        Some(value.to_string())
    } else {
        None
    }
}

fn client_ip(headers: &HeaderMap, trust_proxy_headers: bool) -> Option<String> {
    if !trust_proxy_headers {
        return None;
    }

    if let Some(forwarded_for) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let first = forwarded_for.split(',').next().map(str::trim).unwrap_or("");
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn request_meta(headers: &HeaderMap, trust_proxy_headers: bool) -> RequestMeta {
    let request_id =
        header_id(headers, "x-request-id").unwrap_or_else(|| Uuid::now_v7().to_string());
    let correlation_id =
        header_id(headers, "x-correlation-id").unwrap_or_else(|| request_id.clone());

    RequestMeta {
        request_id,
        correlation_id,
        client_ip: client_ip(headers, trust_proxy_headers),
    }
}
