//! Credential-cache middleware.
//!
//! Runs once per call, before any guard: extracts the bearer token, decides
//! freshness, and reconciles stale claims against the store. The resulting
//! (possibly refreshed or destroyed) claims are handed to the guard chain
//! through the call context. Whenever reconciliation changed the claims, a
//! re-signed token is attached to the response so the caller's credential
//! rolls forward.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use clavis_auth::{SessionClaims, is_fresh, reconcile};

use crate::app::{AppState, errors};
use crate::context::CallContext;
use crate::request_context::request_meta;

pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

pub async fn call_context_middleware(
    State(state): State<Arc<AppState>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let meta = request_meta(req.headers(), state.config.trust_proxy_headers);
    let decoded = extract_bearer(req.headers()).and_then(|token| state.codec.decode(token));

    let now = Utc::now();
    let mut reissue: Option<SessionClaims> = None;

    let session = match decoded {
        Some(claims) => {
            let stale_subject = (!is_fresh(&claims, now, state.config.refresh_interval()))
                .then_some(claims.subject)
                .flatten();
            match stale_subject {
                // Stale: one store round trip bounds the revocation delay.
                Some(subject) => {
                    let current = match state.store.read(subject).await {
                        Ok(current) => current,
                        Err(err) => return errors::store_error_to_response(err),
                    };
                    let reconciled = reconcile(&claims, current.as_ref(), now).into_claims();
                    reissue = Some(reconciled.clone());
                    Some(reconciled)
                }
                // Fresh, or a subject-less token with nothing to reconcile.
                None => Some(claims),
            }
        }
        None => None,
    };

    req.extensions_mut().insert(CallContext::new(session, meta));

    let mut response = next.run(req).await;

    if let Some(claims) = reissue {
        if let Ok(token) = state.codec.encode(&claims, now) {
            if let Ok(value) = HeaderValue::from_str(&token) {
                response.headers_mut().insert(SESSION_TOKEN_HEADER, value);
            }
        }
    }

    response
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}
