use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::app::{AppState, errors};
use crate::context::CallContext;
use crate::guards::public_procedure;

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    pub ping: Option<String>,
}

/// GET /rpc/health - liveness probe, no authorization.
pub async fn health(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<CallContext>,
    Query(query): Query<HealthQuery>,
) -> axum::response::Response {
    let mut ctx = ctx;
    if let Err(e) = public_procedure().authorize(&mut ctx, state.store.as_ref()).await {
        return errors::guard_error_to_response(e);
    }

    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "ping": query.ping.unwrap_or_else(|| "pong".to_string()),
            "ts": Utc::now().timestamp_millis(),
        })),
    )
        .into_response()
}
