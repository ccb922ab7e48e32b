use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use clavis_auth::normalize_scopes;

use crate::app::{AppState, dto::SessionUserBody, errors};
use crate::context::CallContext;
use crate::guards::{GuardError, protected_procedure, scope_protected_procedure};

/// GET /rpc/me - the caller's current session claims.
///
/// Cached claims suffice here; the bounded staleness window is acceptable
/// for a self-view.
pub async fn me(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<CallContext>,
) -> axum::response::Response {
    let mut ctx = ctx;
    let user = match protected_procedure()
        .authorize_user(&mut ctx, state.store.as_ref())
        .await
    {
        Ok(user) => user,
        Err(e) => return errors::guard_error_to_response(e),
    };

    let Some(subject) = user.subject else {
        return errors::guard_error_to_response(GuardError::Unauthorized);
    };

    (
        StatusCode::OK,
        Json(json!({ "user": SessionUserBody::from_claims(subject, &user) })),
    )
        .into_response()
}

/// GET /rpc/auth-access - requires the `auth:read` scope, live-verified.
pub async fn auth_access(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<CallContext>,
) -> axum::response::Response {
    let mut ctx = ctx;
    let user = match scope_protected_procedure(normalize_scopes(["auth:read"]))
        .authorize_user(&mut ctx, state.store.as_ref())
        .await
    {
        Ok(user) => user,
        Err(e) => return errors::guard_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "role": user.role,
            "scopes": user.scopes,
        })),
    )
        .into_response()
}
