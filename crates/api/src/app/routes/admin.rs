//! Administrative authorization endpoints.
//!
//! Both endpoints are role-gated to administrators and bump the target's
//! token version, which revokes every outstanding credential for that user.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use clavis_auth::{Role, SecurityEvent};
use clavis_core::UserId;

use crate::app::{
    AppState,
    dto::{ClaimsBody, RevokeBody, UserAuthorizationInput},
    errors,
};
use crate::context::CallContext;
use crate::guards::role_protected_procedure;

fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id")
    })
}

/// POST /rpc/admin/users/:user_id/authorization - replace a user's role and
/// scopes, revoking their outstanding sessions.
pub async fn update_authorization(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<CallContext>,
    Path(user_id): Path<String>,
    Json(input): Json<UserAuthorizationInput>,
) -> axum::response::Response {
    let mut ctx = ctx;
    let actor = match role_protected_procedure([Role::Admin])
        .authorize_user(&mut ctx, state.store.as_ref())
        .await
    {
        Ok(actor) => actor,
        Err(e) => return errors::guard_error_to_response(e),
    };

    let target = match parse_user_id(&user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let updated = match state
        .store
        .update_role_and_scopes(target, input.role, input.normalized_scopes())
        .await
    {
        Ok(claims) => claims,
        Err(e) => return errors::store_error_to_response(e),
    };

    SecurityEvent::RoleChange.emit(json!({
        "requestId": ctx.meta.request_id,
        "correlationId": ctx.meta.correlation_id,
        "requestIp": ctx.meta.client_ip,
        "actorUserId": actor.subject.map(|id| id.to_string()),
        "targetUserId": target.to_string(),
        "role": updated.role,
        "scopesCount": updated.scopes.len(),
        "tokenVersion": updated.token_version,
        "source": "admin_update_user_authorization",
    }));

    (StatusCode::OK, Json(ClaimsBody::from(updated))).into_response()
}

/// POST /rpc/admin/users/:user_id/revoke-sessions - bump the token version
/// without touching privileges, forcing re-authentication.
pub async fn revoke_sessions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(ctx): Extension<CallContext>,
    Path(user_id): Path<String>,
) -> axum::response::Response {
    let mut ctx = ctx;
    if let Err(e) = role_protected_procedure([Role::Admin])
        .authorize_user(&mut ctx, state.store.as_ref())
        .await
    {
        return errors::guard_error_to_response(e);
    }

    let target = match parse_user_id(&user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let token_version = match state.store.revoke(target).await {
        Ok(version) => version,
        Err(e) => return errors::store_error_to_response(e),
    };

    (StatusCode::OK, Json(RevokeBody { token_version })).into_response()
}
