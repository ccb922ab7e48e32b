use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod auth;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/rpc/health", get(system::health))
        .route("/rpc/me", get(auth::me))
        .route("/rpc/auth-access", get(auth::auth_access))
        .route(
            "/rpc/admin/users/:user_id/authorization",
            post(admin::update_authorization),
        )
        .route(
            "/rpc/admin/users/:user_id/revoke-sessions",
            post(admin::revoke_sessions),
        )
}
