//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use clavis_infra::ClaimsStore;

use crate::config::AppConfig;
use crate::middleware;
use crate::session::TokenCodec;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared per-process state: the claims store, the session token codec, and
/// the validated configuration.
pub struct AppState {
    pub store: Arc<dyn ClaimsStore>,
    pub codec: TokenCodec,
    pub config: AppConfig,
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(config: AppConfig, store: Arc<dyn ClaimsStore>) -> Router {
    let codec = TokenCodec::new(&config.auth_secret, config.session_max_age_secs);
    let state = Arc::new(AppState {
        store,
        codec,
        config,
    });

    routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(Arc::clone(&state)))
            .layer(axum::middleware::from_fn_with_state(
                state,
                middleware::call_context_middleware,
            )),
    )
}
