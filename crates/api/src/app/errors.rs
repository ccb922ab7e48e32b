use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use clavis_infra::ClaimsStoreError;

use crate::guards::GuardError;

pub fn guard_error_to_response(err: GuardError) -> axum::response::Response {
    match err {
        GuardError::Unauthorized => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication required",
        ),
        GuardError::Forbidden => json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "insufficient role or scope",
        ),
        GuardError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: ClaimsStoreError) -> axum::response::Response {
    match err {
        ClaimsStoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        ClaimsStoreError::CannotDemoteLastAdmin => json_error(
            StatusCode::CONFLICT,
            "conflict",
            "cannot remove admin role from the last administrator",
        ),
        ClaimsStoreError::AlreadyInitialized => json_error(
            StatusCode::CONFLICT,
            "conflict",
            "an administrator already exists",
        ),
        ClaimsStoreError::Database(e) => {
            tracing::error!(error = %e, "claims store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "internal error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
