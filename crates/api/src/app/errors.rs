use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use quill_infra::{AccountError, LifecycleError};

const INTERNAL_MESSAGE: &str = "internal server error";

pub fn lifecycle_error_to_response(err: LifecycleError) -> axum::response::Response {
    match err {
        LifecycleError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        LifecycleError::Forbidden(msg) => {
            tracing::warn!(reason = %msg, "post operation forbidden");
            json_error(StatusCode::FORBIDDEN, "forbidden", msg)
        }
        LifecycleError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "post not found"),
        LifecycleError::Conflict(msg) => {
            tracing::warn!(reason = %msg, "post operation conflicts with its state");
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        LifecycleError::Store(e) => {
            tracing::error!(error = %e, "post store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", INTERNAL_MESSAGE)
        }
    }
}

pub fn account_error_to_response(err: AccountError) -> axum::response::Response {
    match err {
        AccountError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        AccountError::Duplicate => json_error(StatusCode::CONFLICT, "conflict", "username already registered"),
        AccountError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid username or password")
        }
        AccountError::Store(e) => {
            tracing::error!(error = %e, "credential store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", INTERNAL_MESSAGE)
        }
        other => {
            tracing::error!(error = %other, "account operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE)
        }
    }
}

/// Every JSON body failure (syntax, missing field, wrong type, content type) is a 400.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_json", rejection.body_text())
}

pub fn query_rejection_to_response(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
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
