use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::app::dto::{LoginRequest, LoginResponse, RegisterRequest, StatusMessage};
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.accounts.login(&body.username, &body.password, Utc::now()).await {
        Ok(token) => (
            StatusCode::OK,
            Json(LoginResponse {
                message: "Login successful",
                status: "success",
                token,
            }),
        )
            .into_response(),
        Err(e) => errors::account_error_to_response(e),
    }
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let role = body.role();
    match services.accounts.register(&body.username, body.password, role).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusMessage::success("Account registered successfully")),
        )
            .into_response(),
        Err(e) => errors::account_error_to_response(e),
    }
}
