use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use quill_auth::{JwtValidator, Principal, TokenError};

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .jwt
        .validate(token, Utc::now())
        .map_err(token_error_to_response)?;

    req.extensions_mut()
        .insert(PrincipalContext::new(Principal::from(claims)));

    Ok(next.run(req).await)
}

fn token_error_to_response(err: TokenError) -> Response {
    tracing::debug!(error = %err, "bearer token rejected");
    match err {
        TokenError::Expired => json_error(StatusCode::UNAUTHORIZED, "token_expired", err.to_string()),
        TokenError::InvalidSignature => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_signature", err.to_string())
        }
        TokenError::Malformed(_) => json_error(StatusCode::BAD_REQUEST, "malformed_token", err.to_string()),
        TokenError::Creation(_) => json_error(StatusCode::UNAUTHORIZED, "invalid_token", err.to_string()),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "missing_token", "missing authorization header"))?;

    let malformed = || {
        json_error(
            StatusCode::UNAUTHORIZED,
            "malformed_header",
            "authorization header must be 'Bearer <token>'",
        )
    };

    let header = header.to_str().map_err(|_| malformed())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(malformed)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(malformed());
    }

    Ok(token)
}
