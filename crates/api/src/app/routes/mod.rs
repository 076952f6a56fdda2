use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod posts;
pub mod system;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/", get(system::welcome))
        .route("/health", get(system::health))
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
}

/// Endpoints behind the auth middleware.
pub fn protected_router() -> Router {
    Router::new().nest("/posts", posts::router())
}
