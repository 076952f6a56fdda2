use axum::http::StatusCode;

pub async fn welcome() -> &'static str {
    "WELCOME TO BLOGGER SIMPLE"
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
