use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use chrono::Utc;

use quill_core::PostId;

use crate::app::dto::{self, StatusMessage};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_post))
        .route("/update", put(update_post))
        .route("/publish", put(publish_post))
        .route("/delete", delete(delete_post))
        .route("/get", get(list_posts))
        .route("/search", get(search_posts))
}

pub async fn create_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    body: Result<Json<dto::CreatePostRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.posts.create(ctx.principal(), body.into()).await {
        Ok(post) => (StatusCode::OK, Json(post)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn update_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    body: Result<Json<dto::UpdatePostRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let (raw_id, submission) = body.into_parts();
    let id = match PostId::new(raw_id) {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid post id"),
    };

    match services.posts.update(ctx.principal(), id, submission).await {
        Ok(_) => (StatusCode::OK, "Post successfully updated").into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn publish_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    query: Result<Query<dto::PostIdQuery>, QueryRejection>,
) -> axum::response::Response {
    let id = match post_id_from_query(query) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.posts.publish(ctx.principal(), id, Utc::now()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(StatusMessage::published()),
        )
            .into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn delete_post(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    query: Result<Query<dto::PostIdQuery>, QueryRejection>,
) -> axum::response::Response {
    let id = match post_id_from_query(query) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.posts.delete(ctx.principal(), id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusMessage::success("Post successfully deleted")),
        )
            .into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn list_posts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.posts.list(ctx.principal()).await {
        Ok(posts) => (StatusCode::OK, Json(posts)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn search_posts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    query: Result<Query<dto::TagQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };

    let tag = query.tag.unwrap_or_default();
    match services.posts.search_by_tag(ctx.principal(), &tag).await {
        Ok(posts) => (StatusCode::OK, Json(posts)).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

fn post_id_from_query(
    query: Result<Query<dto::PostIdQuery>, QueryRejection>,
) -> Result<PostId, axum::response::Response> {
    let Query(query) = query.map_err(errors::query_rejection_to_response)?;

    let raw = query
        .id
        .ok_or_else(|| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "missing id parameter"))?;

    raw.parse::<PostId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid post id"))
}
