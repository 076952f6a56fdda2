use serde::{Deserialize, Serialize};

use quill_auth::Role;
use quill_infra::PostSubmission;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl RegisterRequest {
    /// An omitted or blank role registers a plain "user".
    pub fn role(&self) -> Role {
        match self.role.as_deref().map(str::trim) {
            Some(role) if !role.is_empty() => Role::new(role.to_string()),
            _ => Role::USER,
        }
    }
}

/// Body of `POST /posts`. Any `id`, `status` or `publish_date` a client
/// sends is ignored.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CreatePostRequest> for PostSubmission {
    fn from(body: CreatePostRequest) -> Self {
        PostSubmission {
            title: body.title,
            content: body.content,
            tags: body.tags,
        }
    }
}

/// Body of `PUT /posts/update`: the post's id plus its new content.
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UpdatePostRequest {
    pub fn into_parts(self) -> (i64, PostSubmission) {
        (
            self.id,
            PostSubmission {
                title: self.title,
                content: self.content,
                tags: self.tags,
            },
        )
    }
}

/// `?id=<post id>`, kept as text so a bad value maps to our own 400.
#[derive(Debug, Deserialize)]
pub struct PostIdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub tag: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: &'static str,
    pub status: &'static str,
}

impl StatusMessage {
    pub fn success(message: &'static str) -> Self {
        Self {
            message,
            status: "success",
        }
    }

    /// Reply body for a publish; existing clients match on both strings.
    pub fn published() -> Self {
        Self {
            message: "Admin successfully to publish",
            status: "success to publish",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub token: String,
}
