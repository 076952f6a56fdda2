use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use quill_core::PostId;
use quill_posts::{Post, PostDraft, PostStatus, Tags};

use super::StoreError;

/// One row of the `posts ⟕ tags` left join.
///
/// A post with `n > 0` tags yields `n` rows; an untagged post yields one row
/// with `tag: None`. Rows arrive in no particular post order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: PostId,
    pub author: String,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub publish_date: Option<DateTime<Utc>>,
    pub tag: Option<String>,
}

/// Which posts a read should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    /// Posts carrying this label (each still joined against its full tag set).
    Tagged(String),
}

/// Durable post/tag persistence.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Open a transaction. Every mutation goes through one.
    async fn begin(&self) -> Result<Box<dyn PostTx>, StoreError>;

    /// Read the post/tag join outside of any transaction.
    async fn fetch_rows(&self, filter: &PostFilter) -> Result<Vec<PostRow>, StoreError>;
}

/// A unit of work against the post store.
///
/// Nothing is visible to other readers until `commit`. Dropping the
/// transaction without committing discards every write, so an early return
/// on any error path leaves posts and tags untouched.
#[async_trait]
pub trait PostTx: Send {
    async fn load(&mut self, id: PostId) -> Result<Option<Post>, StoreError>;

    /// Insert a post in `draft` status with no publish date; returns its id.
    async fn insert_post(&mut self, author: &str, draft: &PostDraft) -> Result<PostId, StoreError>;

    async fn update_content(&mut self, id: PostId, title: &str, content: &str) -> Result<(), StoreError>;

    async fn mark_published(&mut self, id: PostId, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn delete_post(&mut self, id: PostId) -> Result<(), StoreError>;

    async fn insert_tags(&mut self, id: PostId, tags: &Tags) -> Result<(), StoreError>;

    async fn delete_tags(&mut self, id: PostId) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> PostStore for Arc<S>
where
    S: PostStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn PostTx>, StoreError> {
        (**self).begin().await
    }

    async fn fetch_rows(&self, filter: &PostFilter) -> Result<Vec<PostRow>, StoreError> {
        (**self).fetch_rows(filter).await
    }
}
