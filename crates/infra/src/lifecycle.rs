//! Post lifecycle orchestration.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! Principal + input
//!   ↓
//! 1. Role gate (`quill_auth::authorize`)
//!   ↓
//! 2. Open a store transaction, load the post if the operation targets one
//!   ↓
//! 3. State/ownership gate on the loaded post
//!   ↓
//! 4. Validate input (title, tag labels)
//!   ↓
//! 5. Write, then commit (any failure rolls back)
//! ```
//!
//! A published post therefore answers `Conflict` to an update whatever the
//! payload. Reads skip steps 2-5 and aggregate the post/tag join into whole posts,
//! ordered by ascending id. Tag search rejects a blank tag before the role
//! gate runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use quill_auth::{AuthzError, PostAction, Principal, authorize};
use quill_core::{DomainError, PostId};
use quill_posts::{Post, PostDraft, Tags};

use crate::store::{PostFilter, PostRow, PostStore, PostTx, StoreError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Malformed or incomplete input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Role, ownership or state gate refused the caller.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("post not found")]
    NotFound,

    /// The post's current status does not admit the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for LifecycleError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => LifecycleError::BadRequest(msg),
            DomainError::NotFound => LifecycleError::NotFound,
            DomainError::Conflict(msg) => LifecycleError::Conflict(msg),
            DomainError::Forbidden(msg) => LifecycleError::Forbidden(msg),
        }
    }
}

impl From<AuthzError> for LifecycleError {
    fn from(value: AuthzError) -> Self {
        LifecycleError::Forbidden(value.to_string())
    }
}

/// Author-supplied fields for create and update, before validation.
///
/// Status and publish date are intentionally absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostSubmission {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl PostSubmission {
    fn into_draft(self) -> Result<PostDraft, LifecycleError> {
        Ok(PostDraft::new(self.title, self.content, &self.tags)?)
    }
}

/// Reusable engine for every post operation.
///
/// Generic over the store so tests run against `InMemoryPostStore` and the
/// binary against `PostgresPostStore`.
#[derive(Debug, Clone)]
pub struct PostLifecycle<S> {
    store: S,
}

impl<S: PostStore> PostLifecycle<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Insert a new draft owned by the caller, with its tags.
    #[instrument(skip_all, fields(username = %principal.username, role = %principal.role))]
    pub async fn create(&self, principal: &Principal, submission: PostSubmission) -> Result<Post, LifecycleError> {
        authorize(principal, PostAction::Create)?;
        let draft = submission.into_draft()?;

        let mut tx = self.store.begin().await?;
        let result = insert_draft(tx.as_mut(), &principal.username, draft).await;
        let post = settle(tx, result).await?;

        tracing::info!(post_id = %post.id, tags = post.tags.len(), "draft created");
        Ok(post)
    }

    /// Overwrite title, content and the full tag set of a draft the caller wrote.
    #[instrument(skip_all, fields(username = %principal.username, role = %principal.role, post_id = %id))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: PostId,
        submission: PostSubmission,
    ) -> Result<Post, LifecycleError> {
        authorize(principal, PostAction::Update)?;

        let mut tx = self.store.begin().await?;
        let result = revise_draft(tx.as_mut(), &principal.username, id, submission).await;
        let post = settle(tx, result).await?;

        tracing::info!(tags = post.tags.len(), "draft updated");
        Ok(post)
    }

    /// Flip a post to `publish` and stamp `at` as its publish date.
    ///
    /// Already-published posts are re-stamped.
    #[instrument(skip_all, fields(username = %principal.username, role = %principal.role, post_id = %id))]
    pub async fn publish(&self, principal: &Principal, id: PostId, at: DateTime<Utc>) -> Result<Post, LifecycleError> {
        authorize(principal, PostAction::Publish)?;

        let mut tx = self.store.begin().await?;
        let result = publish_post(tx.as_mut(), id, at).await;
        let post = settle(tx, result).await?;

        tracing::info!(publish_date = %at, "post published");
        Ok(post)
    }

    /// Remove a post and its tags. Published posts need an admin.
    #[instrument(skip_all, fields(username = %principal.username, role = %principal.role, post_id = %id))]
    pub async fn delete(&self, principal: &Principal, id: PostId) -> Result<(), LifecycleError> {
        authorize(principal, PostAction::Delete)?;

        let mut tx = self.store.begin().await?;
        let result = delete_post(tx.as_mut(), principal, id).await;
        settle(tx, result).await?;

        tracing::info!("post deleted");
        Ok(())
    }

    /// Every post with its full tag set, ascending by id.
    #[instrument(skip_all, fields(username = %principal.username, role = %principal.role))]
    pub async fn list(&self, principal: &Principal) -> Result<Vec<Post>, LifecycleError> {
        authorize(principal, PostAction::List)?;

        let rows = self.store.fetch_rows(&PostFilter::All).await?;
        Ok(aggregate_rows(rows))
    }

    /// Posts carrying `tag`, each with its full tag set, ascending by id.
    #[instrument(skip_all, fields(username = %principal.username, role = %principal.role, tag = %tag))]
    pub async fn search_by_tag(&self, principal: &Principal, tag: &str) -> Result<Vec<Post>, LifecycleError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(LifecycleError::BadRequest("missing tag parameter".to_string()));
        }
        authorize(principal, PostAction::Search)?;

        let rows = self.store.fetch_rows(&PostFilter::Tagged(tag.to_string())).await?;
        Ok(aggregate_rows(rows))
    }
}

async fn insert_draft(tx: &mut dyn PostTx, author: &str, draft: PostDraft) -> Result<Post, LifecycleError> {
    let id = tx.insert_post(author, &draft).await?;
    tx.insert_tags(id, draft.tags()).await?;
    Ok(Post::new_draft(id, author, draft))
}

async fn revise_draft(
    tx: &mut dyn PostTx,
    username: &str,
    id: PostId,
    submission: PostSubmission,
) -> Result<Post, LifecycleError> {
    let mut post = tx.load(id).await?.ok_or(LifecycleError::NotFound)?;
    post.ensure_editable_by(username)?;
    post.revise(username, submission.into_draft()?)?;

    tx.update_content(id, &post.title, &post.content).await?;
    tx.delete_tags(id).await?;
    tx.insert_tags(id, &post.tags).await?;
    Ok(post)
}

async fn publish_post(tx: &mut dyn PostTx, id: PostId, at: DateTime<Utc>) -> Result<Post, LifecycleError> {
    let mut post = tx.load(id).await?.ok_or(LifecycleError::NotFound)?;
    post.publish(at);
    tx.mark_published(id, at).await?;
    Ok(post)
}

async fn delete_post(tx: &mut dyn PostTx, principal: &Principal, id: PostId) -> Result<(), LifecycleError> {
    let post = tx.load(id).await?.ok_or(LifecycleError::NotFound)?;
    post.ensure_deletable_by(&principal.role)?;

    // Tags reference the post, so they go first.
    tx.delete_tags(id).await?;
    tx.delete_post(id).await?;
    Ok(())
}

/// Commit on success, roll back on failure.
async fn settle<T>(tx: Box<dyn PostTx>, result: Result<T, LifecycleError>) -> Result<T, LifecycleError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

/// Group join rows into whole posts, ascending by id.
///
/// Tag order within a post follows row order; duplicates collapse.
pub fn aggregate_rows(rows: impl IntoIterator<Item = PostRow>) -> Vec<Post> {
    let mut posts: BTreeMap<PostId, Post> = BTreeMap::new();

    for row in rows {
        let PostRow {
            id,
            author,
            title,
            content,
            status,
            publish_date,
            tag,
        } = row;

        let post = posts.entry(id).or_insert_with(|| Post {
            id,
            author,
            title,
            content,
            tags: Tags::default(),
            status,
            publish_date,
        });
        post.tags.extend(tag);
    }

    posts.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;
    use proptest::prelude::*;

    use quill_auth::Role;
    use quill_posts::PostStatus;

    use crate::store::InMemoryPostStore;

    fn alice() -> Principal {
        Principal::new("alice", Role::USER)
    }

    fn bob() -> Principal {
        Principal::new("bob", Role::USER)
    }

    fn root() -> Principal {
        Principal::new("root", Role::ADMIN)
    }

    fn submission(title: &str, tags: &[&str]) -> PostSubmission {
        PostSubmission {
            title: title.to_string(),
            content: format!("{title} body"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn engine() -> PostLifecycle<InMemoryPostStore> {
        PostLifecycle::new(InMemoryPostStore::new())
    }

    fn id(raw: i64) -> PostId {
        PostId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn create_yields_draft_owned_by_caller() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &["go", "db"])).await.unwrap();

        assert_eq!(post.author, "alice");
        assert_eq!(post.status, PostStatus::Draft);
        assert_eq!(post.publish_date, None);

        let listed = engine.list(&alice()).await.unwrap();
        assert_eq!(listed, vec![post]);
    }

    #[tokio::test]
    async fn admin_cannot_create_or_update() {
        let engine = engine();
        let err = engine.create(&root(), submission("T", &[])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));

        let post = engine.create(&alice(), submission("T", &[])).await.unwrap();
        let err = engine.update(&root(), post.id, submission("T2", &[])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
    }

    #[tokio::test]
    async fn blank_title_is_a_bad_request_and_writes_nothing() {
        let engine = engine();
        let err = engine.create(&alice(), submission("  ", &["go"])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::BadRequest(_)));
        assert!(engine.list(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_the_whole_tag_set() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &["go", "db"])).await.unwrap();

        engine.update(&alice(), post.id, submission("T2", &["x"])).await.unwrap();

        let listed = engine.list(&alice()).await.unwrap();
        assert_eq!(listed[0].title, "T2");
        assert_eq!(listed[0].tags.as_slice(), ["x"]);
        assert!(engine.search_by_tag(&alice(), "go").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_by_another_user_is_forbidden() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &["go"])).await.unwrap();

        let err = engine.update(&bob(), post.id, submission("hijack", &[])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert_eq!(engine.list(&alice()).await.unwrap(), vec![post]);
    }

    #[tokio::test]
    async fn update_of_published_post_conflicts() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &["go"])).await.unwrap();
        engine.publish(&root(), post.id, Utc::now()).await.unwrap();

        let err = engine.update(&alice(), post.id, submission("T2", &[])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));
    }

    #[tokio::test]
    async fn published_post_conflicts_even_with_an_invalid_payload() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &["go"])).await.unwrap();
        engine.publish(&root(), post.id, Utc::now()).await.unwrap();

        let blank_title = engine.update(&alice(), post.id, submission("", &["go"])).await.unwrap_err();
        assert!(matches!(blank_title, LifecycleError::Conflict(_)), "{blank_title:?}");

        let blank_tag = engine.update(&alice(), post.id, submission("T2", &["  "])).await.unwrap_err();
        assert!(matches!(blank_tag, LifecycleError::Conflict(_)), "{blank_tag:?}");
    }

    #[tokio::test]
    async fn invalid_update_of_own_draft_is_a_bad_request_and_rolls_back() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &["go"])).await.unwrap();

        let err = engine.update(&alice(), post.id, submission(" ", &["x"])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::BadRequest(_)));
        assert_eq!(engine.list(&alice()).await.unwrap(), vec![post]);
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let engine = engine();
        let missing = id(42);

        assert!(matches!(
            engine.update(&alice(), missing, submission("T", &[])).await,
            Err(LifecycleError::NotFound)
        ));
        assert!(matches!(
            engine.publish(&root(), missing, Utc::now()).await,
            Err(LifecycleError::NotFound)
        ));
        assert!(matches!(engine.delete(&alice(), missing).await, Err(LifecycleError::NotFound)));
    }

    #[tokio::test]
    async fn only_admin_publishes_and_republish_restamps() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &[])).await.unwrap();

        let err = engine.publish(&alice(), post.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));

        let first = Utc::now();
        let published = engine.publish(&root(), post.id, first).await.unwrap();
        assert_eq!(published.status, PostStatus::Publish);
        assert_eq!(published.publish_date, Some(first));

        let second = first + Duration::minutes(1);
        engine.publish(&root(), post.id, second).await.unwrap();
        let listed = engine.list(&root()).await.unwrap();
        assert_eq!(listed[0].publish_date, Some(second));
    }

    #[tokio::test]
    async fn published_post_needs_admin_to_delete() {
        let engine = engine();
        let post = engine.create(&alice(), submission("T", &["go"])).await.unwrap();
        engine.publish(&root(), post.id, Utc::now()).await.unwrap();

        let err = engine.delete(&alice(), post.id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));

        engine.delete(&root(), post.id).await.unwrap();
        assert!(engine.list(&root()).await.unwrap().is_empty());
        assert!(engine.search_by_tag(&root(), "go").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn draft_is_deletable_by_user_or_admin() {
        let engine = engine();
        let a = engine.create(&alice(), submission("A", &["go"])).await.unwrap();
        let b = engine.create(&alice(), submission("B", &[])).await.unwrap();

        engine.delete(&bob(), a.id).await.unwrap();
        engine.delete(&root(), b.id).await.unwrap();
        assert!(engine.list(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_role_is_forbidden_everywhere() {
        let engine = engine();
        let guest = Principal::new("eve", Role::new("guest"));

        assert!(matches!(engine.list(&guest).await, Err(LifecycleError::Forbidden(_))));
        assert!(matches!(
            engine.search_by_tag(&guest, "go").await,
            Err(LifecycleError::Forbidden(_))
        ));
        assert!(matches!(engine.delete(&guest, id(1)).await, Err(LifecycleError::Forbidden(_))));
    }

    #[tokio::test]
    async fn list_is_ordered_by_id_and_includes_untagged_posts() {
        let engine = engine();
        for title in ["first", "second", "third"] {
            engine.create(&alice(), submission(title, &[])).await.unwrap();
        }
        engine.create(&alice(), submission("fourth", &["go"])).await.unwrap();

        let listed = engine.list(&alice()).await.unwrap();
        let titles: Vec<_> = listed.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third", "fourth"]);
        assert!(listed.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn search_returns_full_tag_sets_of_matching_posts() {
        let engine = engine();
        let a = engine.create(&alice(), submission("A", &["go", "rust"])).await.unwrap();
        engine.create(&alice(), submission("B", &["db"])).await.unwrap();

        let found = engine.search_by_tag(&alice(), "go").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
        assert_eq!(found[0].tags.as_slice(), ["go", "rust"]);
    }

    #[tokio::test]
    async fn search_with_blank_tag_is_a_bad_request() {
        let engine = engine();
        let err = engine.search_by_tag(&alice(), " ").await.unwrap_err();
        assert!(matches!(err, LifecycleError::BadRequest(_)));
    }

    /// Wraps the in-memory store so that `insert_tags` fails once armed.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: InMemoryPostStore,
        fail_tags: Arc<AtomicBool>,
    }

    struct FlakyTx {
        inner: Box<dyn PostTx>,
        fail_tags: bool,
    }

    #[async_trait]
    impl PostStore for FlakyStore {
        async fn begin(&self) -> Result<Box<dyn PostTx>, StoreError> {
            Ok(Box::new(FlakyTx {
                inner: self.inner.begin().await?,
                fail_tags: self.fail_tags.load(Ordering::SeqCst),
            }))
        }

        async fn fetch_rows(&self, filter: &PostFilter) -> Result<Vec<PostRow>, StoreError> {
            self.inner.fetch_rows(filter).await
        }
    }

    #[async_trait]
    impl PostTx for FlakyTx {
        async fn load(&mut self, id: PostId) -> Result<Option<Post>, StoreError> {
            self.inner.load(id).await
        }

        async fn insert_post(&mut self, author: &str, draft: &PostDraft) -> Result<PostId, StoreError> {
            self.inner.insert_post(author, draft).await
        }

        async fn update_content(&mut self, id: PostId, title: &str, content: &str) -> Result<(), StoreError> {
            self.inner.update_content(id, title, content).await
        }

        async fn mark_published(&mut self, id: PostId, at: DateTime<Utc>) -> Result<(), StoreError> {
            self.inner.mark_published(id, at).await
        }

        async fn delete_post(&mut self, id: PostId) -> Result<(), StoreError> {
            self.inner.delete_post(id).await
        }

        async fn insert_tags(&mut self, id: PostId, tags: &Tags) -> Result<(), StoreError> {
            if self.fail_tags {
                return Err(StoreError::Storage("tags table unavailable".to_string()));
            }
            self.inner.insert_tags(id, tags).await
        }

        async fn delete_tags(&mut self, id: PostId) -> Result<(), StoreError> {
            self.inner.delete_tags(id).await
        }

        async fn commit(self: Box<Self>) -> Result<(), StoreError> {
            self.inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn failed_tag_insert_rolls_back_the_new_post() {
        let store = FlakyStore::default();
        store.fail_tags.store(true, Ordering::SeqCst);
        let engine = PostLifecycle::new(store);

        let err = engine.create(&alice(), submission("T", &["go"])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Store(StoreError::Storage(_))));
        assert!(engine.list(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_tag_replacement_keeps_old_content_and_tags() {
        let store = FlakyStore::default();
        let engine = PostLifecycle::new(store.clone());
        let post = engine.create(&alice(), submission("T", &["go", "db"])).await.unwrap();

        store.fail_tags.store(true, Ordering::SeqCst);
        let err = engine.update(&alice(), post.id, submission("T2", &["x"])).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Store(_)));

        assert_eq!(engine.list(&alice()).await.unwrap(), vec![post]);
    }

    fn row(id: i64, tag: Option<&str>) -> PostRow {
        PostRow {
            id: PostId::new(id).unwrap(),
            author: "alice".to_string(),
            title: format!("post {id}"),
            content: String::new(),
            status: PostStatus::Draft,
            publish_date: None,
            tag: tag.map(str::to_string),
        }
    }

    #[test]
    fn aggregation_groups_rows_and_sorts_by_id() {
        let rows = vec![
            row(3, Some("go")),
            row(1, None),
            row(3, Some("db")),
            row(2, Some("go")),
        ];

        let posts = aggregate_rows(rows);
        let ids: Vec<i64> = posts.iter().map(|p| p.id.as_i64()).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert!(posts[0].tags.is_empty());
        assert_eq!(posts[2].tags.as_slice(), ["go", "db"]);
    }

    proptest! {
        /// Whatever order the join rows arrive in, aggregation yields one post
        /// per id, strictly ascending.
        #[test]
        fn aggregation_is_strictly_ascending(ids in proptest::collection::vec(1i64..50, 0..40)) {
            let rows: Vec<PostRow> = ids.iter().map(|id| row(*id, Some("t"))).collect();
            let posts = aggregate_rows(rows);

            prop_assert!(posts.windows(2).all(|w| w[0].id < w[1].id));
            let mut distinct = ids.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(posts.len(), distinct.len());
        }
    }
}
