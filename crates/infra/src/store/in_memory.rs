use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use quill_auth::Account;
use quill_core::PostId;
use quill_posts::{Post, PostDraft, PostStatus, Tags};

use super::accounts::CredentialStore;
use super::posts::{PostFilter, PostRow, PostStore, PostTx};
use super::StoreError;

/// In-memory credential store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        if accounts.contains_key(&account.username) {
            return Err(StoreError::Duplicate(format!(
                "username '{}' already registered",
                account.username
            )));
        }
        accounts.insert(account.username.clone(), account.clone());
        Ok(())
    }

    async fn find(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        Ok(accounts.get(username).cloned())
    }
}

#[derive(Debug, Clone)]
struct PostRecord {
    author: String,
    title: String,
    content: String,
    status: PostStatus,
    publish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct TagRecord {
    post_id: PostId,
    label: String,
}

/// The `posts` and `tags` tables. Tags stay in insertion (tag id) order.
#[derive(Debug, Clone, Default)]
struct PostTables {
    last_post_id: i64,
    posts: HashMap<PostId, PostRecord>,
    tags: Vec<TagRecord>,
}

impl PostTables {
    fn labels_of(&self, id: PostId) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter(move |t| t.post_id == id)
            .map(|t| t.label.as_str())
    }

    fn joined_rows(&self, id: PostId, record: &PostRecord) -> Vec<PostRow> {
        let row = |tag: Option<String>| PostRow {
            id,
            author: record.author.clone(),
            title: record.title.clone(),
            content: record.content.clone(),
            status: record.status,
            publish_date: record.publish_date,
            tag,
        };

        let rows: Vec<PostRow> = self.labels_of(id).map(|l| row(Some(l.to_string()))).collect();
        if rows.is_empty() { vec![row(None)] } else { rows }
    }
}

/// In-memory post store with real transaction semantics.
///
/// A transaction holds the table lock for its whole lifetime and works on a
/// staged copy; `commit` swaps the copy in, anything else discards it. Writers
/// are therefore serialized, and readers never observe a half-applied change.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPostStore {
    tables: Arc<Mutex<PostTables>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn begin(&self) -> Result<Box<dyn PostTx>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryPostTx { guard, staged }))
    }

    async fn fetch_rows(&self, filter: &PostFilter) -> Result<Vec<PostRow>, StoreError> {
        let tables = self.tables.lock().await;

        let rows = tables
            .posts
            .iter()
            .filter(|(id, _)| match filter {
                PostFilter::All => true,
                PostFilter::Tagged(label) => tables.labels_of(**id).any(|l| l == label),
            })
            .flat_map(|(id, record)| tables.joined_rows(*id, record))
            .collect();
        Ok(rows)
    }
}

struct InMemoryPostTx {
    guard: OwnedMutexGuard<PostTables>,
    staged: PostTables,
}

#[async_trait]
impl PostTx for InMemoryPostTx {
    async fn load(&mut self, id: PostId) -> Result<Option<Post>, StoreError> {
        let Some(record) = self.staged.posts.get(&id) else {
            return Ok(None);
        };

        Ok(Some(Post {
            id,
            author: record.author.clone(),
            title: record.title.clone(),
            content: record.content.clone(),
            tags: self.staged.labels_of(id).map(str::to_string).collect(),
            status: record.status,
            publish_date: record.publish_date,
        }))
    }

    async fn insert_post(&mut self, author: &str, draft: &PostDraft) -> Result<PostId, StoreError> {
        let next = self.staged.last_post_id + 1;
        let id = PostId::new(next).map_err(|e| StoreError::Storage(e.to_string()))?;

        self.staged.last_post_id = next;
        self.staged.posts.insert(
            id,
            PostRecord {
                author: author.to_string(),
                title: draft.title().to_string(),
                content: draft.content().to_string(),
                status: PostStatus::Draft,
                publish_date: None,
            },
        );
        Ok(id)
    }

    async fn update_content(&mut self, id: PostId, title: &str, content: &str) -> Result<(), StoreError> {
        if let Some(record) = self.staged.posts.get_mut(&id) {
            record.title = title.to_string();
            record.content = content.to_string();
        }
        Ok(())
    }

    async fn mark_published(&mut self, id: PostId, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(record) = self.staged.posts.get_mut(&id) {
            record.status = PostStatus::Publish;
            record.publish_date = Some(at);
        }
        Ok(())
    }

    async fn delete_post(&mut self, id: PostId) -> Result<(), StoreError> {
        if self.staged.tags.iter().any(|t| t.post_id == id) {
            return Err(StoreError::Storage(format!(
                "post {id} is still referenced by tags"
            )));
        }
        self.staged.posts.remove(&id);
        Ok(())
    }

    async fn insert_tags(&mut self, id: PostId, tags: &Tags) -> Result<(), StoreError> {
        if !self.staged.posts.contains_key(&id) {
            return Err(StoreError::Storage(format!("post {id} does not exist")));
        }
        self.staged.tags.extend(tags.iter().map(|label| TagRecord {
            post_id: id,
            label: label.to_string(),
        }));
        Ok(())
    }

    async fn delete_tags(&mut self, id: PostId) -> Result<(), StoreError> {
        self.staged.tags.retain(|t| t.post_id != id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryPostTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
