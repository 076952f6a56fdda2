//! Postgres-backed account and post stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Duplicate` | Username already registered |
//! | Database (foreign key violation) | `23503` | `Storage` | Post deleted while tags still reference it |
//! | Database (other) | Any other | `Storage` | Check constraint, syntax, etc. |
//! | Other | N/A | `Storage` | Pool closed, network errors, decode failures |
//!
//! Every post mutation runs inside a `sqlx::Transaction`; dropping a
//! transaction without committing rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use quill_auth::{Account, Role};
use quill_core::PostId;
use quill_posts::{Post, PostDraft, PostStatus, Tags};

use super::accounts::CredentialStore;
use super::posts::{PostFilter, PostRow, PostStore, PostTx};
use super::StoreError;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Create the `users`, `posts` and `tags` tables if they are missing.
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct AccountRow(Account);

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Account {
            username: row.try_get("username")?,
            password_hash: row.try_get("password")?,
            role: Role::new(row.try_get::<String, _>("role")?),
        }))
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip(self, account), fields(username = %account.username), err)]
    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (username, password, role) VALUES ($1, $2, $3)")
            .bind(&account.username)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_account", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT username, password, role FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account", e))?;

        row.map(|r| AccountRow::from_row(&r).map(|a| a.0))
            .transpose()
            .map_err(|e| map_sqlx_error("find_account", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Posts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresPostStore {
    pool: PgPool,
}

impl PostgresPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// The `posts` columns common to single-post loads and joined reads.
struct PostColumns {
    id: PostId,
    author: String,
    title: String,
    content: String,
    status: PostStatus,
    publish_date: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for PostColumns {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id = PostId::new(row.try_get::<i64, _>("id")?).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status = row
            .try_get::<String, _>("status")?
            .parse::<PostStatus>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id,
            author: row.try_get("author")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            status,
            publish_date: row.try_get("publish_date")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for PostRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let columns = PostColumns::from_row(row)?;
        Ok(PostRow {
            id: columns.id,
            author: columns.author,
            title: columns.title,
            content: columns.content,
            status: columns.status,
            publish_date: columns.publish_date,
            tag: row.try_get("label")?,
        })
    }
}

const ALL_ROWS_SQL: &str = r#"
    SELECT p.id, p.author, p.title, p.content, p.status, p.publish_date, t.label
    FROM posts p
    LEFT JOIN tags t ON t.post_id = p.id
    ORDER BY t.id
"#;

const TAGGED_ROWS_SQL: &str = r#"
    SELECT p.id, p.author, p.title, p.content, p.status, p.publish_date, t.label
    FROM posts p
    LEFT JOIN tags t ON t.post_id = p.id
    WHERE EXISTS (SELECT 1 FROM tags m WHERE m.post_id = p.id AND m.label = $1)
    ORDER BY t.id
"#;

#[async_trait]
impl PostStore for PostgresPostStore {
    async fn begin(&self) -> Result<Box<dyn PostTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresPostTx { tx }))
    }

    #[instrument(skip(self), err)]
    async fn fetch_rows(&self, filter: &PostFilter) -> Result<Vec<PostRow>, StoreError> {
        let rows = match filter {
            PostFilter::All => sqlx::query(ALL_ROWS_SQL).fetch_all(&self.pool).await,
            PostFilter::Tagged(label) => {
                sqlx::query(TAGGED_ROWS_SQL)
                    .bind(label)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("fetch_rows", e))?;

        rows.iter()
            .map(PostRow::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("fetch_rows", e))
    }
}

struct PostgresPostTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PostTx for PostgresPostTx {
    async fn load(&mut self, id: PostId) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(
            "SELECT id, author, title, content, status, publish_date FROM posts WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_post", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let columns = PostColumns::from_row(&row).map_err(|e| map_sqlx_error("load_post", e))?;

        let labels: Vec<String> = sqlx::query_scalar("SELECT label FROM tags WHERE post_id = $1 ORDER BY id")
            .bind(id.as_i64())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("load_tags", e))?;

        Ok(Some(Post {
            id: columns.id,
            author: columns.author,
            title: columns.title,
            content: columns.content,
            tags: labels.into_iter().collect(),
            status: columns.status,
            publish_date: columns.publish_date,
        }))
    }

    async fn insert_post(&mut self, author: &str, draft: &PostDraft) -> Result<PostId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO posts (author, title, content, status, publish_date)
             VALUES ($1, $2, $3, 'draft', NULL)
             RETURNING id",
        )
        .bind(author)
        .bind(draft.title())
        .bind(draft.content())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_post", e))?;

        PostId::new(id).map_err(|e| StoreError::Storage(e.to_string()))
    }

    async fn update_content(&mut self, id: PostId, title: &str, content: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE posts SET title = $1, content = $2 WHERE id = $3")
            .bind(title)
            .bind(content)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_content", e))?;
        Ok(())
    }

    async fn mark_published(&mut self, id: PostId, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE posts SET status = 'publish', publish_date = $1 WHERE id = $2")
            .bind(at)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("mark_published", e))?;
        Ok(())
    }

    async fn delete_post(&mut self, id: PostId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_post", e))?;
        Ok(())
    }

    async fn insert_tags(&mut self, id: PostId, tags: &Tags) -> Result<(), StoreError> {
        for label in tags.iter() {
            sqlx::query("INSERT INTO tags (label, post_id) VALUES ($1, $2)")
                .bind(label)
                .bind(id.as_i64())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_tags", e))?;
        }
        Ok(())
    }

    async fn delete_tags(&mut self, id: PostId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM tags WHERE post_id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_tags", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

/// Map SQLx errors to `StoreError`.
///
/// Only unique violations are distinguished; everything else is an opaque
/// storage failure.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Storage(msg),
            }
        }
        other => StoreError::Storage(format!("{operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_all_three_tables() {
        for table in ["users", "posts", "tags"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn non_database_errors_map_to_storage() {
        let err = map_sqlx_error("load_post", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Storage(ref m) if m.starts_with("load_post")));
    }
}
