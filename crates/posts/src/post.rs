use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_auth::Role;
use quill_core::{DomainError, DomainResult, PostId};

use crate::Tags;

/// Post status lifecycle: `draft` → `publish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Publish,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
        }
    }
}

impl core::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PostStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "publish" => Ok(PostStatus::Publish),
            other => Err(DomainError::validation(format!("unknown post status '{other}'"))),
        }
    }
}

/// Validated author-supplied content: what Create inserts and Update overwrites.
///
/// Deliberately carries no status or publish date, so whatever a client sends
/// for those fields cannot reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    title: String,
    content: String,
    tags: Tags,
}

impl PostDraft {
    pub fn new<I, S>(title: impl Into<String>, content: impl Into<String>, labels: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        Ok(Self {
            title,
            content: content.into(),
            tags: Tags::new(labels)?,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }
}

/// A blog post as held by the store.
///
/// # Invariants
/// - `publish_date` is `Some` exactly when `status == Publish`.
/// - Only drafts are editable; only the author may edit them.
/// - Published posts can only be deleted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub author: String,
    pub title: String,
    pub content: String,
    pub tags: Tags,
    pub status: PostStatus,
    pub publish_date: Option<DateTime<Utc>>,
}

impl Post {
    /// A freshly created post: always a draft, never dated.
    pub fn new_draft(id: PostId, author: impl Into<String>, draft: PostDraft) -> Self {
        Self {
            id,
            author: author.into(),
            title: draft.title,
            content: draft.content,
            tags: draft.tags,
            status: PostStatus::Draft,
            publish_date: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status == PostStatus::Draft
    }

    /// State gate first (published posts are frozen for everyone), then the
    /// authorship gate.
    pub fn ensure_editable_by(&self, username: &str) -> DomainResult<()> {
        if !self.is_draft() {
            return Err(DomainError::conflict("post is not a draft"));
        }
        if self.author != username {
            return Err(DomainError::forbidden("only the author may edit a draft"));
        }
        Ok(())
    }

    /// Overwrite title, content and the whole tag set.
    pub fn revise(&mut self, username: &str, draft: PostDraft) -> DomainResult<()> {
        self.ensure_editable_by(username)?;
        self.title = draft.title;
        self.content = draft.content;
        self.tags = draft.tags;
        Ok(())
    }

    /// Publishing is not idempotent: every call re-stamps `publish_date`.
    pub fn publish(&mut self, at: DateTime<Utc>) {
        self.status = PostStatus::Publish;
        self.publish_date = Some(at);
    }

    pub fn ensure_deletable_by(&self, role: &Role) -> DomainResult<()> {
        match self.status {
            PostStatus::Publish if !role.is_admin() => Err(DomainError::forbidden(
                "only an admin may delete a published post",
            )),
            PostStatus::Draft if !(role.is_user() || role.is_admin()) => Err(
                DomainError::forbidden(format!("role '{role}' may not delete posts")),
            ),
            _ => Ok(()),
        }
    }
}
