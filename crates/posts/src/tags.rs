use serde::Serialize;

use quill_core::{DomainError, DomainResult};

/// The label set attached to a post.
///
/// Labels are trimmed and deduplicated, keeping first-occurrence order. A tag
/// set has no identity of its own: updating a post replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Build a tag set from client-supplied labels, rejecting blank ones.
    pub fn new<I, S>(labels: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = Self::default();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                return Err(DomainError::validation("tag label cannot be empty"));
            }
            tags.push(label);
        }
        Ok(tags)
    }

    fn push(&mut self, label: &str) {
        if !self.contains(label) {
            self.0.push(label.to_string());
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Collect labels already held by the store (no validation, dedup only).
impl FromIterator<String> for Tags {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut tags = Self::default();
        for label in iter {
            tags.push(&label);
        }
        tags
    }
}

impl Extend<String> for Tags {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        for label in iter {
            self.push(&label);
        }
    }
}
