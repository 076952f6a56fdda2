//! Storage boundary for accounts and posts.
//!
//! The stores are external collaborators of the core: the traits here describe
//! exactly what the lifecycle engine and the account service consume, with an
//! in-memory implementation for tests/dev and a Postgres one for production.

pub mod accounts;
pub mod in_memory;
pub mod postgres;
pub mod posts;

pub use accounts::CredentialStore;
pub use in_memory::{InMemoryCredentialStore, InMemoryPostStore};
pub use postgres::{PostgresCredentialStore, PostgresPostStore, apply_schema};
pub use posts::{PostFilter, PostRow, PostStore, PostTx};

use thiserror::Error;

/// Storage operation error.
///
/// These are **infrastructure errors** as opposed to domain errors; apart from
/// `Duplicate` (a unique-key violation the caller can act on) they surface to
/// clients as a generic internal error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(String),
}
