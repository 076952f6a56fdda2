use std::sync::Arc;

use async_trait::async_trait;

use quill_auth::Account;

use super::StoreError;

/// Durable mapping username → password verifier + role.
///
/// `insert` must fail with `StoreError::Duplicate` when the username exists.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert(&self, account: &Account) -> Result<(), StoreError>;
    async fn find(&self, username: &str) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
impl<S> CredentialStore for Arc<S>
where
    S: CredentialStore + ?Sized,
{
    async fn insert(&self, account: &Account) -> Result<(), StoreError> {
        (**self).insert(account).await
    }

    async fn find(&self, username: &str) -> Result<Option<Account>, StoreError> {
        (**self).find(username).await
    }
}
