//! Registration and login.
//!
//! Hashing and verification run on the blocking pool, never on an async
//! worker thread.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use quill_auth::{PasswordError, PasswordHasher, Registration, Role, TokenError, TokenIssuer};
use quill_core::DomainError;

use crate::store::{CredentialStore, StoreError};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("username already registered")]
    Duplicate,

    /// Unknown username and wrong password are deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(StoreError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<StoreError> for AccountError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate(_) => AccountError::Duplicate,
            other => AccountError::Store(other),
        }
    }
}

impl From<DomainError> for AccountError {
    fn from(value: DomainError) -> Self {
        AccountError::BadRequest(value.to_string())
    }
}

impl From<tokio::task::JoinError> for AccountError {
    fn from(value: tokio::task::JoinError) -> Self {
        AccountError::Task(value.to_string())
    }
}

/// Plaintext behind the verifier checked when a login names no account.
const DECOY_PASSWORD: &str = "decoy-password";

pub struct AccountService<C> {
    store: C,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
    // Hashed on the first unknown-username login, at the hasher's cost.
    decoy: Arc<OnceLock<String>>,
}

impl<C: CredentialStore> AccountService<C> {
    pub fn new(store: C, hasher: Arc<dyn PasswordHasher>, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            store,
            hasher,
            issuer,
            decoy: Arc::new(OnceLock::new()),
        }
    }

    /// Store a new account with a salted verifier of `password`.
    #[instrument(skip(self, password, role), fields(role = %role), err)]
    pub async fn register(&self, username: &str, password: String, role: Role) -> Result<(), AccountError> {
        let registration = Registration::new(username, password, role)?;

        let hasher = Arc::clone(&self.hasher);
        let plaintext = registration.password().to_string();
        let verifier = tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await??;

        self.store.insert(&registration.into_account(verifier)).await?;
        tracing::info!("account registered");
        Ok(())
    }

    /// Verify credentials and mint a bearer token carrying the stored role.
    ///
    /// An unknown username still pays for one verification, so both failure
    /// paths take the same time.
    #[instrument(skip(self, password, now), err)]
    pub async fn login(&self, username: &str, password: &str, now: DateTime<Utc>) -> Result<String, AccountError> {
        let account = self.store.find(username.trim()).await?;

        let hasher = Arc::clone(&self.hasher);
        let decoy = Arc::clone(&self.decoy);
        let plaintext = password.to_string();
        let verifier = account.as_ref().map(|a| a.password_hash.clone());
        let matched = tokio::task::spawn_blocking(move || match verifier {
            Some(verifier) => hasher.verify(&plaintext, &verifier),
            None => {
                let decoy = decoy.get_or_init(|| hasher.hash(DECOY_PASSWORD).unwrap_or_default());
                hasher.verify(&plaintext, decoy);
                false
            }
        })
        .await?;

        let Some(account) = account.filter(|_| matched) else {
            return Err(AccountError::InvalidCredentials);
        };

        let token = self.issuer.issue(&account.username, &account.role, now)?;
        tracing::info!(role = %account.role, "login succeeded");
        Ok(token)
    }
}
