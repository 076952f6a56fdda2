//! Account model for credential management.
//!
//! Accounts are created by registration and are immutable afterwards from the
//! point of view of this service.

use serde::{Deserialize, Serialize};

use quill_core::{DomainError, DomainResult};

use crate::{MAX_PASSWORD_BYTES, Role};

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// A stored account.
///
/// # Invariants
/// - `username` is the unique key.
/// - `password_hash` is a one-way verifier, never the plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl core::fmt::Debug for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration
// ─────────────────────────────────────────────────────────────────────────────

/// A validated registration request (plaintext password not yet hashed).
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    username: String,
    password: String,
    role: Role,
}

impl Registration {
    pub fn new(username: &str, password: impl Into<String>, role: Role) -> DomainResult<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }

        let password = password.into();
        if password.is_empty() {
            return Err(DomainError::validation("password cannot be empty"));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(DomainError::validation(format!(
                "password cannot exceed {MAX_PASSWORD_BYTES} bytes"
            )));
        }

        if role.as_str().trim().is_empty() {
            return Err(DomainError::validation("role cannot be empty"));
        }

        Ok(Self {
            username: username.to_string(),
            password,
            role,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Pair the registration with its password verifier.
    pub fn into_account(self, password_hash: String) -> Account {
        Account {
            username: self.username,
            password_hash,
            role: self.role,
        }
    }
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
