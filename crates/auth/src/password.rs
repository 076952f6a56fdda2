//! One-way password verifiers.

use thiserror::Error;

/// bcrypt only reads this many bytes of input; anything longer is refused
/// rather than silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("password is longer than {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
}

/// Password hashing primitive.
///
/// `hash` embeds a fresh random salt in every verifier, so hashing the same
/// plaintext twice yields different outputs. `verify` never errors: a
/// mismatch and an unreadable verifier both answer `false`.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;
    fn verify(&self, plaintext: &str, verifier: &str) -> bool;
}

/// bcrypt with a configurable cost factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    fn verify(&self, plaintext: &str, verifier: &str) -> bool {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match bcrypt::verify(plaintext, verifier) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(error = %e, "stored password verifier is unreadable");
                false
            }
        }
    }
}
