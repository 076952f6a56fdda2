//! Bearer token issuance and validation (HS256 JWT).
//!
//! The signing secret is process-wide, static configuration handed in at
//! construction time. Tokens are stateless: nothing is stored server-side, so
//! a token stays valid until `exp` even if the account's role or password
//! changes afterwards.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{Claims, Role, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Header/payload could not be decoded into claims.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token has expired")]
    Expired,

    #[error("invalid token signature")]
    InvalidSignature,

    /// Signing failed while issuing a token.
    #[error("token creation failed: {0}")]
    Creation(String),
}

/// Mints signed tokens for authenticated accounts.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, username: &str, role: &Role, now: DateTime<Utc>) -> Result<String, TokenError>;
}

/// Verifies bearer tokens and yields their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError>;
}

/// HS256 token service over a shared symmetric secret.
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Expiry is checked by `validate_claims` against the caller's clock, so
    // jsonwebtoken's own (leeway-based) exp check stays off.
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);
        validation
    }

    fn decode_unverified(token: &str) -> Result<Claims, TokenError> {
        let mut validation = Self::validation();
        validation.insecure_disable_signature_validation();

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer for Hs256TokenService {
    fn issue(&self, username: &str, role: &Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Creation(format!("expiry {now} + {} overflows", self.ttl)))?;
        let claims = Claims {
            username: username.to_string(),
            role: role.clone(),
            expires_at,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Creation(e.to_string()))
    }
}

impl JwtValidator for Hs256TokenService {
    /// Structure first, then expiry, then signature: an expired token is
    /// reported as `Expired` whether or not its signature would verify.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = Self::decode_unverified(token)?;
        validate_claims(&claims, now)?;

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }
}
