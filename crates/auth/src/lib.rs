//! `quill-auth` — authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to hash and verify passwords, mint and validate bearer tokens, and decide
//! whether a principal's role admits a post operation.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;

pub use account::{Account, Registration};
pub use authorize::{AuthzError, PostAction, authorize};
pub use claims::{Claims, validate_claims};
pub use password::{BcryptHasher, MAX_PASSWORD_BYTES, PasswordError, PasswordHasher};
pub use principal::Principal;
pub use roles::Role;
pub use token::{Hs256TokenService, JwtValidator, TokenError, TokenIssuer};
