use serde::{Deserialize, Serialize};

use crate::{Claims, Role};

/// Identity of an authenticated caller, scoped to a single request.
///
/// Built from verified token claims by the HTTP auth gate and passed
/// explicitly into every post operation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
            role: claims.role,
        }
    }
}
