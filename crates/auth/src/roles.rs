use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried by accounts and tokens.
///
/// Roles are opaque strings at this layer. Only `"user"` (authors drafts) and
/// `"admin"` (publishes, deletes anything) carry meaning; any other value is
/// storable but admitted to no post operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const USER: Role = Role(Cow::Borrowed("user"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_user(&self) -> bool {
        self.as_str() == "user"
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == "admin"
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::USER
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
