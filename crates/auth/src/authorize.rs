use serde::Serialize;
use thiserror::Error;

use crate::Principal;

/// Post operations subject to a role gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostAction {
    Create,
    Update,
    Publish,
    Delete,
    List,
    Search,
}

impl PostAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostAction::Create => "create",
            PostAction::Update => "update",
            PostAction::Publish => "publish",
            PostAction::Delete => "delete",
            PostAction::List => "list",
            PostAction::Search => "search",
        }
    }
}

impl core::fmt::Display for PostAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' may not {action} posts")]
    Forbidden { role: String, action: PostAction },
}

/// Role gate for a post operation.
///
/// - No IO
/// - No state: gates that depend on a post's status (deleting a published
///   post) are checked by the post itself once loaded.
pub fn authorize(principal: &Principal, action: PostAction) -> Result<(), AuthzError> {
    let role = &principal.role;
    let allowed = match action {
        PostAction::Create | PostAction::Update => role.is_user(),
        PostAction::Publish => role.is_admin(),
        PostAction::Delete | PostAction::List | PostAction::Search => {
            role.is_user() || role.is_admin()
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: role.as_str().to_string(),
            action,
        })
    }
}
