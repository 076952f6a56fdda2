use quill_auth::{Principal, Role};

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; only routes mounted behind it can
/// extract it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    pub fn role(&self) -> &Role {
        &self.principal.role
    }
}
