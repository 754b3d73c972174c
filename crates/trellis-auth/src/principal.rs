use serde::{Deserialize, Serialize};

/// Canonical authenticated actor. Built exactly once at the authentication
/// boundary; downstream code never probes alternative claim shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Some(role.into()),
        }
    }

    /// A principal whose token carried no role claim. Fails every
    /// permission check (fail closed) but still has an identity, so the
    /// ownership override can apply.
    pub fn without_role(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: None,
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}
