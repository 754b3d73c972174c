use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AuthError;
use crate::jwt::verify_jwt;
use crate::permissions::{has_permission, has_role};
use crate::principal::Principal;
use crate::roles::RoleMap;

/// External authentication collaborator. Resolves a bearer token to a
/// canonical principal or fails with `Unauthenticated`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn resolve(&self, bearer: Option<&str>) -> Result<Principal, AuthError>;
}

/// Verifies locally-signed JWTs carrying `sub` and `role` claims.
pub struct JwtAuthenticator {
    secret: String,
}

impl JwtAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn resolve(&self, bearer: Option<&str>) -> Result<Principal, AuthError> {
        let token = bearer.ok_or(AuthError::Unauthenticated)?;
        let claims = verify_jwt(token, &self.secret)?;
        Ok(claims.into_principal())
    }
}

/// Authorization gate in front of every mutating operation. Resolves the
/// principal exactly once per call, then evaluates permissions against the
/// role map it was built with.
#[derive(Clone)]
pub struct Gate {
    authenticator: Arc<dyn Authenticator>,
    roles: Arc<RoleMap>,
}

impl Gate {
    pub fn new(authenticator: Arc<dyn Authenticator>, roles: Arc<RoleMap>) -> Self {
        Self {
            authenticator,
            roles,
        }
    }

    pub fn roles(&self) -> &RoleMap {
        &self.roles
    }

    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<Principal, AuthError> {
        self.authenticator.resolve(bearer).await
    }

    pub async fn require_permission(
        &self,
        bearer: Option<&str>,
        permission: &str,
    ) -> Result<Principal, AuthError> {
        let principal = self.authenticator.resolve(bearer).await?;
        self.check_permission(&principal, permission)?;
        Ok(principal)
    }

    /// Succeeds if any listed permission passes. Authenticates once, not
    /// once per permission.
    pub async fn require_any_permission(
        &self,
        bearer: Option<&str>,
        permissions: &[&str],
    ) -> Result<Principal, AuthError> {
        let principal = self.authenticator.resolve(bearer).await?;
        if permissions
            .iter()
            .any(|p| has_permission(&self.roles, &principal, p))
        {
            return Ok(principal);
        }
        Err(AuthError::Forbidden("insufficient permission".into()))
    }

    pub async fn require_role(
        &self,
        bearer: Option<&str>,
        allowed: &[&str],
    ) -> Result<Principal, AuthError> {
        let principal = self.authenticator.resolve(bearer).await?;
        if has_role(&principal, allowed) {
            return Ok(principal);
        }
        Err(AuthError::Forbidden("insufficient role".into()))
    }

    /// Permission check for an already-resolved principal.
    pub fn check_permission(
        &self,
        principal: &Principal,
        permission: &str,
    ) -> Result<(), AuthError> {
        if has_permission(&self.roles, principal, permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(format!(
                "missing permission: {permission}"
            )))
        }
    }
}
