use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AuthError;
use crate::gate::Gate;
use crate::principal::Principal;

/// Stashed in request extensions by the router so the extractor can reach
/// the gate.
#[derive(Clone)]
pub struct AuthState {
    pub gate: Gate,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())?;
    header.strip_prefix("Bearer ").map(str::trim)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts
            .extensions
            .get::<AuthState>()
            .ok_or(AuthError::Internal("auth not configured".into()))?
            .clone();

        let bearer = bearer_token(parts);
        auth_state.gate.authenticate(bearer).await
    }
}
