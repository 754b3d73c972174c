use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::principal::Principal;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthClaims {
    pub sub: String,
    pub role: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

impl AuthClaims {
    /// The single claims-to-principal normalization point.
    pub fn into_principal(self) -> Principal {
        Principal {
            id: self.sub,
            role: self.role,
        }
    }
}

pub fn create_jwt(subject: &str, role: Option<&str>, secret: &str) -> Result<String, AuthError> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = AuthClaims {
        sub: subject.to_string(),
        role: role.map(str::to_string),
        exp: now + 86400,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode error: {e}")))
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<AuthClaims, AuthError> {
    let data = decode::<AuthClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::Unauthenticated)?;
    Ok(data.claims)
}
