pub mod error;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use error::AuthError;
pub use gate::{Authenticator, Gate, JwtAuthenticator};
pub use jwt::{AuthClaims, create_jwt, verify_jwt};
pub use middleware::AuthState;
pub use permissions::{can_mutate, has_permission, has_role, PERMISSIONS};
pub use principal::Principal;
pub use roles::RoleMap;
