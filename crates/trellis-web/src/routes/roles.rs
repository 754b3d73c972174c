use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use trellis_auth::{PERMISSIONS, Principal, has_permission, has_role};

use crate::models::{ApiError, ok};
use crate::state::AppState;

/// Role administration listing: the effective role map plus the permission
/// catalog. Admin only.
pub async fn list_roles(
    principal: Principal,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let is_admin = has_permission(&state.roles, &principal, "admin:*")
        || has_role(&principal, &["admin"]);
    if !is_admin {
        return Err(trellis_auth::AuthError::Forbidden("admin access required".into()).into());
    }

    let permissions: Vec<Value> = PERMISSIONS
        .iter()
        .map(|(action, description)| {
            serde_json::json!({ "action": action, "description": description })
        })
        .collect();

    Ok(ok(serde_json::json!({
        "roles": state.roles.as_map(),
        "permissions": permissions,
    })))
}
