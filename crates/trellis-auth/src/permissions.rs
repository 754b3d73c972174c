use crate::principal::Principal;
use crate::roles::RoleMap;

pub use crate::roles::PERMISSIONS;

/// Check a permission string against the principal's role.
///
/// Precedence matters: `admin:*` is checked before the exact and
/// resource-wildcard matches so an admin is never blocked by a missing
/// specific grant. A principal without a role fails closed.
pub fn has_permission(roles: &RoleMap, principal: &Principal, permission: &str) -> bool {
    let Some(role) = principal.role() else {
        return false;
    };
    let perms = roles.permissions_for(role);
    if perms.iter().any(|p| p == "admin:*") {
        return true;
    }
    if perms.iter().any(|p| p == permission) {
        return true;
    }
    if let Some((resource, action)) = permission.split_once(':') {
        if !action.is_empty() {
            let wildcard = format!("{resource}:*");
            if perms.iter().any(|p| *p == wildcard) {
                return true;
            }
        }
    }
    false
}

/// Membership test for routes that accept any of several named roles.
pub fn has_role(principal: &Principal, allowed: &[&str]) -> bool {
    principal
        .role()
        .map(|role| allowed.contains(&role))
        .unwrap_or(false)
}

/// Ownership/stewardship override. A principal who already passed the role
/// check is allowed; otherwise the record's recorded owner or a listed
/// steward may still mutate it.
pub fn can_mutate(
    principal: &Principal,
    base_allowed: bool,
    owner_id: Option<&str>,
    stewards: &[String],
) -> bool {
    if base_allowed {
        return true;
    }
    if owner_id.is_some_and(|owner| owner == principal.id) {
        return true;
    }
    stewards.iter().any(|s| *s == principal.id)
}
