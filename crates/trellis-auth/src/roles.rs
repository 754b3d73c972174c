use std::collections::HashMap;
use std::path::Path;

/// Permission catalog surfaced by the role administration API.
pub const PERMISSIONS: &[(&str, &str)] = &[
    ("nodes:read", "View catalog nodes and lineage"),
    ("nodes:create", "Create catalog nodes (also governs import upserts)"),
    ("nodes:update", "Update catalog nodes"),
    ("edges:add", "Add lineage edges between any two nodes"),
    ("audit:write", "Write audit entries"),
    ("admin:*", "Full administrative access"),
];

/// Environment variable holding a role->permissions JSON object.
pub const ROLES_JSON_ENV: &str = "TRELLIS_ROLES_JSON";

/// Role name -> permission strings. Treated as a value: loaded once,
/// shared behind `Arc`, replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleMap {
    roles: HashMap<String, Vec<String>>,
}

impl RoleMap {
    /// Load the role map. Precedence: `TRELLIS_ROLES_JSON` env var, then the
    /// JSON file at `path` (if given and present), then built-in defaults.
    /// A malformed source counts as absent; this never fails.
    pub fn load(path: Option<&Path>) -> Self {
        if let Some(map) = load_from_env() {
            return map;
        }
        if let Some(map) = path.and_then(load_from_file) {
            return map;
        }
        Self::default()
    }

    pub fn from_map(roles: HashMap<String, Vec<String>>) -> Self {
        Self { roles }
    }

    /// Permission set for a role. Unknown roles have an empty set.
    pub fn permissions_for(&self, role: &str) -> &[String] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &HashMap<String, Vec<String>> {
        &self.roles
    }
}

impl Default for RoleMap {
    fn default() -> Self {
        let mut roles = HashMap::new();
        roles.insert(
            "admin".to_string(),
            strs(&[
                "nodes:create",
                "nodes:update",
                "nodes:read",
                "edges:add",
                "audit:write",
                "admin:*",
            ]),
        );
        roles.insert(
            "steward".to_string(),
            strs(&["nodes:create", "nodes:update", "nodes:read", "edges:add"]),
        );
        roles.insert(
            "editor".to_string(),
            strs(&["nodes:create", "nodes:update", "nodes:read"]),
        );
        roles.insert("viewer".to_string(), strs(&["nodes:read"]));
        Self { roles }
    }
}

fn strs(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn load_from_env() -> Option<RoleMap> {
    let raw = std::env::var(ROLES_JSON_ENV).ok()?;
    match parse_roles_json(&raw) {
        Some(map) => Some(map),
        None => {
            tracing::debug!("ignoring malformed {ROLES_JSON_ENV}");
            None
        }
    }
}

fn load_from_file(path: &Path) -> Option<RoleMap> {
    let raw = std::fs::read_to_string(path).ok()?;
    match parse_roles_json(&raw) {
        Some(map) => Some(map),
        None => {
            tracing::debug!("ignoring malformed roles file {}", path.display());
            None
        }
    }
}

fn parse_roles_json(raw: &str) -> Option<RoleMap> {
    let parsed: HashMap<String, Vec<String>> = serde_json::from_str(raw).ok()?;
    Some(RoleMap::from_map(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_builtin_roles() {
        let map = RoleMap::default();
        for role in ["admin", "steward", "editor", "viewer"] {
            assert!(!map.permissions_for(role).is_empty(), "{role} missing");
        }
        assert!(map.permissions_for("admin").iter().any(|p| p == "admin:*"));
        assert_eq!(map.permissions_for("viewer"), &["nodes:read".to_string()]);
    }

    #[test]
    fn unknown_role_has_empty_set() {
        let map = RoleMap::default();
        assert!(map.permissions_for("intern").is_empty());
    }

    #[test]
    fn file_source_used_when_valid() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"auditor": ["nodes:read", "audit:write"]}}"#).unwrap();
        let map = RoleMap::load(Some(f.path()));
        assert_eq!(
            map.permissions_for("auditor"),
            &["nodes:read".to_string(), "audit:write".to_string()]
        );
        assert!(map.permissions_for("admin").is_empty());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        let map = RoleMap::load(Some(f.path()));
        assert_eq!(map, RoleMap::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let map = RoleMap::load(Some(Path::new("/nonexistent/roles.json")));
        assert_eq!(map, RoleMap::default());
    }

    #[test]
    fn env_json_parses() {
        let map = parse_roles_json(r#"{"bot": ["nodes:*"]}"#).unwrap();
        assert_eq!(map.permissions_for("bot"), &["nodes:*".to_string()]);
    }
}
