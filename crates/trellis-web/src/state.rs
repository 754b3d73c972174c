use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_auth::{Gate, RoleMap};
use trellis_catalog::store::CatalogStore;

pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub roles: Arc<RoleMap>,
    pub gate: Gate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Optional roles JSON file; env var and built-in defaults apply when
    /// absent or malformed.
    #[serde(default)]
    pub roles_file: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_jwt_secret() -> String {
    "trellis-jwt-secret-change-me".to_string()
}
fn default_db_path() -> String {
    "trellis.db".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            jwt_secret: default_jwt_secret(),
            db_path: default_db_path(),
            roles_file: None,
        }
    }
}
