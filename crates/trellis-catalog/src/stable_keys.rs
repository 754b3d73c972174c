use crate::error::CatalogError;
use crate::store::CatalogStore;
use crate::types::{NodeRecord, Row, row_get_str};

/// Environment variable overriding the default stable-key list
/// (comma-separated field names).
pub const STABLE_KEYS_ENV: &str = "TRELLIS_STABLE_KEYS";

/// Built-in fallback; guarantees the resolved list is never empty.
pub const DEFAULT_STABLE_KEY: &str = "external_id";

pub fn parse_stable_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_stable_keys() -> Option<Vec<String>> {
    let raw = std::env::var(STABLE_KEYS_ENV).ok()?;
    let keys = parse_stable_keys(&raw);
    if keys.is_empty() { None } else { Some(keys) }
}

/// Stable-key precedence: per-request override, then environment default,
/// then the built-in single key.
pub fn resolve_stable_keys(request_override: Option<Vec<String>>) -> Vec<String> {
    if let Some(keys) = request_override {
        if !keys.is_empty() {
            return keys;
        }
    }
    env_stable_keys().unwrap_or_else(|| vec![DEFAULT_STABLE_KEY.to_string()])
}

/// Match an incoming row against existing records by stable keys. Only keys
/// present and non-blank on the row enter the filter; an empty filter is
/// "no match" without touching the store, so a row with no key values can
/// never match the whole table.
pub async fn find_by_stable_keys(
    store: &dyn CatalogStore,
    row: &Row,
    stable_keys: &[String],
) -> Result<Option<NodeRecord>, CatalogError> {
    let filter: Vec<(String, String)> = stable_keys
        .iter()
        .filter_map(|key| row_get_str(row, key).map(|value| (key.clone(), value)))
        .collect();

    if filter.is_empty() {
        return Ok(None);
    }

    store.find_one(&filter).await
}
