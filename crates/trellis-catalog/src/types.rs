use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming record: field name -> scalar JSON value. Produced by the row
/// sources (JSON body, normalized CSV) and by patch payloads.
pub type Row = serde_json::Map<String, Value>;

/// Node kinds the catalog accepts on the create path.
pub const KNOWN_NODE_TYPES: &[&str] = &["system", "dataset", "table", "field", "metric"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub node_type: Option<String>,
    pub name: String,
    pub owner_id: Option<String>,
    pub stewards: Vec<String>,
    pub attrs: Row,
    pub created_at: String,
    pub updated_at: String,
}

/// Validated create payload.
#[derive(Debug, Clone, Default)]
pub struct NodeInput {
    pub id: Option<String>,
    pub node_type: Option<String>,
    pub name: String,
    pub owner_id: Option<String>,
    pub stewards: Vec<String>,
    pub attrs: Row,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub edge_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upstream,
    Downstream,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upstream" => Some(Direction::Upstream),
            "downstream" => Some(Direction::Downstream),
            _ => None,
        }
    }
}

/// True for values the merge rules treat as blank: null and empty string.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Non-blank string value of a row field, if any. Numbers are accepted and
/// stringified so CSV-sourced ids and keys behave the same as JSON ones.
pub fn row_get_str(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First present key among `keys`, for fields that arrive in more than one
/// spelling (`ownerId` in JSON bodies, `owner_id` from normalized CSV).
pub fn take_first<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| row.get(*k))
}
