use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::{KNOWN_NODE_TYPES, NodeInput, Row, take_first};

/// Flattened `field -> [messages]` map, preserved through to row outcomes.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ValidationErrors {
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty()
    }
}

/// Validate a raw row against the create schema and split it into the
/// node's structured columns plus free-form attrs. Only the create path
/// validates; updates merge into an already-valid record.
pub fn validate_create(row: &Row) -> Result<NodeInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut input = NodeInput::default();

    match row.get("name") {
        Some(Value::String(s)) if !s.is_empty() => input.name = s.clone(),
        Some(Value::String(_)) => errors.push("name", "must not be empty"),
        Some(_) => errors.push("name", "must be a string"),
        None => errors.push("name", "required"),
    }

    match row.get("id") {
        None => {}
        Some(Value::String(s)) if !s.is_empty() => input.id = Some(s.clone()),
        Some(_) => errors.push("id", "must be a non-empty string"),
    }

    match take_first(row, &["node_type", "type"]) {
        None => {}
        Some(Value::String(s)) if KNOWN_NODE_TYPES.contains(&s.as_str()) => {
            input.node_type = Some(s.clone());
        }
        Some(Value::String(_)) => errors.push(
            "type",
            format!("must be one of: {}", KNOWN_NODE_TYPES.join(", ")),
        ),
        Some(_) => errors.push("type", "must be a string"),
    }

    match take_first(row, &["owner_id", "ownerId", "ownerid"]) {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if !s.is_empty() => input.owner_id = Some(s.clone()),
        Some(Value::String(_)) => {}
        Some(_) => errors.push("ownerId", "must be a string"),
    }

    match row.get("stewards") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            let mut stewards = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => stewards.push(s.clone()),
                    _ => errors.push("stewards", "must be an array of strings"),
                }
            }
            input.stewards = stewards;
        }
        Some(_) => errors.push("stewards", "must be an array of strings"),
    }

    if input.node_type.as_deref() == Some("field") {
        match row.get("pii") {
            None | Some(Value::Bool(_)) => {}
            Some(_) => errors.push("pii", "must be a boolean"),
        }
    }

    const STRUCTURED: &[&str] = &[
        "id", "name", "type", "node_type", "owner_id", "ownerId", "ownerid", "stewards",
        "created_at", "updated_at",
    ];
    for (key, value) in row {
        if STRUCTURED.contains(&key.as_str()) || value.is_null() {
            continue;
        }
        input.attrs.insert(key.clone(), value.clone());
    }

    if errors.is_empty() { Ok(input) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn minimal_row_passes() {
        let input = validate_create(&row(json!({"name": "X"}))).unwrap();
        assert_eq!(input.name, "X");
        assert!(input.id.is_none());
        assert!(input.attrs.is_empty());
    }

    #[test]
    fn empty_row_reports_missing_name() {
        let errors = validate_create(&Row::new()).unwrap_err();
        assert_eq!(errors.field_errors["name"], vec!["required".to_string()]);
    }

    #[test]
    fn structured_fields_split_from_attrs() {
        let input = validate_create(&row(json!({
            "name": "orders",
            "type": "table",
            "ownerId": "u1",
            "stewards": ["u2"],
            "external_id": "ext-1",
            "dataset_id": "d1",
        })))
        .unwrap();
        assert_eq!(input.node_type.as_deref(), Some("table"));
        assert_eq!(input.owner_id.as_deref(), Some("u1"));
        assert_eq!(input.stewards, vec!["u2".to_string()]);
        assert_eq!(input.attrs["external_id"], json!("ext-1"));
        assert_eq!(input.attrs["dataset_id"], json!("d1"));
        assert!(!input.attrs.contains_key("ownerId"));
    }

    #[test]
    fn unknown_node_kind_is_rejected() {
        let errors = validate_create(&row(json!({"name": "X", "type": "blob"}))).unwrap_err();
        assert!(errors.field_errors.contains_key("type"));
    }

    #[test]
    fn bad_types_collect_per_field() {
        let errors = validate_create(&row(json!({
            "name": 7,
            "stewards": "u1",
            "type": "field",
            "pii": "yes",
        })))
        .unwrap_err();
        assert!(errors.field_errors.contains_key("name"));
        assert!(errors.field_errors.contains_key("stewards"));
        assert!(errors.field_errors.contains_key("pii"));
    }
}
