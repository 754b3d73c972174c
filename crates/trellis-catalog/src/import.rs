use serde::Serialize;
use serde_json::Value;
use trellis_auth::Principal;

use crate::error::CatalogError;
use crate::service::strip_blank_fields;
use crate::stable_keys::{find_by_stable_keys, resolve_stable_keys};
use crate::store::CatalogStore;
use crate::types::{Row, row_get_str};
use crate::validate::validate_create;

pub const NOTE_MATCHED_BY_STABLE_KEYS: &str = "matched_by_stable_keys";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowStatus {
    Created,
    Updated,
    WouldCreate,
    WouldUpdate,
    Skipped,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    /// 1-based row number within the batch.
    pub row: usize,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl RowResult {
    fn ok(row: usize, status: RowStatus) -> Self {
        Self {
            row,
            status,
            note: None,
            code: None,
            message: None,
        }
    }

    fn with_note(row: usize, status: RowStatus, note: &str) -> Self {
        Self {
            note: Some(note.to_string()),
            ..Self::ok(row, status)
        }
    }

    fn error(row: usize, code: &str, message: Value) -> Self {
        Self {
            code: Some(code.to_string()),
            message: Some(message),
            ..Self::ok(row, RowStatus::Error)
        }
    }
}

/// `processed == created + updated + errors` holds at the end of every
/// batch; dry runs count would-create/would-update in the same buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub stable_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub summary: ImportSummary,
    pub rows: Vec<RowResult>,
}

/// Which path a row takes. Pure classification, tested without any store
/// or transport wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPath {
    UpdateById,
    UpdateByStableKeys,
    Create,
}

pub fn classify(has_id: bool, found_by_id: bool, found_by_keys: bool) -> RowPath {
    if has_id && found_by_id {
        RowPath::UpdateById
    } else if !has_id && found_by_keys {
        RowPath::UpdateByStableKeys
    } else {
        RowPath::Create
    }
}

/// Canonical form for imported field names: trimmed, whitespace runs
/// collapsed to `_`, everything but ASCII alphanumerics and `_` dropped,
/// lower-cased.
pub fn normalize_field_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push('_');
            }
            last_was_space = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
            last_was_space = false;
        } else {
            last_was_space = false;
        }
    }
    out
}

/// Normalize a raw row from a CSV-like source: field names canonicalized,
/// empty-string cells treated as absent.
pub fn normalize_row(raw: &Row) -> Row {
    let mut out = Row::new();
    for (key, value) in raw {
        let name = normalize_field_name(key);
        if name.is_empty() {
            continue;
        }
        match value {
            Value::String(s) if s.is_empty() => {}
            Value::Null => {}
            other => {
                out.insert(name, other.clone());
            }
        }
    }
    out
}

/// Run an import batch. Authorization is the caller's job, checked once for
/// the whole batch through the gate before this is invoked; rows are
/// processed strictly sequentially and failures never abort the batch.
pub async fn run_import_batch(
    principal: &Principal,
    store: &dyn CatalogStore,
    rows: &[Row],
    options: &ImportOptions,
) -> ImportReport {
    let stable_keys = resolve_stable_keys(options.stable_keys.clone());
    let mut summary = ImportSummary {
        processed: rows.len(),
        ..Default::default()
    };
    let mut results = Vec::with_capacity(rows.len());

    tracing::info!(
        principal = %principal.id,
        rows = rows.len(),
        dry_run = options.dry_run,
        "import batch started"
    );

    for (index, row) in rows.iter().enumerate() {
        let number = index + 1;
        let result = match process_row(store, row, &stable_keys, options.dry_run, number).await {
            Ok(result) => result,
            // Row-level isolation: persistence failures become an error
            // outcome and the batch moves on.
            Err(e) => RowResult::error(number, "IMPORT_ERROR", e.message()),
        };
        match result.status {
            RowStatus::Created | RowStatus::WouldCreate => summary.created += 1,
            RowStatus::Updated | RowStatus::WouldUpdate => summary.updated += 1,
            RowStatus::Error => summary.errors += 1,
            RowStatus::Skipped => {}
        }
        results.push(result);
    }

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        errors = summary.errors,
        "import batch finished"
    );

    ImportReport {
        summary,
        rows: results,
    }
}

async fn process_row(
    store: &dyn CatalogStore,
    row: &Row,
    stable_keys: &[String],
    dry_run: bool,
    number: usize,
) -> Result<RowResult, CatalogError> {
    let id = row_get_str(row, "id");

    let found_by_id = match &id {
        Some(id) => store.get_node(id).await?.is_some(),
        None => false,
    };

    let matched = if id.is_none() {
        find_by_stable_keys(store, row, stable_keys).await?
    } else {
        None
    };

    match classify(id.is_some(), found_by_id, matched.is_some()) {
        RowPath::UpdateById => {
            if dry_run {
                return Ok(RowResult::ok(number, RowStatus::WouldUpdate));
            }
            let id = id.expect("update-by-id path has an id");
            store
                .update_node_fields(&id, &strip_blank_fields(row))
                .await?;
            Ok(RowResult::ok(number, RowStatus::Updated))
        }
        RowPath::UpdateByStableKeys => {
            if dry_run {
                return Ok(RowResult::with_note(
                    number,
                    RowStatus::WouldUpdate,
                    NOTE_MATCHED_BY_STABLE_KEYS,
                ));
            }
            let existing = matched.expect("stable-key path has a match");
            store
                .update_node_fields(&existing.id, &strip_blank_fields(row))
                .await?;
            Ok(RowResult::with_note(
                number,
                RowStatus::Updated,
                NOTE_MATCHED_BY_STABLE_KEYS,
            ))
        }
        RowPath::Create => {
            // Only the create path validates; updates merge into an
            // already-valid record.
            let input = match validate_create(row) {
                Ok(input) => input,
                Err(errors) => {
                    return Ok(RowResult::error(
                        number,
                        "VALIDATION_ERROR",
                        serde_json::json!(errors.field_errors),
                    ));
                }
            };
            if dry_run {
                return Ok(RowResult::ok(number, RowStatus::WouldCreate));
            }
            store.insert_node(&input).await?;
            Ok(RowResult::ok(number, RowStatus::Created))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_explicit_id() {
        assert_eq!(classify(true, true, false), RowPath::UpdateById);
        // A stale id that matches nothing falls through to create, never to
        // a stable-key update.
        assert_eq!(classify(true, false, true), RowPath::Create);
        assert_eq!(classify(false, false, true), RowPath::UpdateByStableKeys);
        assert_eq!(classify(false, false, false), RowPath::Create);
    }

    #[test]
    fn field_names_normalize() {
        assert_eq!(normalize_field_name("  Owner Id "), "owner_id");
        assert_eq!(normalize_field_name("External-ID"), "externalid");
        assert_eq!(normalize_field_name("name"), "name");
        assert_eq!(normalize_field_name("PII?"), "pii");
    }

    #[test]
    fn normalize_row_drops_blank_cells() {
        let raw = serde_json::json!({
            "Name": "orders",
            "Owner Id": "",
            "Data Type": "int",
        });
        let row = normalize_row(raw.as_object().unwrap());
        assert_eq!(row.get("name"), Some(&serde_json::json!("orders")));
        assert_eq!(row.get("data_type"), Some(&serde_json::json!("int")));
        assert!(!row.contains_key("owner_id"));
    }
}
