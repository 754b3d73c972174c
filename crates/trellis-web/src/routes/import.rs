use std::sync::Arc;

use axum::Json;
use axum::RequestExt;
use axum::extract::{Multipart, Query, Request, State};
use serde::Deserialize;
use serde_json::Value;

use trellis_auth::Principal;
use trellis_catalog::import::{ImportOptions, normalize_row, run_import_batch};
use trellis_catalog::stable_keys::parse_stable_keys;
use trellis_catalog::types::Row;

use crate::models::{ApiError, ok};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(rename = "dryRun")]
    pub dry_run: Option<String>,
    #[serde(rename = "stableKeys")]
    pub stable_keys: Option<String>,
}

/// Bulk import endpoint. Accepts a JSON body `{rows, stableKeys?}` or
/// multipart form data with a CSV `file`. Stable-key priority: query
/// parameter, then JSON field, then form field. Authorization is checked
/// once for the whole batch; `nodes:create` governs both import paths.
pub async fn import(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportQuery>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    state.gate.check_permission(&principal, "nodes:create")?;

    let dry_run = query.dry_run.as_deref() == Some("true");
    let keys_from_query = query.stable_keys.as_deref().map(parse_stable_keys);

    let content_type = request
        .headers()
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    let (rows, keys_from_body) = if content_type.contains("application/json") {
        read_json_rows(request).await?
    } else if content_type.contains("multipart/form-data") {
        read_csv_rows(request).await?
    } else {
        return Err(ApiError::bad_request(
            "INVALID_CONTENT_TYPE",
            "use application/json with { rows: [...] } or multipart/form-data with a `file` field",
        ));
    };

    let options = ImportOptions {
        dry_run,
        stable_keys: keys_from_query.or(keys_from_body),
    };
    let report = run_import_batch(&principal, state.store.as_ref(), &rows, &options).await;
    Ok(ok(report))
}

async fn read_json_rows(request: Request) -> Result<(Vec<Row>, Option<Vec<String>>), ApiError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_UPLOAD_BYTES)
        .await
        .map_err(|_| ApiError::payload_too_large("FILE_TOO_LARGE", "request body too large"))?;
    let body: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::bad_request("VALIDATION_ERROR", format!("invalid JSON: {e}")))?;

    let rows = match body.get("rows") {
        Some(Value::Array(items)) => {
            let mut rows = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(map) => rows.push(map.clone()),
                    _ => {
                        return Err(ApiError::bad_request(
                            "VALIDATION_ERROR",
                            "rows must be an array of objects",
                        ));
                    }
                }
            }
            rows
        }
        _ => {
            return Err(ApiError::bad_request(
                "VALIDATION_ERROR",
                "body must contain a `rows` array",
            ));
        }
    };

    // `stableKeys` may be an array or a comma-separated string.
    let stable_keys = match body.get("stableKeys") {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
        ),
        Some(Value::String(s)) => Some(parse_stable_keys(s)),
        _ => None,
    };

    Ok((rows, stable_keys))
}

async fn read_csv_rows(request: Request) -> Result<(Vec<Row>, Option<Vec<String>>), ApiError> {
    let mut multipart: Multipart = request
        .extract()
        .await
        .map_err(|_| ApiError::bad_request("INVALID_BODY", "malformed multipart body"))?;

    let mut file: Option<Vec<u8>> = None;
    let mut stable_keys: Option<Vec<String>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("INVALID_BODY", "malformed multipart body"))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field.bytes().await.map_err(|_| {
                    ApiError::payload_too_large(
                        "FILE_TOO_LARGE",
                        "uploaded file exceeds the 5MB size limit",
                    )
                })?;
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(ApiError::payload_too_large(
                        "FILE_TOO_LARGE",
                        "uploaded file exceeds the 5MB size limit",
                    ));
                }
                file = Some(bytes.to_vec());
            }
            Some("stableKeys") => {
                if let Ok(text) = field.text().await {
                    stable_keys = Some(parse_stable_keys(&text));
                }
            }
            _ => {}
        }
    }

    let Some(file) = file else {
        return Err(ApiError::bad_request(
            "MISSING_FILE",
            "form must include a `file` field with CSV",
        ));
    };

    Ok((parse_csv(&file)?, stable_keys))
}

/// Tokenize CSV and normalize rows into canonical field names; blank cells
/// are treated as absent.
fn parse_csv(bytes: &[u8]) -> Result<Vec<Row>, ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ApiError::bad_request("VALIDATION_ERROR", format!("invalid CSV: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| ApiError::bad_request("VALIDATION_ERROR", format!("invalid CSV: {e}")))?;
        let mut raw = Row::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            raw.insert(header.to_string(), Value::String(value.to_string()));
        }
        rows.push(normalize_row(&raw));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_normalize_headers_and_drop_blanks() {
        let csv = "Name,Owner Id,External-ID\norders,,ext-1\ncustomers,u9,\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], Value::String("orders".into()));
        assert_eq!(rows[0]["externalid"], Value::String("ext-1".into()));
        assert!(!rows[0].contains_key("owner_id"));
        assert_eq!(rows[1]["owner_id"], Value::String("u9".into()));
        assert!(!rows[1].contains_key("externalid"));
    }

    #[test]
    fn empty_csv_yields_no_rows() {
        let rows = parse_csv(b"name,type\n").unwrap();
        assert!(rows.is_empty());
    }
}
