use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use trellis_auth::Principal;
use trellis_catalog::types::Row;
use trellis_catalog::{service, validate_create};

use crate::models::{ApiError, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Principal id scoping the listing to owned/stewarded nodes.
    pub seed: Option<String>,
    pub cap: Option<u32>,
}

pub async fn list_nodes(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    state.gate.check_permission(&principal, "nodes:read")?;
    let nodes = service::list_nodes(
        state.store.as_ref(),
        query.seed.as_deref(),
        query.cap.unwrap_or(100),
    )
    .await?;
    Ok(ok(nodes))
}

pub async fn get_node(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.gate.check_permission(&principal, "nodes:read")?;
    let node = service::get_node(state.store.as_ref(), &id).await?;
    Ok(ok(node))
}

pub async fn create_node(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Json(body): Json<Row>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.gate.check_permission(&principal, "nodes:create")?;
    let input = validate_create(&body).map_err(trellis_catalog::CatalogError::Validation)?;
    let node = service::create_node(state.store.as_ref(), input).await?;
    Ok((StatusCode::CREATED, ok(node)))
}

pub async fn update_node(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<Row>,
) -> Result<Json<Value>, ApiError> {
    // No gate here: update_node applies the nodes:update base permission
    // plus the ownership/stewardship override per target record.
    let node = service::update_node(&principal, &state.roles, state.store.as_ref(), &id, &patch)
        .await?;
    Ok(ok(node))
}
