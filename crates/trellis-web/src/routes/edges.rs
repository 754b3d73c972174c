use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use trellis_auth::Principal;
use trellis_catalog::graph;
use trellis_catalog::types::Direction;

use crate::models::{ApiError, ok};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EdgeBody {
    #[serde(rename = "fromId")]
    pub from_id: String,
    #[serde(rename = "toId")]
    pub to_id: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

pub async fn add_edge(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Json(body): Json<EdgeBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let edge = graph::add_edge(
        &principal,
        &state.roles,
        state.store.as_ref(),
        &body.from_id,
        &body.to_id,
        &body.edge_type,
    )
    .await?;
    Ok((StatusCode::CREATED, ok(edge)))
}

#[derive(Debug, Deserialize)]
pub struct TraverseQuery {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    pub direction: Option<String>,
    pub depth: Option<u32>,
}

pub async fn traverse(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Query(query): Query<TraverseQuery>,
) -> Result<Json<Value>, ApiError> {
    state.gate.check_permission(&principal, "nodes:read")?;

    let direction = match query.direction.as_deref() {
        None => Direction::Downstream,
        Some(s) => Direction::parse(s).ok_or_else(|| {
            ApiError::bad_request("INVALID_DIRECTION", "direction must be upstream or downstream")
        })?,
    };

    let nodes = graph::traverse(
        state.store.as_ref(),
        &query.node_id,
        direction,
        query.depth.unwrap_or(3),
    )
    .await?;
    Ok(ok(serde_json::json!({ "nodes": nodes })))
}

#[derive(Debug, Deserialize)]
pub struct ExpandQuery {
    #[serde(rename = "seedPir")]
    pub seed: String,
    pub cap: Option<u32>,
}

pub async fn expand(
    principal: Principal,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpandQuery>,
) -> Result<Json<Value>, ApiError> {
    state.gate.check_permission(&principal, "nodes:read")?;
    let nodes = graph::expand(
        state.store.as_ref(),
        &query.seed,
        query.cap.unwrap_or(100),
    )
    .await?;
    Ok(ok(serde_json::json!({ "nodes": nodes })))
}
