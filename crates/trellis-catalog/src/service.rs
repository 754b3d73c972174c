use trellis_auth::{Principal, RoleMap, can_mutate, has_permission};

use crate::error::CatalogError;
use crate::stable_keys::find_by_stable_keys;
use crate::store::CatalogStore;
use crate::types::{NodeInput, NodeRecord, Row, is_blank, row_get_str};
use crate::validate::validate_create;

/// Drop fields whose value is blank (empty string or null) so an update
/// merge never overwrites a stored value with a blank.
pub fn strip_blank_fields(patch: &Row) -> Row {
    patch
        .iter()
        .filter(|(_, v)| !is_blank(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Insert a validated node. The route layer holds the `nodes:create` gate.
pub async fn create_node(
    store: &dyn CatalogStore,
    input: NodeInput,
) -> Result<NodeRecord, CatalogError> {
    let node = store.insert_node(&input).await?;
    tracing::debug!(node_id = %node.id, "node created");
    Ok(node)
}

pub async fn get_node(
    store: &dyn CatalogStore,
    id: &str,
) -> Result<NodeRecord, CatalogError> {
    store
        .get_node(id)
        .await?
        .ok_or_else(|| CatalogError::NotFound(format!("node '{id}' not found")))
}

/// Update a node. Base permission is `nodes:update`; a principal without it
/// may still update a record they own or steward.
pub async fn update_node(
    principal: &Principal,
    roles: &RoleMap,
    store: &dyn CatalogStore,
    id: &str,
    patch: &Row,
) -> Result<NodeRecord, CatalogError> {
    let node = get_node(store, id).await?;

    let base_allowed = has_permission(roles, principal, "nodes:update");
    if !can_mutate(principal, base_allowed, node.owner_id.as_deref(), &node.stewards) {
        return Err(CatalogError::Forbidden(
            "insufficient permission to update node".into(),
        ));
    }

    let cleaned = strip_blank_fields(patch);
    store.update_node_fields(id, &cleaned).await
}

/// Whether an upsert created a new record or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created,
    Updated,
}

/// Single-record upsert: an explicit id that matches wins, then a
/// stable-key match, otherwise create. The caller gates the operation
/// (`nodes:create` governs both branches for imported records).
pub async fn upsert_node(
    store: &dyn CatalogStore,
    row: &Row,
    stable_keys: &[String],
) -> Result<(NodeRecord, Upserted), CatalogError> {
    if let Some(id) = row_get_str(row, "id") {
        if store.get_node(&id).await?.is_some() {
            let cleaned = strip_blank_fields(row);
            let node = store.update_node_fields(&id, &cleaned).await?;
            return Ok((node, Upserted::Updated));
        }
    }

    if row_get_str(row, "id").is_none() {
        if let Some(existing) = find_by_stable_keys(store, row, stable_keys).await? {
            let cleaned = strip_blank_fields(row);
            let node = store.update_node_fields(&existing.id, &cleaned).await?;
            return Ok((node, Upserted::Updated));
        }
    }

    let input = validate_create(row).map_err(CatalogError::Validation)?;
    let node = create_node(store, input).await?;
    Ok((node, Upserted::Created))
}

pub async fn list_nodes(
    store: &dyn CatalogStore,
    seed: Option<&str>,
    cap: u32,
) -> Result<Vec<NodeRecord>, CatalogError> {
    store.list_nodes(seed, cap.clamp(1, 1000)).await
}
