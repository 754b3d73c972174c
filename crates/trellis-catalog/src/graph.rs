use trellis_auth::{Principal, RoleMap, can_mutate, has_permission};

use crate::error::CatalogError;
use crate::service::get_node;
use crate::store::CatalogStore;
use crate::types::{Direction, Edge, NodeRecord};

pub const TRAVERSE_MAX_DEPTH: u32 = 10;
pub const TRAVERSE_CAP: u32 = 100;

/// Add a lineage edge. A principal holding `edges:add` bypasses the
/// per-node ownership check; anyone else must own or steward both
/// endpoints. Both endpoints must exist either way.
pub async fn add_edge(
    principal: &Principal,
    roles: &RoleMap,
    store: &dyn CatalogStore,
    from_id: &str,
    to_id: &str,
    edge_type: &str,
) -> Result<Edge, CatalogError> {
    if edge_type.is_empty() {
        return Err(CatalogError::InvalidInput("edge type required".into()));
    }

    let from = get_node(store, from_id).await?;
    let to = get_node(store, to_id).await?;

    if !has_permission(roles, principal, "edges:add") {
        let can_from = can_mutate(principal, false, from.owner_id.as_deref(), &from.stewards);
        let can_to = can_mutate(principal, false, to.owner_id.as_deref(), &to.stewards);
        if !can_from || !can_to {
            return Err(CatalogError::Forbidden(
                "insufficient permissions on source or target node".into(),
            ));
        }
    }

    let edge = Edge {
        from_id: from.id,
        to_id: to.id,
        edge_type: edge_type.to_string(),
    };
    let edge = store.add_edge(&edge).await?;
    tracing::debug!(from = %edge.from_id, to = %edge.to_id, edge_type = %edge.edge_type, "edge added");
    Ok(edge)
}

/// Walk lineage up- or downstream from a node to a bounded depth.
pub async fn traverse(
    store: &dyn CatalogStore,
    node_id: &str,
    direction: Direction,
    depth: u32,
) -> Result<Vec<NodeRecord>, CatalogError> {
    let depth = depth.clamp(1, TRAVERSE_MAX_DEPTH);
    store
        .neighbors(node_id, direction, depth, TRAVERSE_CAP)
        .await
}

/// Neighborhood of nodes owned or stewarded by a seed principal id.
pub async fn expand(
    store: &dyn CatalogStore,
    seed: &str,
    cap: u32,
) -> Result<Vec<NodeRecord>, CatalogError> {
    store.list_nodes(Some(seed), cap.clamp(1, 1000)).await
}
