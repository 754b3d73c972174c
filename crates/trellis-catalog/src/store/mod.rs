pub mod sqlite;

pub use sqlite::SqliteCatalogStore;

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::types::{Direction, Edge, NodeInput, NodeRecord, Row};

/// Persistence collaborator for node attributes and lineage topology.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn migrate(&self) -> Result<(), CatalogError>;

    async fn get_node(&self, id: &str) -> Result<Option<NodeRecord>, CatalogError>;

    async fn insert_node(&self, input: &NodeInput) -> Result<NodeRecord, CatalogError>;

    /// Merge `fields` into the stored record. Callers strip blank fields
    /// first; omitted fields keep their stored values.
    async fn update_node_fields(&self, id: &str, fields: &Row) -> Result<NodeRecord, CatalogError>;

    /// First record whose fields equal every `(field, value)` pair.
    /// When several records match, the lowest id wins, so repeated calls
    /// against unchanged data return the same record.
    async fn find_one(&self, filter: &[(String, String)]) -> Result<Option<NodeRecord>, CatalogError>;

    /// List nodes, owner/steward scoped when `seed` is given.
    async fn list_nodes(&self, seed: Option<&str>, cap: u32) -> Result<Vec<NodeRecord>, CatalogError>;

    /// Idempotent edge insert (re-adding an existing edge is a no-op).
    async fn add_edge(&self, edge: &Edge) -> Result<Edge, CatalogError>;

    /// Lineage neighbors over `derived_from`/`contains` edges up to `depth`.
    async fn neighbors(
        &self,
        node_id: &str,
        direction: Direction,
        depth: u32,
        cap: u32,
    ) -> Result<Vec<NodeRecord>, CatalogError>;
}
