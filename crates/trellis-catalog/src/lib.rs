pub mod error;
pub mod graph;
pub mod import;
pub mod service;
pub mod stable_keys;
pub mod store;
pub mod types;
pub mod validate;

pub use error::CatalogError;
pub use import::{ImportOptions, ImportReport, ImportSummary, RowResult, RowStatus, run_import_batch};
pub use service::{Upserted, create_node, get_node, list_nodes, update_node, upsert_node};
pub use stable_keys::{find_by_stable_keys, resolve_stable_keys};
pub use store::{CatalogStore, SqliteCatalogStore};
pub use types::{Direction, Edge, NodeInput, NodeRecord, Row};
pub use validate::{ValidationErrors, validate_create};
