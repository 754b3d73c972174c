use async_trait::async_trait;
use serde_json::json;

use trellis_auth::{Principal, RoleMap};
use trellis_catalog::graph::add_edge;
use trellis_catalog::import::{ImportOptions, RowStatus, run_import_batch};
use trellis_catalog::service::{update_node, upsert_node, Upserted};
use trellis_catalog::stable_keys::find_by_stable_keys;
use trellis_catalog::store::{CatalogStore, SqliteCatalogStore};
use trellis_catalog::types::{Direction, Edge, NodeInput, NodeRecord, Row};
use trellis_catalog::{CatalogError, validate_create};

fn row(v: serde_json::Value) -> Row {
    v.as_object().unwrap().clone()
}

async fn store() -> SqliteCatalogStore {
    let store = SqliteCatalogStore::open_in_memory().unwrap();
    store.migrate().await.unwrap();
    store
}

async fn seed_node(store: &dyn CatalogStore, v: serde_json::Value) -> NodeRecord {
    let input = validate_create(&row(v)).unwrap();
    store.insert_node(&input).await.unwrap()
}

fn options(dry_run: bool, stable_keys: Option<&[&str]>) -> ImportOptions {
    ImportOptions {
        dry_run,
        stable_keys: stable_keys.map(|keys| keys.iter().map(|s| s.to_string()).collect()),
    }
}

#[tokio::test]
async fn dry_run_classifies_rows() {
    let store = store().await;
    seed_node(&store, json!({"id": "exists", "name": "Existing"})).await;

    let rows = vec![
        row(json!({"id": "exists", "name": "A"})),
        row(json!({"name": "B"})),
        Row::new(),
    ];
    let principal = Principal::new("u1", "editor");
    let report = run_import_batch(&principal, &store, &rows, &options(true, None)).await;

    assert_eq!(report.summary.processed, 3);
    assert_eq!(report.summary.created, 1);
    assert_eq!(report.summary.updated, 1);
    assert_eq!(report.summary.errors, 1);

    assert_eq!(report.rows[0].status, RowStatus::WouldUpdate);
    assert_eq!(report.rows[1].status, RowStatus::WouldCreate);
    assert_eq!(report.rows[2].status, RowStatus::Error);
    assert_eq!(report.rows[2].code.as_deref(), Some("VALIDATION_ERROR"));

    // Nothing persisted.
    assert!(store.get_node("exists").await.unwrap().unwrap().name == "Existing");
    assert_eq!(store.list_nodes(None, 100).await.unwrap().len(), 1);
}

#[tokio::test]
async fn dry_run_is_idempotent() {
    let store = store().await;
    seed_node(&store, json!({"id": "n1", "name": "One"})).await;

    let rows = vec![
        row(json!({"id": "n1", "name": "One again"})),
        row(json!({"name": "Two"})),
    ];
    let principal = Principal::new("u1", "editor");
    let first = run_import_batch(&principal, &store, &rows, &options(true, None)).await;
    let second = run_import_batch(&principal, &store, &rows, &options(true, None)).await;

    assert_eq!(first.summary, second.summary);
    let statuses =
        |r: &trellis_catalog::ImportReport| r.rows.iter().map(|x| x.status).collect::<Vec<_>>();
    assert_eq!(statuses(&first), statuses(&second));
}

#[tokio::test]
async fn stable_key_match_reports_note() {
    let store = store().await;
    seed_node(
        &store,
        json!({"name": "Orders", "external_id": "ext-123"}),
    )
    .await;

    let rows = vec![row(json!({"external_id": "ext-123", "name": "Y"}))];
    let principal = Principal::new("u1", "editor");
    let report = run_import_batch(
        &principal,
        &store,
        &rows,
        &options(true, Some(&["external_id"])),
    )
    .await;

    assert_eq!(report.rows[0].status, RowStatus::WouldUpdate);
    assert_eq!(
        report.rows[0].note.as_deref(),
        Some("matched_by_stable_keys")
    );
    assert_eq!(report.summary.updated, 1);
}

#[tokio::test]
async fn live_import_creates_and_updates() {
    let store = store().await;
    seed_node(&store, json!({"id": "n1", "name": "Old name", "extra": "kept"})).await;

    let rows = vec![
        row(json!({"id": "n1", "name": "New name"})),
        row(json!({"name": "X"})),
    ];
    let principal = Principal::new("u1", "editor");
    let report = run_import_batch(&principal, &store, &rows, &options(false, None)).await;

    assert_eq!(report.summary.processed, 2);
    assert_eq!(report.summary.created, 1);
    assert_eq!(report.summary.updated, 1);
    assert_eq!(report.summary.errors, 0);
    assert_eq!(
        report.summary.processed,
        report.summary.created + report.summary.updated + report.summary.errors
    );

    let updated = store.get_node("n1").await.unwrap().unwrap();
    assert_eq!(updated.name, "New name");
    assert_eq!(updated.attrs["extra"], json!("kept"));
    assert_eq!(store.list_nodes(None, 100).await.unwrap().len(), 2);
}

/// Store wrapper that fails persistence for marked rows, for isolation
/// tests.
struct FailingStore {
    inner: SqliteCatalogStore,
}

#[async_trait]
impl CatalogStore for FailingStore {
    async fn migrate(&self) -> Result<(), CatalogError> {
        self.inner.migrate().await
    }
    async fn get_node(&self, id: &str) -> Result<Option<NodeRecord>, CatalogError> {
        self.inner.get_node(id).await
    }
    async fn insert_node(&self, input: &NodeInput) -> Result<NodeRecord, CatalogError> {
        if input.name == "boom" {
            return Err(CatalogError::Database("disk on fire".into()));
        }
        self.inner.insert_node(input).await
    }
    async fn update_node_fields(&self, id: &str, fields: &Row) -> Result<NodeRecord, CatalogError> {
        self.inner.update_node_fields(id, fields).await
    }
    async fn find_one(
        &self,
        filter: &[(String, String)],
    ) -> Result<Option<NodeRecord>, CatalogError> {
        self.inner.find_one(filter).await
    }
    async fn list_nodes(&self, seed: Option<&str>, cap: u32) -> Result<Vec<NodeRecord>, CatalogError> {
        self.inner.list_nodes(seed, cap).await
    }
    async fn add_edge(&self, edge: &Edge) -> Result<Edge, CatalogError> {
        self.inner.add_edge(edge).await
    }
    async fn neighbors(
        &self,
        node_id: &str,
        direction: Direction,
        depth: u32,
        cap: u32,
    ) -> Result<Vec<NodeRecord>, CatalogError> {
        self.inner.neighbors(node_id, direction, depth, cap).await
    }
}

#[tokio::test]
async fn row_failure_does_not_abort_batch() {
    let store = FailingStore {
        inner: store().await,
    };

    let rows = vec![
        row(json!({"name": "ok-1"})),
        row(json!({"name": "boom"})),
        row(json!({"name": "ok-2"})),
    ];
    let principal = Principal::new("u1", "editor");
    let report = run_import_batch(&principal, &store, &rows, &options(false, None)).await;

    assert_eq!(report.summary.processed, 3);
    assert_eq!(report.summary.errors, 1);
    assert_eq!(report.summary.created, 2);
    assert_eq!(report.rows[0].status, RowStatus::Created);
    assert_eq!(report.rows[1].status, RowStatus::Error);
    assert_eq!(report.rows[1].code.as_deref(), Some("IMPORT_ERROR"));
    assert_eq!(report.rows[2].status, RowStatus::Created);
}

#[tokio::test]
async fn update_merge_preserves_blank_fields() {
    let store = store().await;
    seed_node(
        &store,
        json!({"id": "n1", "name": "orders", "ownerId": "owner-1", "data_type": "int"}),
    )
    .await;

    let roles = RoleMap::default();
    let owner = Principal::new("owner-1", "viewer");
    let patch = row(json!({"data_type": "", "description": "daily orders"}));
    let updated = update_node(&owner, &roles, &store, "n1", &patch)
        .await
        .unwrap();

    assert_eq!(updated.attrs["data_type"], json!("int"));
    assert_eq!(updated.attrs["description"], json!("daily orders"));
}

#[tokio::test]
async fn update_denied_without_permission_or_ownership() {
    let store = store().await;
    seed_node(&store, json!({"id": "n1", "name": "orders", "ownerId": "owner-1"})).await;

    let roles = RoleMap::default();
    let viewer = Principal::new("someone-else", "viewer");
    let err = update_node(&viewer, &roles, &store, "n1", &row(json!({"name": "x"})))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
}

#[tokio::test]
async fn edge_add_requires_permission_or_both_endpoints() {
    let store = store().await;
    seed_node(&store, json!({"id": "a", "name": "A", "ownerId": "owner-a"})).await;
    seed_node(&store, json!({"id": "b", "name": "B", "ownerId": "owner-b"})).await;

    let roles = RoleMap::default();

    // Viewer owning neither endpoint is denied.
    let viewer = Principal::new("nobody", "viewer");
    let err = add_edge(&viewer, &roles, &store, "a", "b", "derived_from")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));

    // Owning one endpoint is not enough.
    let owner_a = Principal::new("owner-a", "viewer");
    let err = add_edge(&owner_a, &roles, &store, "a", "b", "derived_from")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));

    // A steward holds edges:add and bypasses ownership entirely.
    let steward = Principal::new("s1", "steward");
    let edge = add_edge(&steward, &roles, &store, "a", "b", "derived_from")
        .await
        .unwrap();
    assert_eq!(edge.from_id, "a");

    // Owning both endpoints passes the override.
    seed_node(&store, json!({"id": "c", "name": "C", "ownerId": "owner-a"})).await;
    let edge = add_edge(&owner_a, &roles, &store, "a", "c", "contains")
        .await
        .unwrap();
    assert_eq!(edge.to_id, "c");
}

#[tokio::test]
async fn edge_add_missing_endpoint_is_not_found() {
    let store = store().await;
    seed_node(&store, json!({"id": "a", "name": "A"})).await;

    let roles = RoleMap::default();
    let steward = Principal::new("s1", "steward");
    let err = add_edge(&steward, &roles, &store, "a", "ghost", "derived_from")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn traverse_walks_lineage() {
    let store = store().await;
    seed_node(&store, json!({"id": "a", "name": "A"})).await;
    seed_node(&store, json!({"id": "b", "name": "B"})).await;
    seed_node(&store, json!({"id": "c", "name": "C"})).await;

    let roles = RoleMap::default();
    let steward = Principal::new("s1", "steward");
    add_edge(&steward, &roles, &store, "a", "b", "derived_from")
        .await
        .unwrap();
    add_edge(&steward, &roles, &store, "b", "c", "derived_from")
        .await
        .unwrap();

    let downstream = trellis_catalog::graph::traverse(&store, "a", Direction::Downstream, 3)
        .await
        .unwrap();
    let ids: Vec<_> = downstream.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);

    let upstream = trellis_catalog::graph::traverse(&store, "c", Direction::Upstream, 1)
        .await
        .unwrap();
    let ids: Vec<_> = upstream.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
}

#[tokio::test]
async fn stable_key_tie_break_is_deterministic() {
    let store = store().await;
    seed_node(&store, json!({"id": "b", "name": "Second", "external_id": "dup"})).await;
    seed_node(&store, json!({"id": "a", "name": "First", "external_id": "dup"})).await;

    let r = row(json!({"external_id": "dup", "name": "Z"}));
    let keys = vec!["external_id".to_string()];
    for _ in 0..3 {
        let found = find_by_stable_keys(&store, &r, &keys).await.unwrap().unwrap();
        assert_eq!(found.id, "a");
    }
}

#[tokio::test]
async fn upsert_explicit_missing_id_creates_with_that_id() {
    let store = store().await;
    let (node, outcome) = upsert_node(
        &store,
        &row(json!({"id": "fresh", "name": "Fresh"})),
        &["external_id".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(outcome, Upserted::Created);
    assert_eq!(node.id, "fresh");

    let (_, outcome) = upsert_node(
        &store,
        &row(json!({"id": "fresh", "name": "Fresher"})),
        &["external_id".to_string()],
    )
    .await
    .unwrap();
    assert_eq!(outcome, Upserted::Updated);
    assert_eq!(store.get_node("fresh").await.unwrap().unwrap().name, "Fresher");
}
