pub mod edges;
pub mod import;
pub mod nodes;
pub mod roles;

use std::sync::Arc;

use axum::Extension;
use axum::Router;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use trellis_auth::AuthState;

use crate::state::AppState;

/// Overall request body cap; the import route enforces its own 5 MiB file
/// limit with a typed 413 below this.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_state = AuthState {
        gate: state.gate.clone(),
    };

    Router::new()
        .route("/api/nodes", get(nodes::list_nodes).post(nodes::create_node))
        .route(
            "/api/nodes/{id}",
            get(nodes::get_node).patch(nodes::update_node),
        )
        .route("/api/graph/edge", post(edges::add_edge))
        .route("/api/graph/traverse", get(edges::traverse))
        .route("/api/graph/expand", get(edges::expand))
        .route("/api/import", post(import::import))
        .route("/api/admin/roles", get(roles::list_roles))
        .layer(Extension(auth_state))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
