mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

pub use state::{AppState, WebConfig};

use trellis_auth::{Gate, JwtAuthenticator, RoleMap};
use trellis_catalog::store::{CatalogStore, SqliteCatalogStore};

/// Start the catalog API server over its own store connection.
pub async fn start_web_server(config: WebConfig) -> anyhow::Result<()> {
    let store = SqliteCatalogStore::open(&config.db_path)?;
    store.migrate().await?;

    let roles = Arc::new(RoleMap::load(config.roles_file.as_deref().map(Path::new)));
    let gate = Gate::new(
        Arc::new(JwtAuthenticator::new(config.jwt_secret.clone())),
        roles.clone(),
    );

    let state = Arc::new(AppState {
        store: Arc::new(store) as Arc<dyn CatalogStore>,
        roles,
        gate,
    });

    let app = routes::build_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!("starting catalog API on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
