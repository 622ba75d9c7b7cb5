// HTTP routes: probe execution and the topology surface it depends on

mod error;
mod execute;
mod http;
mod inventory;
mod sites;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::orchestrator::Orchestrator;
use crate::store::SqliteStore;

pub use error::ApiError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) orchestrator: Arc<Orchestrator>,
    pub(crate) store: Arc<SqliteStore>,
    /// Inventory file re-read by the refresh endpoint.
    pub(crate) inventory_path: Option<Arc<str>>,
}

pub fn app(
    orchestrator: Arc<Orchestrator>,
    store: Arc<SqliteStore>,
    inventory_path: Option<String>,
) -> Router {
    let state = AppState {
        orchestrator,
        store,
        inventory_path: inventory_path.map(Arc::from),
    };
    Router::new()
        .route("/", get(|| async { "siteprobe: ready" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/execute/ping/{site_id}", post(execute::ping_site)) // POST /execute/ping/{site_id}
        .route("/execute/diagnose/{site_id}", post(execute::diagnose_site)) // POST /execute/diagnose/{site_id}
        .route("/api/sites", get(sites::list_sites).post(sites::create_site))
        .route(
            "/api/sites/{site_id}",
            get(sites::get_site).delete(sites::delete_site),
        )
        .route("/api/sites/{site_id}/bases", post(sites::add_base))
        .route("/api/sites/{site_id}/loopbacks", post(sites::add_loopback))
        .route("/api/sites/{site_id}/results", get(sites::recent_results))
        .route("/api/bases/{base_id}/clients", post(sites::add_client))
        .route("/api/inventory/refresh", post(inventory::refresh))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
