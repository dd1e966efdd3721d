//! HTTP control API
//!
//! Two endpoints mutate the route inventory at runtime:
//!
//! - `POST /add` persists a route and starts its routers
//! - `POST /del` removes a route from the inventory; its routers keep running
//!
//! Every request is answered with HTTP 200 and a `{code:200,data:<outcome>}`
//! body. There is no authentication: bind it to a trusted interface.

use axum::{
    body::{self, Body},
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ConfigStore;
use crate::error::{RelayError, Result};
use crate::lifecycle::RouterManager;
use crate::route::Route;

/// Default listen address of the control API
pub const DEFAULT_API_ADDR: &str = "0.0.0.0:999";

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared control API state
pub struct ApiState {
    /// Route inventory
    pub store: Arc<ConfigStore>,
    /// Starts routers for added routes
    pub routers: Arc<RouterManager>,
}

/// Control API server
pub struct ControlApi {
    state: Arc<ApiState>,
}

impl ControlApi {
    /// Create the control API over a store and a router manager
    pub fn new(store: Arc<ConfigStore>, routers: Arc<RouterManager>) -> Self {
        Self {
            state: Arc::new(ApiState { store, routers }),
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/add", post(add_route))
            .route("/del", post(delete_route))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until the listener fails or `shutdown` resolves
    pub async fn run<F>(&self, addr: &str, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::Config(format!("Failed to bind control API on {}: {}", addr, e)))?;
        info!("Control API listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Persist a route, then start it
async fn add_route(State(state): State<Arc<ApiState>>, body: Body) -> impl IntoResponse {
    let route = read_route(body).await;

    // Duplicates are activated too; rejected or unsaved routes never are.
    let outcome = match state.store.add_route(route.clone()).await {
        Ok(outcome) => {
            state.routers.activate_one(&route);
            outcome.as_str()
        }
        Err(e) => failure(e),
    };

    reply(outcome)
}

/// Remove a route from the inventory
async fn delete_route(State(state): State<Arc<ApiState>>, body: Body) -> impl IntoResponse {
    let route = read_route(body).await;

    let outcome = match state.store.delete_route(&route).await {
        Ok(outcome) => outcome.as_str(),
        Err(e) => failure(e),
    };

    reply(outcome)
}

/// Unreadable or malformed bodies become an empty route
async fn read_route(body: Body) -> Route {
    let bytes = match body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return Route::default();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        warn!("Malformed route in request body, continuing with an empty route: {}", e);
        Route::default()
    })
}

fn failure(e: RelayError) -> &'static str {
    warn!("Control request failed: {}", e);
    match e {
        RelayError::Config(_) => "invalid",
        _ => "error",
    }
}

fn reply(outcome: &str) -> impl IntoResponse {
    (StatusCode::OK, format!("{{code:200,data:{}}}", outcome))
}
