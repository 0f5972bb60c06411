//! REST query layer and WebSocket stream of the monitoring server.
//!
//! ## Endpoints
//!
//! - `GET /api/state` - masked endpoint → latest metrics
//! - `GET /api/v1/servers` - monitored servers with status
//! - `GET /api/v1/servers/metrics?url=` - metrics of one server
//! - `GET /api/v1/alerts/active` - active alert conditions
//! - `GET /api/v1/health` - overall health
//! - `WS /ws` - live hub events

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{AlertInfo, ApiResponse, HealthResponse, ServerInfo, ServerStatus, ServersResponse};

use std::net::SocketAddr;

use anyhow::Context;
use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ApiSettings;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,

    /// Bearer token required on every route when set
    pub auth_token: Option<String>,

    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            auth_token: None,
            enable_cors: true,
        }
    }
}

impl TryFrom<&ApiSettings> for ApiConfig {
    type Error = anyhow::Error;

    fn try_from(settings: &ApiSettings) -> anyhow::Result<Self> {
        let bind_addr = settings
            .bind_addr
            .parse()
            .with_context(|| format!("invalid API bind address {:?}", settings.bind_addr))?;

        Ok(Self {
            bind_addr,
            auth_token: settings.auth_token.clone(),
            enable_cors: true,
        })
    }
}

/// Build the router with every route, without binding it.
pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    let mut app = Router::new()
        .route("/api/state", get(routes::state::get_state))
        .route("/api/v1/servers", get(routes::servers::list_servers))
        .route(
            "/api/v1/servers/metrics",
            get(routes::servers::get_server_metrics),
        )
        .route("/api/v1/alerts/active", get(routes::alerts::active_alerts))
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/ws", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    if let Some(token) = config.auth_token.clone() {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    app
}

/// Spawn the API server
///
/// Starts serving in a background task and returns the bound address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
