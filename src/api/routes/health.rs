//! Health check endpoint

use std::collections::BTreeMap;

use axum::{Json, extract::State};

use crate::api::{
    state::ApiState,
    types::{HealthResponse, HealthStatus, ServerHealth, ServerInfo},
};

use super::servers::server_infos;

/// GET /api/v1/health
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let servers = server_infos(&state).await;
    let alerts = state.poller.alerts().await.len();

    Json(summarize(servers, alerts))
}

/// `error` when no server is reachable, `degraded` when some are offline
/// or any alert is active, `ok` otherwise.
pub fn summarize(servers: Vec<ServerInfo>, alerts: usize) -> HealthResponse {
    let total = servers.len();
    let online = servers.iter().filter(|s| s.status.is_online()).count();
    let offline = total - online;

    let status = if online == 0 {
        HealthStatus::Error
    } else if offline > 0 || alerts > 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };

    let servers: BTreeMap<String, ServerHealth> = servers
        .into_iter()
        .map(|server| {
            let health = ServerHealth {
                url: server.url.clone(),
                hostname: server.metrics.map(|m| m.hostname),
                status: server.status,
            };
            (server.url, health)
        })
        .collect();

    HealthResponse {
        status,
        servers,
        total,
        online,
        offline,
        alerts,
    }
}
