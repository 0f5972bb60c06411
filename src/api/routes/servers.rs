//! Server listing and per-server metrics

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::Metrics;
use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{ApiResponse, ServerInfo, ServerStatus, ServersResponse},
};

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    /// Raw or masked endpoint descriptor
    url: Option<String>,
}

/// Every configured endpoint in configuration order, with its status.
pub(crate) async fn server_infos(state: &ApiState) -> Vec<ServerInfo> {
    let (endpoints, latest) = state.poller.snapshot().await;
    let alerts = state.poller.alerts().await;

    let mut servers = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        let metrics = latest.get(&endpoint).cloned();
        let status = ServerStatus::project(metrics.as_ref(), alerts.for_endpoint(&endpoint));
        let last_update = state.last_update(&endpoint, metrics.as_ref()).await;

        servers.push(ServerInfo {
            url: endpoint.masked().to_string(),
            status,
            metrics,
            last_update,
        });
    }
    servers
}

/// GET /api/v1/servers
pub async fn list_servers(
    State(state): State<ApiState>,
) -> ApiResult<Json<ApiResponse<ServersResponse>>> {
    let servers = server_infos(&state).await;
    let total = servers.len();

    Ok(Json(ApiResponse::ok(
        "servers retrieved",
        ServersResponse { servers, total },
    )))
}

/// GET /api/v1/servers/metrics?url=
///
/// Accepts the raw descriptor as well as the masked one.
pub async fn get_server_metrics(
    State(state): State<ApiState>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<ApiResponse<Metrics>>> {
    let url = query
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("url query parameter is required".to_string()))?;

    let (endpoints, mut latest) = state.poller.snapshot().await;
    let metrics = endpoints
        .iter()
        .find(|endpoint| endpoint.matches(&url))
        .and_then(|endpoint| latest.remove(endpoint));

    match metrics {
        Some(metrics) => Ok(Json(ApiResponse::ok("server metrics retrieved", metrics))),
        None => Err(ApiError::NotFound(format!(
            "server not found: {}",
            crate::util::mask_password(&url)
        ))),
    }
}
