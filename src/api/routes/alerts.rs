//! Active alert listing

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{AlertInfo, ApiResponse, Severity},
};

/// GET /api/v1/alerts/active
pub async fn active_alerts(
    State(state): State<ApiState>,
) -> ApiResult<Json<ApiResponse<Vec<AlertInfo>>>> {
    let alerts = state.poller.alerts().await;
    let (_, latest) = state.poller.snapshot().await;

    let mut infos: Vec<AlertInfo> = alerts
        .iter()
        .map(|key| AlertInfo {
            id: key.to_string(),
            server_url: key.endpoint.masked().to_string(),
            hostname: latest.get(&key.endpoint).map(|m| m.hostname.clone()),
            kind: key.kind,
            sub_key: key.sub_key.clone(),
            severity: Severity::from(key.kind),
        })
        .collect();
    infos.sort_by(|a, b| a.id.cmp(&b.id));

    let message = format!("{} active alert(s)", infos.len());
    Ok(Json(ApiResponse::ok(message, infos)))
}
