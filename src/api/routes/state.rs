//! Raw state dump

use std::collections::BTreeMap;

use axum::{Json, extract::State};

use crate::Metrics;
use crate::api::state::ApiState;

/// GET /api/state
///
/// Latest metrics keyed by masked endpoint, in the same shape as the hub's
/// `metrics_update` payload.
pub async fn get_state(State(state): State<ApiState>) -> Json<BTreeMap<String, Metrics>> {
    let (_, latest) = state.poller.snapshot().await;

    Json(
        latest
            .into_iter()
            .map(|(endpoint, metrics)| (endpoint.masked().to_string(), metrics))
            .collect(),
    )
}
