//! WebSocket bridge to the broadcast hub

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tracing::{debug, info, warn};

use crate::api::state::ApiState;

/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Forward every hub frame to the client until either side goes away.
///
/// When the hub drops this subscriber for being slow, the socket is closed.
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    let mut subscription = match state.hub().subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("cannot subscribe WebSocket client: {e}");
            return;
        }
    };
    let id = subscription.id;
    info!(id, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = subscription.recv().await {
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Inbound messages are ignored; pongs are answered by axum
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    if let Err(e) = state.hub().unsubscribe(id).await {
        debug!("unsubscribe after disconnect failed: {e}");
    }
    info!(id, "WebSocket client disconnected");
}
