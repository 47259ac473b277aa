use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{
        connect_info::ConnectInfo,
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{SinkExt, StreamExt};

use crate::metrics::{FEED_CONNECTIONS_CLOSED, FEED_CONNECTIONS_OPENED, FEED_CONNECTION_DURATION};
use crate::server::AppState;

/// Activity feed upgrade handler. No authentication, no sub-protocol.
#[tracing::instrument(name = "ws.upgrade", skip(ws, state, connect_info))]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
) -> Response {
    let peer = connect_info.map(|Extension(ConnectInfo(addr))| addr);
    tracing::debug!(peer = ?peer, "Activity feed upgrade requested");

    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

/// Pump broadcast frames to one client until either side goes away
#[tracing::instrument(
    name = "ws.connection",
    skip(socket, state),
    fields(otel.kind = "server")
)]
async fn handle_socket(socket: WebSocket, state: AppState, peer: Option<SocketAddr>) {
    let connection_start = Instant::now();
    let (handle, mut rx) = state.connections.register(peer);
    let connection_id = handle.id;
    // The registry holds the only long-lived sender; dropping ours lets
    // unregister/disconnect_all close the writer below.
    drop(handle);

    FEED_CONNECTIONS_OPENED.inc();
    tracing::info!(connection_id = %connection_id, peer = ?peer, "Activity feed client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Writer: one text frame per activity
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Reader: the feed is server-to-client, so inbound data is ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Received close frame");
                    break;
                }
                Ok(Message::Text(_)) | Ok(Message::Binary(_)) => {
                    tracing::trace!(connection_id = %connection_id, "Ignoring client message");
                }
                // Pongs are answered by axum
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
            send_task.abort();
        }
    }

    state.connections.unregister(connection_id);

    FEED_CONNECTIONS_CLOSED.inc();
    let duration = connection_start.elapsed().as_secs_f64();
    FEED_CONNECTION_DURATION.observe(duration);

    tracing::info!(
        connection_id = %connection_id,
        peer = ?peer,
        duration_secs = duration,
        "Activity feed client disconnected"
    );
}
