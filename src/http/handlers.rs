use super::state::AppState;
use crate::session::{ClientFrame, ServerMessage, SessionBridge};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tracing::{error, info};

/// GET /healthz
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET / (WebSocket)
/// Relay one browser audio stream to the speech service
pub async fn stream_transcription(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Map a WebSocket message to what the bridge cares about.
///
/// Text payloads are forwarded like binary ones; the relay never inspects
/// what the client sends.
pub fn client_frame(message: Message) -> ClientFrame {
    match message {
        Message::Binary(data) => ClientFrame::Audio(data),
        Message::Text(text) => ClientFrame::Audio(text.into_bytes()),
        Message::Close(_) => ClientFrame::Close,
        Message::Ping(_) | Message::Pong(_) => ClientFrame::Control,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let active = state.session_started();
    info!(active_sessions = active, "Client connected to STT server");

    let (sender, receiver) = socket.split();

    let mut outbound = sender.with(|message: ServerMessage| {
        futures::future::ready(
            message
                .to_json()
                .map(Message::Text)
                .map_err(axum::Error::new),
        )
    });
    let inbound = receiver.map(|message| message.map(client_frame));

    match SessionBridge::open(state.recognizer.as_ref(), &state.settings, state.close_grace).await
    {
        Ok(bridge) => {
            bridge.run(inbound, outbound).await;
        }
        Err(e) => {
            error!("Failed to open upstream recognition stream: {}", e);
            let _ = outbound.send(ServerMessage::stt_error()).await;
            let _ = outbound.close().await;
        }
    }

    let active = state.session_finished();
    info!(active_sessions = active, "Client session finished");
}
