//! WebSocket upgrade handler - one gateway task per connection

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::coordinator::OutboundRx;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, PlayerId};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = PlayerId::generate();
    info!(player_id = %player_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_queue);

    if let Err(e) = state.session.connect(player_id.clone(), outbound_tx).await {
        error!(player_id = %player_id, error = %e, "Failed to register connection");
        return;
    }

    run_session(&player_id, &state, ws_sink, ws_stream, outbound_rx).await;

    // Cleanup on disconnect
    if let Err(e) = state.session.disconnect(player_id.clone()).await {
        debug!(player_id = %player_id, error = %e, "Disconnect after session shutdown");
    }

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: &PlayerId,
    state: &AppState,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbound_rx: OutboundRx,
) {
    let rate_limiter = PlayerRateLimiter::new(state.config.input_rate_limit);

    // Spawn writer task: session frames -> WebSocket
    let writer_id = player_id.clone();
    let mut writer_handle = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(text.to_string())).await {
                debug!(player_id = %writer_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader loop: WebSocket -> session, in arrival order
    loop {
        let result = tokio::select! {
            _ = &mut writer_handle => {
                debug!(player_id = %player_id, "Outbound closed, ending session");
                return;
            }
            frame = ws_stream.next() => match frame {
                Some(result) => result,
                None => break,
            },
        };

        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match ClientMsg::parse(&text) {
                    Ok(msg) => {
                        debug!(player_id = %player_id, kind = msg.kind(), "Client message");
                        if state.session.submit(player_id.clone(), msg).await.is_err() {
                            debug!(player_id = %player_id, "Session closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Dropped client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}
