use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use hydra_worker::WorkerEvent;
use tokio::sync::mpsc;

use crate::AppState;

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Pushes `init` on connect, forwards every `signals_update`/`blowup_update`
/// the workers broadcast, and replies `pong` to a client `ping` (§6.2). The
/// three concurrent halves (init+forward, broadcast relay, client reader)
/// share one outgoing queue so only one task ever owns the socket's sender.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let signals = state.handles.signal_store.active(None, None).await;
    let summary = state.handles.signal_store.summary().await;
    let init = serde_json::json!({"type": "init", "signals": signals, "summary": summary});
    if let Ok(text) = serde_json::to_string(&init) {
        let _ = out_tx.send(text);
    }

    let writer_task = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut events_rx = state.handles.subscribe();
    let broadcast_tx = out_tx.clone();
    let broadcast_task = tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            let payload = match event {
                WorkerEvent::SignalsUpdate { summary, .. } => {
                    serde_json::json!({"type": "signals_update", "signals": summary.total_active, "summary": summary})
                }
                WorkerEvent::BlowupUpdate(blowup) => {
                    serde_json::json!({"type": "blowup_update", "blowup": blowup})
                }
            };
            if let Ok(text) = serde_json::to_string(&payload) {
                if broadcast_tx.send(text).is_err() {
                    break;
                }
            }
        }
    });

    let reader_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) if text.trim() == "ping" => {
                    if out_tx.send("pong".to_string()).is_err() {
                        break;
                    }
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer_task => {},
        _ = broadcast_task => {},
        _ = reader_task => {},
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
