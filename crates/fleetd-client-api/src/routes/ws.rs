//! `/procs/{name}/tail-stream`: replay-then-live log delivery over a
//! WebSocket, mirroring `original_source/app/main.py`'s
//! `tail_process_output_stream` but built on axum's native `ws` extractor
//! rather than a hand-rolled upgrade handshake (the teacher's own
//! `util/websocket.rs` predates that extractor; axum now ships one, so
//! there's nothing left worth reimplementing).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::AppState;

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/procs/:name/tail-stream", get(tail_stream))
}

#[derive(Deserialize)]
pub struct TailStreamQuery {
    #[serde(default)]
    n: i64,
    #[serde(default = "default_true")]
    include_stderr: bool,
}

fn default_true() -> bool {
    true
}

async fn tail_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<TailStreamQuery>,
) -> Result<Response, crate::error::ApiError> {
    let supervisor = state
        .registry
        .get(&name)
        .ok_or_else(|| fleetd_core::SupervisorError::NotFound(name.clone()))?;

    Ok(ws.on_upgrade(move |socket| stream_logs(socket, supervisor, query.n, query.include_stderr)))
}

async fn stream_logs(
    mut socket: WebSocket,
    supervisor: std::sync::Arc<fleetd_core::ProcessSupervisor>,
    n: i64,
    include_stderr: bool,
) {
    let mut subscription = match supervisor.subscribe(n, include_stderr).await {
        Ok(sub) => sub,
        Err(err) => {
            let _ = socket.send(Message::Text(format!("{{\"error\":\"{err}\"}}"))).await;
            return;
        }
    };

    loop {
        tokio::select! {
            record = subscription.receiver.recv() => {
                let Some(record) = record else { break };
                let Ok(json) = serde_json::to_string(&record) else { continue };
                if socket.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    supervisor.unsubscribe(subscription.id).await;
}
