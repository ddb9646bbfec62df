//! WebSocket handler — init handshake + unified bus event streaming.
//!
//! Protocol:
//!   1. Client sends:  `{ "type": "start", "name": "Court 1 display" }`;
//!      the host application adds `"host": true` to receive result data
//!   2. Server sends:  `{ "type": "init", "source_id": "ws.abc123", "game_state": { ... } }`
//!   3. Server streams `HoopMessage` events; the client may send game
//!      actions (`{ "type": "add_score", "team": 1 }`) at any time

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::WebState;
use crate::state::config;
use hoopclock::{GameAction, GameCommand, HoopMessage};

/// GET /api/ws — upgrade to WebSocket.
pub async fn ws_upgrade(
    State(state): State<Arc<WebState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<WebState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Phase 1: Wait for "start" message from client
    let hello = loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => {
                if let Some(hello) = parse_start_message(&text) {
                    break hello;
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            _ => continue,
        }
    };

    // Phase 2: Send "init" with source_id and the current game
    let source_id = format!("ws.{}", config::generate_id());
    let init_msg = serde_json::json!({
        "type": "init",
        "source_id": source_id,
        "game_state": state.root.board.snapshot(),
        "finished": state.root.board.finished(),
    });
    if ws_tx
        .send(Message::text(init_msg.to_string()))
        .await
        .is_err()
    {
        return;
    }

    let ClientHello { name, host } = hello;
    state.ws_count.fetch_add(1, Ordering::Relaxed);
    if host {
        state.root.hosts.attach();
    }
    state.publish_telemetry();
    tracing::info!("ws: client '{name}' connected (source_id={source_id}, host={host})");

    // Phase 3: Stream bus events + receive actions
    let mut bus_rx = state.bus_tx.subscribe();

    let mut send_task = tokio::spawn(async move {
        loop {
            match bus_rx.recv().await {
                Ok(msg) => {
                    if let Ok(json) = serde_json::to_string(&msg)
                        && ws_tx.send(Message::text(json)).await.is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("ws: lagged {n}");
                }
            }
        }
    });

    let ws_source = source_id.clone();
    let bus_tx = state.bus_tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => handle_ws_command(&text, &ws_source, &bus_tx),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.ws_count.fetch_sub(1, Ordering::Relaxed);
    if host {
        state.root.hosts.detach();
    }
    state.publish_telemetry();
    tracing::info!("ws: client '{name}' disconnected (source_id={source_id})");
}

/// Who is on the other end of a socket, from its `start` message.
#[derive(Debug, PartialEq, Eq)]
struct ClientHello {
    name: String,
    /// The host application, which takes result payloads.
    host: bool,
}

/// Parse a "start" handshake message.
fn parse_start_message(text: &str) -> Option<ClientHello> {
    #[derive(serde::Deserialize)]
    struct StartMsg {
        #[serde(rename = "type")]
        msg_type: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        host: bool,
    }
    let msg: StartMsg = serde_json::from_str(text).ok()?;
    if msg.msg_type != "start" {
        return None;
    }
    let name = if msg.name.is_empty() {
        "anonymous".to_string()
    } else {
        msg.name
    };
    Some(ClientHello {
        name,
        host: msg.host,
    })
}

/// Parse a client command. Accepts a bare action or a command wrapping
/// one with a `request_id`.
fn parse_command(text: &str) -> Option<GameCommand> {
    if let Ok(cmd) = serde_json::from_str::<GameCommand>(text) {
        return Some(cmd);
    }
    serde_json::from_str::<GameAction>(text)
        .ok()
        .map(|action| GameCommand {
            request_id: None,
            action,
        })
}

/// Parse a client command and emit it on the bus.
fn handle_ws_command(text: &str, source: &str, bus_tx: &broadcast::Sender<HoopMessage>) {
    match parse_command(text) {
        Some(cmd) => {
            let _ = bus_tx.send(HoopMessage::new(cmd).source(source));
        }
        None => tracing::debug!("ws: ignoring unrecognized message from {source}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoopclock::Team;

    #[test]
    fn start_message_defaults_name() {
        assert_eq!(
            parse_start_message(r#"{"type":"start"}"#),
            Some(ClientHello {
                name: "anonymous".into(),
                host: false,
            })
        );
        assert_eq!(parse_start_message(r#"{"type":"reset"}"#), None);
    }

    #[test]
    fn host_flag_marks_host_client() {
        let hello = parse_start_message(r#"{"type":"start","name":"Chat app","host":true}"#);
        assert_eq!(
            hello,
            Some(ClientHello {
                name: "Chat app".into(),
                host: true,
            })
        );
    }

    #[test]
    fn bare_and_wrapped_actions_parse() {
        let bare = parse_command(r#"{"type":"add_score","team":1,"points":2}"#).unwrap();
        assert_eq!(bare.request_id, None);
        assert_eq!(
            bare.action,
            GameAction::AddScore {
                team: Team::One,
                points: 2
            }
        );

        let wrapped =
            parse_command(r#"{"request_id":"r9","action":{"type":"rematch"}}"#).unwrap();
        assert_eq!(wrapped.request_id.as_deref(), Some("r9"));
        assert_eq!(wrapped.action, GameAction::Rematch);

        assert!(parse_command(r#"{"type":"jump_ball"}"#).is_none());
    }
}
