//! REST endpoint handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::Utc;
use tokio::sync::broadcast;

use super::types::{ActionResponse, GameAction, PostSettingsResponse, StatusResponse};
use super::{REPLY_TIMEOUT, WebState};
use crate::state::config::{HoopConfig, generate_id};
use hoopclock::report::{build_result, format_summary};
use hoopclock::{
    CommandOutcome, ConfigCommand, ConfigOutcome, GameCommand, GameResult, GameState, HoopEvent,
    HoopMessage,
};

// ---------------------------------------------------------------------------
// Request-reply over the bus
// ---------------------------------------------------------------------------

/// Wait for the first event `pick` accepts, up to `REPLY_TIMEOUT`.
async fn await_reply<T>(
    mut bus_rx: broadcast::Receiver<HoopMessage>,
    pick: impl Fn(&HoopEvent) -> Option<T>,
) -> Option<T> {
    tokio::time::timeout(REPLY_TIMEOUT, async {
        loop {
            match bus_rx.recv().await {
                Ok(msg) => {
                    if let Some(reply) = pick(&msg.event) {
                        return Some(reply);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<Arc<WebState>>) -> Json<StatusResponse> {
    let actors = state.actors.read().await.clone();
    Json(StatusResponse {
        actors,
        phase: state.root.board.snapshot().phase,
        host_clients: state.root.hosts.count(),
    })
}

/// GET /api/game
pub async fn get_game(State(state): State<Arc<WebState>>) -> Json<GameState> {
    Json(state.root.board.snapshot())
}

/// POST /api/game/action — apply an action via bus request-reply.
///
/// Emits a `GameCommand`, waits for the scoreboard's `CommandOutcome` with
/// the matching `request_id`, then returns it with the resulting state.
pub async fn post_action(
    State(state): State<Arc<WebState>>,
    Json(action): Json<GameAction>,
) -> Result<Json<ActionResponse>, StatusCode> {
    let request_id = generate_id();
    let bus_rx = state.bus_tx.subscribe();

    let _ = state.bus_tx.send(
        HoopMessage::new(GameCommand {
            request_id: Some(request_id.clone()),
            action,
        })
        .source(&state.actor_id),
    );

    let outcome = await_reply(bus_rx, |event| match event {
        HoopEvent::CommandOutcome(outcome) if outcome.request_id == request_id => {
            Some(outcome.clone())
        }
        _ => None,
    })
    .await;

    match outcome {
        Some(CommandOutcome {
            applied, finished, ..
        }) => Ok(Json(ActionResponse {
            applied,
            finished,
            state: state.root.board.snapshot(),
        })),
        None => {
            tracing::warn!("game action: timed out waiting for the scoreboard");
            Err(StatusCode::GATEWAY_TIMEOUT)
        }
    }
}

/// The finished result, or a live export of the game in progress.
fn current_result(state: &WebState) -> GameResult {
    match state.root.board.finished() {
        Some(finished) => finished.result,
        None => build_result(&state.root.board.snapshot(), Utc::now()),
    }
}

/// GET /api/game/result
pub async fn get_result(State(state): State<Arc<WebState>>) -> Json<GameResult> {
    Json(current_result(&state))
}

/// GET /api/game/summary — plain-text summary for pasting into a chat.
pub async fn get_summary(State(state): State<Arc<WebState>>) -> impl IntoResponse {
    let summary = match state.root.board.finished() {
        Some(finished) => finished.summary,
        None => format_summary(&current_result(&state)),
    };
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], summary)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// GET /api/settings — returns the full persisted config.
pub async fn get_settings(State(state): State<Arc<WebState>>) -> Json<HoopConfig> {
    Json(state.root.system.snapshot())
}

/// POST /api/settings — config replacement via bus request-reply.
///
/// SystemActor handles persistence and actor reconciliation.
pub async fn post_settings(
    State(state): State<Arc<WebState>>,
    Json(new_config): Json<HoopConfig>,
) -> Json<PostSettingsResponse> {
    let request_id = generate_id();
    let bus_rx = state.bus_tx.subscribe();

    let _ = state.bus_tx.send(
        HoopMessage::new(ConfigCommand {
            request_id: Some(request_id.clone()),
            config: new_config,
        })
        .source(&state.actor_id),
    );

    let outcome = await_reply(bus_rx, |event| match event {
        HoopEvent::ConfigOutcome(outcome) if outcome.request_id == request_id => {
            Some(outcome.clone())
        }
        _ => None,
    })
    .await;

    match outcome {
        Some(ConfigOutcome {
            restarted,
            stopped,
            started,
            ..
        }) => Json(PostSettingsResponse {
            restarted,
            stopped,
            started,
        }),
        None => {
            tracing::warn!("config update: timed out waiting for ConfigOutcome");
            Json(PostSettingsResponse {
                restarted: Vec::new(),
                stopped: Vec::new(),
                started: Vec::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::state::SystemState;
    use crate::state::config::SystemConfig;
    use crate::state::config::tests::temp_config_path;
    use hoopclock::{GameController, GamePhase, GameSettings, NullSink, Team};

    fn web_state(name: &str) -> (Arc<WebState>, crate::state::BoardWriter) {
        let (root, writer) = SystemState::with_config(SystemConfig::new(temp_config_path(name)));
        let (bus_tx, _) = broadcast::channel(64);
        let addr: SocketAddr = "127.0.0.1:3030".parse().unwrap();
        let state = WebState::new(Arc::new(root), bus_tx, addr, "webserver.0".into());
        (Arc::new(state), writer)
    }

    #[tokio::test]
    async fn game_reads_published_board() {
        let (state, writer) = web_state("routes-game");
        let mut controller = GameController::new(GameSettings::default(), Box::new(NullSink));
        controller.add_score(Team::Two, 2);
        writer.publish(controller.snapshot());

        let Json(game) = get_game(State(Arc::clone(&state))).await;
        assert_eq!(game.score2, 2);
        let Json(status) = get_status(State(state)).await;
        assert_eq!(status.phase, GamePhase::NotStarted);
        assert_eq!(status.host_clients, 0);
        assert!(status.actors.contains_key("scoreboard"));
    }

    #[tokio::test]
    async fn result_is_live_until_finished() {
        let (state, writer) = web_state("routes-result");
        let mut controller = GameController::new(GameSettings::default(), Box::new(NullSink));
        controller.add_score(Team::One, 4);
        writer.publish(controller.snapshot());

        let Json(result) = get_result(State(state)).await;
        assert_eq!(result.score1, 4);
        assert_eq!(result.total_points, 4);
        assert_eq!(result.game_time, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn action_times_out_without_scoreboard() {
        let (state, _writer) = web_state("routes-timeout");
        let reply = post_action(State(state), Json(GameAction::ToggleMainClock)).await;
        assert_eq!(reply.err(), Some(StatusCode::GATEWAY_TIMEOUT));
    }

    #[tokio::test]
    async fn action_returns_scoreboard_outcome() {
        let (state, _writer) = web_state("routes-action");
        let mut rx = state.bus_tx.subscribe();
        let bus_tx = state.bus_tx.clone();
        tokio::spawn(async move {
            while let Ok(msg) = rx.recv().await {
                if let HoopEvent::GameCommand(GameCommand {
                    request_id: Some(request_id),
                    ..
                }) = msg.event
                {
                    let _ = bus_tx.send(HoopMessage::new(CommandOutcome {
                        request_id,
                        applied: true,
                        finished: false,
                    }));
                }
            }
        });

        let Json(reply) = post_action(
            State(state),
            Json(GameAction::AddFoul { team: Team::One }),
        )
        .await
        .unwrap();
        assert!(reply.applied);
        assert!(!reply.finished);
    }
}
