//! Unified `HoopMessage` bus types.
//!
//! All events flow through a single `broadcast<HoopMessage>` channel. Each
//! message has a source (global ID of the originator), a timestamp and a
//! typed event. Producers create messages; consumers subscribe and filter.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActorState, Cue, GameAction, GameFinished, GameState, HoopConfig, HostRequest};

// ---------------------------------------------------------------------------
// Top-level message
// ---------------------------------------------------------------------------

/// A single event on the unified bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoopMessage {
    #[serde(default)]
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub event: HoopEvent,
}

impl HoopMessage {
    /// Create a new message with the current UTC timestamp.
    pub fn new(event: impl Into<HoopEvent>) -> Self {
        Self {
            source: String::new(),
            timestamp: Utc::now(),
            event: event.into(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

// ---------------------------------------------------------------------------
// From impls — inner event types -> HoopEvent
// ---------------------------------------------------------------------------

impl From<GameCommand> for HoopEvent {
    fn from(cmd: GameCommand) -> Self {
        HoopEvent::GameCommand(cmd)
    }
}

impl From<GameAction> for HoopEvent {
    fn from(action: GameAction) -> Self {
        HoopEvent::GameCommand(GameCommand {
            request_id: None,
            action,
        })
    }
}

impl From<CommandOutcome> for HoopEvent {
    fn from(outcome: CommandOutcome) -> Self {
        HoopEvent::CommandOutcome(outcome)
    }
}

impl From<GameState> for HoopEvent {
    fn from(state: GameState) -> Self {
        HoopEvent::GameSnapshot(Box::new(state))
    }
}

impl From<GameFinished> for HoopEvent {
    fn from(finished: GameFinished) -> Self {
        HoopEvent::GameFinished(Box::new(finished))
    }
}

impl From<Cue> for HoopEvent {
    fn from(cue: Cue) -> Self {
        HoopEvent::Cue(cue)
    }
}

impl From<HostRequest> for HoopEvent {
    fn from(request: HostRequest) -> Self {
        HoopEvent::HostRequest(request)
    }
}

impl From<ActorState> for HoopEvent {
    fn from(state: ActorState) -> Self {
        HoopEvent::ActorStatus(state)
    }
}

impl From<ConfigCommand> for HoopEvent {
    fn from(cmd: ConfigCommand) -> Self {
        HoopEvent::ConfigCommand(cmd)
    }
}

impl From<ConfigOutcome> for HoopEvent {
    fn from(result: ConfigOutcome) -> Self {
        HoopEvent::ConfigOutcome(result)
    }
}

impl From<AlertMessage> for HoopEvent {
    fn from(alert: AlertMessage) -> Self {
        HoopEvent::Alert(alert)
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// The typed event payload carried by a `HoopMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoopEvent {
    /// Scoreboard action request (from REST or a WS client).
    GameCommand(GameCommand),
    /// Scoreboard reply to a `GameCommand` carrying a `request_id`.
    CommandOutcome(CommandOutcome),
    /// Scoreboard state after an action or a tick.
    GameSnapshot(Box<GameState>),
    /// The game just finished.
    GameFinished(Box<GameFinished>),
    /// Audio cue for the presentation layer.
    Cue(Cue),
    /// Request for the host application (send data, haptics, alerts).
    HostRequest(HostRequest),
    /// Generic actor status update.
    ActorStatus(ActorState),
    /// Config mutation request (emitted by POST handler).
    ConfigCommand(ConfigCommand),
    /// Config mutation outcome (emitted by SystemActor after processing).
    ConfigOutcome(ConfigOutcome),
    /// User-visible warning (e.g. a result that was not delivered).
    Alert(AlertMessage),
}

// ---------------------------------------------------------------------------
// GameCommand — scoreboard action request / reply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCommand {
    /// Opaque correlation ID. When present, the scoreboard replies with a
    /// `CommandOutcome` carrying the same ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub action: GameAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub request_id: String,
    /// False when the action was absorbed as a no-op.
    pub applied: bool,
    /// True when this action finished the game.
    #[serde(default)]
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// ConfigCommand — config replacement request
// ---------------------------------------------------------------------------

/// Replacement of the whole system configuration (POST /api/settings).
///
/// Processed exclusively by `SystemActor`, which persists it, pushes the cue
/// flag to the scoreboard, reconciles the webservers, and emits a
/// `ConfigOutcome` when `request_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub config: HoopConfig,
}

/// Acknowledgment of a config mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOutcome {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restarted: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stopped: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub started: Vec<String>,
}

// ---------------------------------------------------------------------------
// AlertMessage — user-visible notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warn,
}

/// A user-visible alert. Info/debug stays in the tracing backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    pub level: AlertLevel,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Team;

    #[test]
    fn messages_are_kind_tagged() {
        let msg = HoopMessage::new(GameAction::AddFoul { team: Team::One }).source("ws.1");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["source"], "ws.1");
        assert_eq!(v["event"]["kind"], "game_command");
        assert_eq!(v["event"]["action"]["type"], "add_foul");
        assert_eq!(v["event"]["action"]["team"], 1);
    }
}
