//! Event payloads shared by the bus and the WebSocket stream.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{FinishReason, GameResult, Haptic, Team};

// ---------------------------------------------------------------------------
// Host actions
// ---------------------------------------------------------------------------

fn one_point() -> u32 {
    1
}

/// Everything a host (REST client, WS client) can ask the scoreboard to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameAction {
    AddScore {
        team: Team,
        #[serde(default = "one_point")]
        points: u32,
    },
    RemoveScore {
        team: Team,
    },
    AddFoul {
        team: Team,
    },
    RemoveFoul {
        team: Team,
    },
    ToggleMainClock,
    ToggleShotClock,
    Reset,
    StartNewGame {
        #[serde(default)]
        team1_name: String,
        #[serde(default)]
        team2_name: String,
    },
    /// New game, same team names.
    Rematch,
    /// Force-finish (e.g. the user closes the app).
    Finish,
    /// Deliver the current result to the host.
    SendResult,
    SetCues {
        enabled: bool,
    },
}

// ---------------------------------------------------------------------------
// Cues
// ---------------------------------------------------------------------------

/// Audio cue for the presentation layer. Haptics go through the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cue {
    /// Short beep: the shot clock crossed into `seconds`.
    LowTime { seconds: u8 },
    /// End-of-game buzzer.
    Buzzer,
}

/// Request forwarded to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRequest {
    SendData { data: String },
    Haptic { kind: Haptic },
    ShowAlert { message: String },
}

/// Emitted on finish, and again whenever a finished game is corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameFinished {
    pub reason: FinishReason,
    pub result: GameResult,
    pub summary: String,
}

// ---------------------------------------------------------------------------
// ActorStatus — generic actor lifecycle
// ---------------------------------------------------------------------------

/// Generic actor lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Disconnected,
    Connected,
}

impl std::fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Actor state emitted on the bus: lifecycle status plus key/value
/// telemetry (bind address, connected clients, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    pub status: ActorStatus,
    #[serde(default)]
    pub telemetry: HashMap<String, String>,
}

impl ActorState {
    pub fn new(status: ActorStatus, telemetry: HashMap<String, String>) -> Self {
        Self { status, telemetry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_from_host_json() {
        let a: GameAction = serde_json::from_str(r#"{"type":"add_score","team":2}"#).unwrap();
        assert_eq!(
            a,
            GameAction::AddScore {
                team: Team::Two,
                points: 1
            }
        );
        let a: GameAction =
            serde_json::from_str(r#"{"type":"start_new_game","team1_name":"Reds"}"#).unwrap();
        assert_eq!(
            a,
            GameAction::StartNewGame {
                team1_name: "Reds".into(),
                team2_name: String::new()
            }
        );
        assert!(serde_json::from_str::<GameAction>(r#"{"type":"add_foul","team":0}"#).is_err());
    }
}
