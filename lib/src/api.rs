//! REST API request/response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ActorStatus, GamePhase, GameState};

/// GET /api/status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub actors: HashMap<String, ActorStatusResponse>,
    pub phase: GamePhase,
    /// Connected WebSocket clients that can take result payloads.
    #[serde(default)]
    pub host_clients: usize,
}

/// Per-actor status within the status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorStatusResponse {
    #[serde(default)]
    pub name: String,
    pub status: ActorStatus,
    #[serde(default)]
    pub telemetry: HashMap<String, String>,
}

/// POST /api/game/action response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub applied: bool,
    #[serde(default)]
    pub finished: bool,
    pub state: GameState,
}

/// POST /api/settings response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSettingsResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restarted: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stopped: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub started: Vec<String>,
}
