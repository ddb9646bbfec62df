use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::SHOT_CLOCK_RESET_TENTHS;
use crate::rules::DEFAULT_TARGET_SCORE;

/// What happens when the game clock reaches zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum TimeExpiryPolicy {
    /// Time zero always finishes the game; a tie is a draw.
    #[default]
    AlwaysFinish,
    /// Finish only if one team leads; a tie leaves the game paused.
    FinishOnLead,
}

impl fmt::Display for TimeExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlwaysFinish => write!(f, "always_finish"),
            Self::FinishOnLead => write!(f, "finish_on_lead"),
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted config types
// ---------------------------------------------------------------------------

/// Top-level persisted config. Hand-editable TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoopConfig {
    #[serde(default)]
    pub game: GameSection,
    #[serde(default)]
    pub host: HostSection,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub webserver: HashMap<String, WebserverSection>,
}

/// Rules and clocks for a game session. Read at startup and on every
/// reset / new game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSection {
    /// Game clock length in whole seconds.
    pub duration_secs: u32,
    /// Shot clock reset value in whole seconds, clamped to 1..=12.
    pub shot_clock_secs: u16,
    pub target_score: u32,
    pub time_expiry: TimeExpiryPolicy,
    /// Reject score/foul/clock actions once the game is finished.
    pub lock_after_finish: bool,
    /// Audio and haptic cues (beep, buzzer).
    pub cues: bool,
    /// Deliver the result to the host as soon as the game finishes.
    pub auto_send: bool,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            duration_secs: 600,
            shot_clock_secs: SHOT_CLOCK_RESET_TENTHS / 10,
            target_score: DEFAULT_TARGET_SCORE,
            time_expiry: TimeExpiryPolicy::default(),
            lock_after_finish: true,
            cues: true,
            auto_send: false,
        }
    }
}

/// Host application bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSection {
    /// When false, a null host is used: deliveries fail softly and haptics
    /// are dropped.
    pub enabled: bool,
    /// Largest result payload the host accepts, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_payload_bytes: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebserverSection {
    #[serde(default)]
    pub name: String,
    pub bind: String,
}

impl Default for HoopConfig {
    fn default() -> Self {
        let mut webserver = HashMap::new();
        webserver.insert(
            "0".into(),
            WebserverSection {
                name: "Web Server".into(),
                bind: "127.0.0.1:3030".into(),
            },
        );
        Self {
            game: GameSection::default(),
            host: HostSection::default(),
            webserver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sections_fill_defaults() {
        let json = r#"{ "game": { "duration_secs": 300, "time_expiry": "finish_on_lead" } }"#;
        let config: HoopConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.game.duration_secs, 300);
        assert_eq!(config.game.time_expiry, TimeExpiryPolicy::FinishOnLead);
        assert_eq!(config.game.shot_clock_secs, 12);
        assert_eq!(config.game.target_score, 21);
        assert!(config.host.enabled);
        assert!(config.webserver.is_empty());
    }
}
