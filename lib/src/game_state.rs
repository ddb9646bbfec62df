//! Scoreboard state types — teams, winner, phase, and the published snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEAM1_NAME: &str = "Team 1";
pub const DEFAULT_TEAM2_NAME: &str = "Team 2";

/// One of the two teams on the court.
///
/// Serializes as the integer `1` or `2`, matching the host payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Team {
    One,
    Two,
}

impl Team {
    pub fn default_name(self) -> &'static str {
        match self {
            Team::One => DEFAULT_TEAM1_NAME,
            Team::Two => DEFAULT_TEAM2_NAME,
        }
    }
}

impl TryFrom<u8> for Team {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Team::One),
            2 => Ok(Team::Two),
            n => Err(format!("invalid team {n}: expected 1 or 2")),
        }
    }
}

impl From<Team> for u8 {
    fn from(team: Team) -> Self {
        match team {
            Team::One => 1,
            Team::Two => 2,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", u8::from(*self))
    }
}

/// Game outcome marker. Wire form: `0` = draw, `1` = team 1, `2` = team 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Winner {
    Draw,
    Team(Team),
}

impl Winner {
    /// Simple greater-than comparison; no margin rule.
    pub fn from_scores(score1: u32, score2: u32) -> Self {
        match score1.cmp(&score2) {
            std::cmp::Ordering::Greater => Winner::Team(Team::One),
            std::cmp::Ordering::Less => Winner::Team(Team::Two),
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

impl TryFrom<u8> for Winner {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Winner::Draw),
            n => Team::try_from(n).map(Winner::Team),
        }
    }
}

impl From<Winner> for u8 {
    fn from(winner: Winner) -> Self {
        match winner {
            Winner::Draw => 0,
            Winner::Team(team) => team.into(),
        }
    }
}

/// Lifecycle phase of one game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    NotStarted,
    InProgress,
    Finished,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::InProgress => write!(f, "in progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Immutable snapshot of the scoreboard, as read by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub score1: u32,
    pub score2: u32,
    pub fouls1: u32,
    pub fouls2: u32,
    pub team1_name: String,
    pub team2_name: String,
    /// Whole seconds left on the game clock.
    pub main_clock: u32,
    /// Seconds left on the shot clock, one decimal place.
    pub shot_clock: f64,
    pub main_clock_running: bool,
    pub shot_clock_running: bool,
    #[serde(default)]
    pub game_started_at: Option<DateTime<Utc>>,
    pub phase: GamePhase,
    #[serde(default)]
    pub winner: Option<Winner>,
    pub main_clock_display: String,
    pub shot_clock_display: String,
}

/// Final (or exported) result of a game. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub score1: u32,
    pub score2: u32,
    pub fouls1: u32,
    pub fouls2: u32,
    pub team1_name: String,
    pub team2_name: String,
    pub winner: Winner,
    /// Elapsed wall-clock seconds since the first main-clock start.
    pub game_time: u64,
    pub total_points: u32,
    pub timestamp: DateTime<Utc>,
}

/// Format whole seconds as `MM:SS`.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format shot-clock tenths as a one-decimal string (`125` → `"12.5"`).
pub fn format_shot_clock(tenths: u16) -> String {
    format!("{}.{}", tenths / 10, tenths % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats_with_padding() {
        assert_eq!(format_clock(600), "10:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(6001), "100:01");
    }

    #[test]
    fn shot_clock_formats_one_decimal() {
        assert_eq!(format_shot_clock(120), "12.0");
        assert_eq!(format_shot_clock(49), "4.9");
        assert_eq!(format_shot_clock(0), "0.0");
    }

    #[test]
    fn winner_uses_plain_comparison() {
        assert_eq!(Winner::from_scores(21, 20), Winner::Team(Team::One));
        assert_eq!(Winner::from_scores(3, 9), Winner::Team(Team::Two));
        assert_eq!(Winner::from_scores(10, 10), Winner::Draw);
    }

    #[test]
    fn team_and_winner_serialize_as_integers() {
        assert_eq!(serde_json::to_string(&Team::Two).unwrap(), "2");
        assert_eq!(serde_json::to_string(&Winner::Draw).unwrap(), "0");
        assert_eq!(
            serde_json::from_str::<Winner>("1").unwrap(),
            Winner::Team(Team::One)
        );
        assert!(serde_json::from_str::<Team>("3").is_err());
    }
}
