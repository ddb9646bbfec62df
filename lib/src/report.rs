//! Result reporter — builds `GameResult`s, the human-readable summary and
//! the host payload.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::host::{DeliveryError, Haptic, HostBridge};
use crate::{GameResult, GameState, Team, Winner, format_clock};

/// Compact payload team names are clipped to this many characters.
pub const COMPACT_NAME_CHARS: usize = 32;

/// Build a result from a snapshot. `game_time` counts whole seconds since
/// the first main-clock start (0 if it never started).
pub fn build_result(state: &GameState, now: DateTime<Utc>) -> GameResult {
    let game_time = state
        .game_started_at
        .map(|started| (now - started).num_seconds().max(0) as u64)
        .unwrap_or(0);
    GameResult {
        score1: state.score1,
        score2: state.score2,
        fouls1: state.fouls1,
        fouls2: state.fouls2,
        team1_name: state.team1_name.clone(),
        team2_name: state.team2_name.clone(),
        winner: Winner::from_scores(state.score1, state.score2),
        game_time,
        total_points: state.score1.saturating_add(state.score2),
        timestamp: now,
    }
}

fn allowed_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | ' ' | '-' | '.')
        || ('\u{0410}'..='\u{044F}').contains(&c)
}

/// Strip everything but ASCII word characters, Cyrillic А–я, space, hyphen
/// and period, then trim. Falls back to `fallback` when nothing is left.
pub fn sanitize_team_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name.chars().filter(|&c| allowed_name_char(c)).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn result_name(result: &GameResult, team: Team) -> String {
    let raw = match team {
        Team::One => &result.team1_name,
        Team::Two => &result.team2_name,
    };
    sanitize_team_name(raw, team.default_name())
}

/// Multi-line summary for the host chat.
pub fn format_summary(result: &GameResult) -> String {
    let name1 = result_name(result, Team::One);
    let name2 = result_name(result, Team::Two);
    let winner_line = match result.winner {
        Winner::Team(Team::One) => format!("Winner: {name1}"),
        Winner::Team(Team::Two) => format!("Winner: {name2}"),
        Winner::Draw => "Draw".to_string(),
    };
    format!(
        "🏀 {name1} {}:{} {name2}\n🏆 {winner_line}\n⏱ Time: {}\n📊 Total points: {}\n🔴 Fouls: {} - {}",
        result.score1,
        result.score2,
        format_clock(result.game_time),
        result.total_points,
        result.fouls1,
        result.fouls2,
    )
}

// ---------------------------------------------------------------------------
// Host payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FullPayload<'a> {
    score1: u32,
    score2: u32,
    fouls1: u32,
    fouls2: u32,
    team1_name: &'a str,
    team2_name: &'a str,
    winner: Winner,
    game_time: u64,
    total_points: u32,
    timestamp: i64,
}

#[derive(Serialize)]
struct CompactPayload<'a> {
    s: [u32; 2],
    f: [u32; 2],
    t: [&'a str; 2],
    w: Winner,
    time: u64,
}

/// Which payload layout was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Full,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub kind: PayloadKind,
    pub data: String,
}

fn clip(name: &str) -> &str {
    match name.char_indices().nth(COMPACT_NAME_CHARS) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Encodes results for the host and delivers them.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    max_payload_bytes: usize,
}

impl Reporter {
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    /// Full camelCase payload, or the compact `s/f/t/w/time` layout when the
    /// full one is over the size bound. A bound below the compact size is
    /// an error.
    pub fn encode(&self, result: &GameResult) -> Result<Payload, DeliveryError> {
        let name1 = result_name(result, Team::One);
        let name2 = result_name(result, Team::Two);
        let full = serde_json::to_string(&FullPayload {
            score1: result.score1,
            score2: result.score2,
            fouls1: result.fouls1,
            fouls2: result.fouls2,
            team1_name: &name1,
            team2_name: &name2,
            winner: result.winner,
            game_time: result.game_time,
            total_points: result.total_points,
            timestamp: result.timestamp.timestamp_millis(),
        })?;
        if full.len() <= self.max_payload_bytes {
            return Ok(Payload {
                kind: PayloadKind::Full,
                data: full,
            });
        }
        let compact = serde_json::to_string(&CompactPayload {
            s: [result.score1, result.score2],
            f: [result.fouls1, result.fouls2],
            t: [clip(&name1), clip(&name2)],
            w: result.winner,
            time: result.game_time,
        })?;
        if compact.len() > self.max_payload_bytes {
            return Err(DeliveryError::TooLarge {
                size: compact.len(),
                limit: self.max_payload_bytes,
            });
        }
        Ok(Payload {
            kind: PayloadKind::Compact,
            data: compact,
        })
    }

    /// Send the result to the host. On success the host gets a success
    /// haptic and a confirmation; on failure the summary is shown instead
    /// and the error is returned for logging.
    pub fn deliver(
        &self,
        result: &GameResult,
        host: &dyn HostBridge,
    ) -> Result<PayloadKind, DeliveryError> {
        let outcome = self
            .encode(result)
            .and_then(|payload| host.send_data(&payload.data).map(|()| payload.kind));
        match &outcome {
            Ok(_) => {
                host.haptic(Haptic::Success);
                host.show_alert("Game result sent to chat!");
            }
            Err(_) => {
                host.haptic(Haptic::Error);
                host.show_alert(&format!(
                    "Game result:\n{}\n\nSending error occurred.",
                    format_summary(result)
                ));
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    fn result(name1: &str, name2: &str) -> GameResult {
        GameResult {
            score1: 21,
            score2: 17,
            fouls1: 3,
            fouls2: 5,
            team1_name: name1.into(),
            team2_name: name2.into(),
            winner: Winner::Team(Team::One),
            game_time: 425,
            total_points: 38,
            timestamp: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        fail: bool,
        sent: Mutex<Vec<String>>,
        alerts: Mutex<Vec<String>>,
        haptics: Mutex<Vec<Haptic>>,
    }

    impl HostBridge for RecordingHost {
        fn send_data(&self, data: &str) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::NotDelivered("offline".into()));
            }
            self.sent.lock().unwrap().push(data.to_string());
            Ok(())
        }

        fn haptic(&self, kind: Haptic) {
            self.haptics.lock().unwrap().push(kind);
        }

        fn show_alert(&self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn sanitize_strips_markup_and_control_chars() {
        assert_eq!(
            sanitize_team_name("<b>Reds</b>\n\u{0007}", "Team 1"),
            "bRedsb"
        );
        assert_eq!(sanitize_team_name("Dream-Team v.2_x", "Team 1"), "Dream-Team v.2_x");
        assert_eq!(sanitize_team_name("Динамо 🏀", "Team 1"), "Динамо");
        assert_eq!(sanitize_team_name("<<>>", "Team 2"), "Team 2");
        assert_eq!(sanitize_team_name("\t\r\n", "Team 1"), "Team 1");
    }

    #[test]
    fn summary_uses_sanitized_names() {
        let text = format_summary(&result("Reds<script>", "Blues\u{202e}"));
        assert_eq!(
            text,
            "🏀 Redsscript 21:17 Blues\n🏆 Winner: Redsscript\n⏱ Time: 07:05\n📊 Total points: 38\n🔴 Fouls: 3 - 5"
        );
    }

    #[test]
    fn summary_reports_draw() {
        let mut r = result("A", "B");
        r.score2 = 21;
        r.winner = Winner::Draw;
        assert!(format_summary(&r).contains("🏆 Draw\n"));
    }

    #[test]
    fn result_game_time_floors_elapsed_seconds() {
        let started = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let state = GameState {
            score1: 4,
            score2: 9,
            fouls1: 1,
            fouls2: 0,
            team1_name: "Reds".into(),
            team2_name: "Blues".into(),
            main_clock: 500,
            shot_clock: 7.5,
            main_clock_running: true,
            shot_clock_running: true,
            game_started_at: Some(started),
            phase: crate::GamePhase::InProgress,
            winner: None,
            main_clock_display: "08:20".into(),
            shot_clock_display: "7.5".into(),
        };
        let now = started + chrono::Duration::milliseconds(90_999);
        let r = build_result(&state, now);
        assert_eq!(r.game_time, 90);
        assert_eq!(r.winner, Winner::Team(Team::Two));
        assert_eq!(r.total_points, 13);

        let never = GameState {
            game_started_at: None,
            ..state
        };
        assert_eq!(build_result(&never, now).game_time, 0);
    }

    #[test]
    fn full_payload_uses_host_keys() {
        let payload = Reporter::new(4096).encode(&result("Reds", "Blues")).unwrap();
        assert_eq!(payload.kind, PayloadKind::Full);
        let v: serde_json::Value = serde_json::from_str(&payload.data).unwrap();
        assert_eq!(v["team1Name"], "Reds");
        assert_eq!(v["gameTime"], 425);
        assert_eq!(v["totalPoints"], 38);
        assert_eq!(v["winner"], 1);
    }

    #[test]
    fn oversize_payload_falls_back_to_compact() {
        let long = "X".repeat(200);
        let payload = Reporter::new(128).encode(&result(&long, "Blues")).unwrap();
        assert_eq!(payload.kind, PayloadKind::Compact);
        let v: serde_json::Value = serde_json::from_str(&payload.data).unwrap();
        assert_eq!(v["s"], serde_json::json!([21, 17]));
        assert_eq!(v["f"], serde_json::json!([3, 5]));
        assert_eq!(v["w"], 1);
        assert_eq!(v["time"], 425);
        assert_eq!(v["t"][0].as_str().unwrap().len(), COMPACT_NAME_CHARS);
        assert_eq!(v["t"][1], "Blues");
    }

    #[test]
    fn payload_over_compact_size_is_rejected() {
        let err = Reporter::new(40).encode(&result("Reds", "Blues")).unwrap_err();
        match err {
            DeliveryError::TooLarge { size, limit } => {
                assert_eq!(limit, 40);
                assert!(size > 40);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn deliver_reports_oversize_without_sending() {
        let host = RecordingHost::default();
        let err = Reporter::new(16)
            .deliver(&result("Reds", "Blues"), &host)
            .unwrap_err();
        assert!(matches!(err, DeliveryError::TooLarge { .. }));
        assert!(host.sent.lock().unwrap().is_empty());
        assert_eq!(*host.haptics.lock().unwrap(), vec![Haptic::Error]);
    }

    #[test]
    fn deliver_confirms_on_success() {
        let host = RecordingHost::default();
        let kind = Reporter::new(4096).deliver(&result("Reds", "Blues"), &host).unwrap();
        assert_eq!(kind, PayloadKind::Full);
        assert_eq!(host.sent.lock().unwrap().len(), 1);
        assert_eq!(*host.haptics.lock().unwrap(), vec![Haptic::Success]);
        assert_eq!(
            host.alerts.lock().unwrap().as_slice(),
            ["Game result sent to chat!"]
        );
    }

    #[test]
    fn deliver_failure_shows_summary() {
        let host = RecordingHost {
            fail: true,
            ..Default::default()
        };
        let err = Reporter::new(4096)
            .deliver(&result("Reds", "Blues"), &host)
            .unwrap_err();
        assert!(matches!(err, DeliveryError::NotDelivered(_)));
        let alerts = host.alerts.lock().unwrap();
        assert!(alerts[0].contains("Reds 21:17 Blues"));
        assert!(alerts[0].ends_with("Sending error occurred."));
    }

    #[test]
    fn null_host_is_unavailable() {
        let err = Reporter::new(4096)
            .deliver(&result("Reds", "Blues"), &crate::NullHost)
            .unwrap_err();
        assert!(matches!(err, DeliveryError::HostUnavailable));
    }
}
