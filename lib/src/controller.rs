//! Game controller — the one place that mutates a game session.
//!
//! Composes the clock engine, the ledger and the win rule, and turns clock
//! signals into cues and finishes. Every action returns a `Step`; actions
//! that make no sense in the current state are `Ignored` rather than errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{ClockEngine, ClockKind, SHOT_CLOCK_RESET_TENTHS, TickOutcome};
use crate::host::NotificationSink;
use crate::ledger::Ledger;
use crate::report::build_result;
use crate::rules::WinRule;
use crate::{
    GamePhase, GameResult, GameSection, GameState, Team, TimeExpiryPolicy, Winner, format_clock,
    format_shot_clock,
};

/// Result of a controller action or tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing changed.
    Ignored,
    /// State changed; the game goes on.
    Applied,
    /// This action finished the game.
    Finished(Box<GameResult>),
    /// A correction to an already finished game; carries the rebuilt result.
    Amended(Box<GameResult>),
}

impl Step {
    pub fn changed(&self) -> bool {
        !matches!(self, Step::Ignored)
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Score,
    TimeExpired,
    Forced,
}

/// Per-session settings, derived from the `[game]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    pub duration_secs: u32,
    /// Shot clock reset value in tenths.
    pub shot_reset: u16,
    pub rule: WinRule,
    pub time_expiry: TimeExpiryPolicy,
    pub lock_after_finish: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::from(&GameSection::default())
    }
}

/// Longest shot clock a session can be configured with, in seconds.
pub const MAX_SHOT_CLOCK_SECS: u16 = SHOT_CLOCK_RESET_TENTHS / 10;

impl From<&GameSection> for GameSettings {
    /// Out-of-range shot clock values are clamped to `1..=12` seconds.
    fn from(section: &GameSection) -> Self {
        Self {
            duration_secs: section.duration_secs,
            shot_reset: section.shot_clock_secs.clamp(1, MAX_SHOT_CLOCK_SECS) * 10,
            rule: WinRule::new(section.target_score),
            time_expiry: section.time_expiry,
            lock_after_finish: section.lock_after_finish,
        }
    }
}

/// How and when the session ended. The winner follows later corrections.
#[derive(Debug, Clone, Copy)]
struct Finish {
    winner: Winner,
    reason: FinishReason,
    at: DateTime<Utc>,
}

pub struct GameController {
    settings: GameSettings,
    pending: Option<GameSettings>,
    clock: ClockEngine,
    ledger: Ledger,
    team1_name: String,
    team2_name: String,
    finished: Option<Finish>,
    cues_enabled: bool,
    sink: Box<dyn NotificationSink>,
}

impl GameController {
    pub fn new(settings: GameSettings, sink: Box<dyn NotificationSink>) -> Self {
        Self {
            settings,
            pending: None,
            clock: ClockEngine::new(settings.duration_secs, settings.shot_reset),
            ledger: Ledger::new(),
            team1_name: Team::One.default_name().into(),
            team2_name: Team::Two.default_name().into(),
            finished: None,
            cues_enabled: true,
            sink,
        }
    }

    // ----- Read side -----

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn clock(&self) -> &ClockEngine {
        &self.clock
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finished.map(|finish| finish.reason)
    }

    pub fn phase(&self) -> GamePhase {
        if self.finished.is_some() {
            GamePhase::Finished
        } else if self.clock.started_at().is_some() {
            GamePhase::InProgress
        } else {
            GamePhase::NotStarted
        }
    }

    pub fn snapshot(&self) -> GameState {
        GameState {
            score1: self.ledger.score(Team::One),
            score2: self.ledger.score(Team::Two),
            fouls1: self.ledger.fouls(Team::One),
            fouls2: self.ledger.fouls(Team::Two),
            team1_name: self.team1_name.clone(),
            team2_name: self.team2_name.clone(),
            main_clock: self.clock.main_remaining(),
            shot_clock: self.clock.shot_seconds(),
            main_clock_running: self.clock.is_main_running(),
            shot_clock_running: self.clock.is_shot_running(),
            game_started_at: self.clock.started_at(),
            phase: self.phase(),
            winner: self.finished.map(|finish| finish.winner),
            main_clock_display: format_clock(u64::from(self.clock.main_remaining())),
            shot_clock_display: format_shot_clock(self.clock.shot_tenths()),
        }
    }

    /// On-demand result export of the current state.
    pub fn result(&self, now: DateTime<Utc>) -> GameResult {
        build_result(&self.snapshot(), now)
    }

    /// Result of the finished session, stamped at the finish and reflecting
    /// any correction made since.
    pub fn final_result(&self) -> Option<GameResult> {
        self.finished.map(|finish| self.result(finish.at))
    }

    // ----- Settings and cues -----

    /// Stage new settings. They take effect at the next reset.
    pub fn reconfigure(&mut self, settings: GameSettings) {
        self.pending = (settings != self.settings).then_some(settings);
    }

    pub fn set_cues_enabled(&mut self, enabled: bool) {
        self.cues_enabled = enabled;
    }

    fn locked(&self) -> bool {
        self.finished.is_some() && self.settings.lock_after_finish
    }

    // ----- Scores and fouls -----

    pub fn add_score(&mut self, team: Team, points: u32) -> Step {
        if self.locked() || points == 0 {
            return Step::Ignored;
        }
        self.ledger.add_score(team, points);
        // A made basket restarts the shot clock from full.
        if self.clock.is_main_running() {
            self.clock.start_shot();
        }
        self.evaluate()
    }

    pub fn remove_score(&mut self, team: Team) -> Step {
        if self.locked() || !self.ledger.remove_score(team) {
            return Step::Ignored;
        }
        self.evaluate()
    }

    pub fn add_foul(&mut self, team: Team) -> Step {
        if self.locked() {
            return Step::Ignored;
        }
        self.ledger.add_foul(team);
        self.amend()
    }

    pub fn remove_foul(&mut self, team: Team) -> Step {
        if self.locked() || !self.ledger.remove_foul(team) {
            return Step::Ignored;
        }
        self.amend()
    }

    fn evaluate(&mut self) -> Step {
        let (score1, score2) = self.ledger.scores();
        if self.finished.is_none() && self.settings.rule.is_decided(score1, score2) {
            return self.finish_with(FinishReason::Score);
        }
        self.amend()
    }

    /// `Applied` during play. After an unlocked finish, re-derive the winner
    /// from the corrected scores and hand back the rebuilt result.
    fn amend(&mut self) -> Step {
        let (score1, score2) = self.ledger.scores();
        let Some(finish) = self.finished.as_mut() else {
            return Step::Applied;
        };
        finish.winner = Winner::from_scores(score1, score2);
        let at = finish.at;
        Step::Amended(Box::new(self.result(at)))
    }

    // ----- Clocks -----

    pub fn toggle_main_clock(&mut self) -> Step {
        if self.finished.is_some() {
            return Step::Ignored;
        }
        if self.clock.is_main_running() {
            self.clock.pause_main();
            return Step::Applied;
        }
        if !self.clock.start_main(Utc::now()) {
            return Step::Ignored;
        }
        if !self.clock.is_shot_running() {
            if self.clock.shot_tenths() == 0 {
                self.clock.start_shot();
            } else {
                self.clock.resume_shot();
            }
        }
        Step::Applied
    }

    pub fn toggle_shot_clock(&mut self) -> Step {
        if self.finished.is_some() {
            return Step::Ignored;
        }
        if self.clock.is_main_running() {
            self.clock.start_shot();
        } else {
            self.clock.reset_shot_idle();
        }
        Step::Applied
    }

    /// Feed one periodic tick for `kind`, scheduled under `generation`.
    pub fn tick(&mut self, kind: ClockKind, generation: u64) -> Step {
        match self.clock.tick(kind, generation) {
            TickOutcome::Stale => Step::Ignored,
            TickOutcome::Advanced => Step::Applied,
            TickOutcome::LowTime(seconds) => {
                if self.cues_enabled {
                    self.sink.notify_low_time(seconds);
                }
                Step::Applied
            }
            TickOutcome::ShotExpired => {
                self.clock.pause_main();
                Step::Applied
            }
            TickOutcome::TimeExpired => {
                let (score1, score2) = self.ledger.scores();
                match self.settings.time_expiry {
                    TimeExpiryPolicy::FinishOnLead if score1 == score2 => Step::Applied,
                    _ => self.finish_with(FinishReason::TimeExpired),
                }
            }
        }
    }

    // ----- Session lifecycle -----

    /// Host-requested finish (e.g. the user leaves the game).
    pub fn finish(&mut self) -> Step {
        if self.finished.is_some() {
            return Step::Ignored;
        }
        self.finish_with(FinishReason::Forced)
    }

    fn finish_with(&mut self, reason: FinishReason) -> Step {
        self.clock.pause_main();
        let (score1, score2) = self.ledger.scores();
        let at = Utc::now();
        self.finished = Some(Finish {
            winner: Winner::from_scores(score1, score2),
            reason,
            at,
        });
        if self.cues_enabled {
            self.sink.notify_buzzer();
        }
        Step::Finished(Box::new(self.result(at)))
    }

    /// Fresh session with default team names.
    pub fn reset(&mut self) -> Step {
        if let Some(settings) = self.pending.take() {
            self.settings = settings;
        }
        self.clock = ClockEngine::new(self.settings.duration_secs, self.settings.shot_reset);
        self.ledger = Ledger::new();
        self.team1_name = Team::One.default_name().into();
        self.team2_name = Team::Two.default_name().into();
        self.finished = None;
        Step::Applied
    }

    /// Fresh session with the given names; blank names fall back to the
    /// defaults.
    pub fn start_new_game(&mut self, team1_name: &str, team2_name: &str) -> Step {
        self.reset();
        self.team1_name = name_or_default(team1_name, Team::One);
        self.team2_name = name_or_default(team2_name, Team::Two);
        Step::Applied
    }

    /// Fresh session keeping the current team names.
    pub fn rematch(&mut self) -> Step {
        let names = (self.team1_name.clone(), self.team2_name.clone());
        self.reset();
        (self.team1_name, self.team2_name) = names;
        Step::Applied
    }
}

fn name_or_default(name: &str, team: Team) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        team.default_name().to_string()
    } else {
        trimmed.to_string()
    }
}
