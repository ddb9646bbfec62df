//! Clock engine — the game clock and the shot clock.
//!
//! The engine does not own any timers. A runtime asks for the current
//! generation of each running clock (`main_generation()` / `shot_generation()`),
//! schedules a periodic tick for it, and feeds every tick back with the
//! generation it was scheduled for. Starting a clock bumps its generation and
//! stopping it bumps it again, so a tick from a cancelled ticker is `Stale`
//! and never touches state.
//!
//! The shot clock is kept in integer tenths of a second. One tick removes
//! exactly one tenth, so the value is always exact to one decimal place.

use std::time::Duration;

use chrono::{DateTime, Utc};

pub const MAIN_TICK: Duration = Duration::from_millis(1000);
pub const SHOT_TICK: Duration = Duration::from_millis(100);

/// Default shot-clock reset value, in tenths (12.0 s).
pub const SHOT_CLOCK_RESET_TENTHS: u16 = 120;

/// Integer-second boundaries at or below this fire a low-time signal.
pub const LOW_TIME_SECONDS: u16 = 4;

/// Which of the two clocks a tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockKind {
    Main,
    Shot,
}

impl ClockKind {
    pub fn period(self) -> Duration {
        match self {
            ClockKind::Main => MAIN_TICK,
            ClockKind::Shot => SHOT_TICK,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belongs to a cancelled ticker; nothing changed.
    Stale,
    /// The clock moved down one step.
    Advanced,
    /// The shot clock crossed into the given integer second (4..=0).
    LowTime(u8),
    /// The shot clock hit 0.0 and stopped itself.
    ShotExpired,
    /// The game clock hit 0 and stopped both clocks.
    TimeExpired,
}

/// Running flag plus generation counter for one periodic ticker.
#[derive(Debug, Clone, Copy, Default)]
struct Ticker {
    generation: u64,
    running: bool,
}

impl Ticker {
    fn start(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.running = true;
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.generation = self.generation.wrapping_add(1);
        }
    }

    fn current(&self) -> Option<u64> {
        self.running.then_some(self.generation)
    }

    fn accepts(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }
}

#[derive(Debug, Clone)]
pub struct ClockEngine {
    main_remaining: u32,
    shot_reset: u16,
    shot_remaining: u16,
    main: Ticker,
    shot: Ticker,
    started_at: Option<DateTime<Utc>>,
}

impl ClockEngine {
    /// `duration_secs` for the game clock, `shot_reset` in tenths.
    pub fn new(duration_secs: u32, shot_reset: u16) -> Self {
        Self {
            main_remaining: duration_secs,
            shot_reset,
            shot_remaining: shot_reset,
            main: Ticker::default(),
            shot: Ticker::default(),
            started_at: None,
        }
    }

    // ----- Accessors -----

    pub fn main_remaining(&self) -> u32 {
        self.main_remaining
    }

    pub fn shot_tenths(&self) -> u16 {
        self.shot_remaining
    }

    pub fn shot_seconds(&self) -> f64 {
        f64::from(self.shot_remaining) / 10.0
    }

    pub fn is_main_running(&self) -> bool {
        self.main.running
    }

    pub fn is_shot_running(&self) -> bool {
        self.shot.running
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Generation the main ticker should be scheduled with, if running.
    pub fn main_generation(&self) -> Option<u64> {
        self.main.current()
    }

    /// Generation the shot ticker should be scheduled with, if running.
    pub fn shot_generation(&self) -> Option<u64> {
        self.shot.current()
    }

    // ----- Main clock -----

    /// Start the game clock. Returns `false` if it was already running or
    /// has no time left. Stamps `started_at` on the first successful start.
    pub fn start_main(&mut self, now: DateTime<Utc>) -> bool {
        if self.main.running || self.main_remaining == 0 {
            return false;
        }
        self.started_at.get_or_insert(now);
        self.main.start();
        true
    }

    /// Stop the game clock. The shot clock can't run without it, so it
    /// stops too.
    pub fn pause_main(&mut self) {
        self.main.stop();
        self.shot.stop();
    }

    pub fn tick_main(&mut self, generation: u64) -> TickOutcome {
        if !self.main.accepts(generation) {
            return TickOutcome::Stale;
        }
        self.main_remaining = self.main_remaining.saturating_sub(1);
        if self.main_remaining == 0 {
            self.pause_main();
            return TickOutcome::TimeExpired;
        }
        TickOutcome::Advanced
    }

    // ----- Shot clock -----

    /// Reset the shot clock to its full value and (re)start its ticker.
    /// No-op unless the game clock runs.
    pub fn start_shot(&mut self) -> bool {
        if !self.main.running {
            return false;
        }
        self.shot_remaining = self.shot_reset;
        self.shot.start();
        true
    }

    /// Continue the shot clock from its current value. No-op unless the game
    /// clock runs, the shot clock is stopped and has time left.
    pub fn resume_shot(&mut self) -> bool {
        if !self.main.running || self.shot.running || self.shot_remaining == 0 {
            return false;
        }
        self.shot.start();
        true
    }

    pub fn pause_shot(&mut self) {
        self.shot.stop();
    }

    /// Stop the shot clock and put it back to its full value without
    /// starting a ticker.
    pub fn reset_shot_idle(&mut self) {
        self.shot.stop();
        self.shot_remaining = self.shot_reset;
    }

    pub fn tick_shot(&mut self, generation: u64) -> TickOutcome {
        if !self.shot.accepts(generation) {
            return TickOutcome::Stale;
        }
        let previous = self.shot_remaining;
        self.shot_remaining = previous.saturating_sub(1);
        if self.shot_remaining == 0 {
            self.shot.stop();
            return TickOutcome::ShotExpired;
        }
        let (prev_floor, new_floor) = (previous / 10, self.shot_remaining / 10);
        if new_floor < prev_floor && new_floor <= LOW_TIME_SECONDS {
            return TickOutcome::LowTime(new_floor as u8);
        }
        TickOutcome::Advanced
    }

    pub fn tick(&mut self, kind: ClockKind, generation: u64) -> TickOutcome {
        match kind {
            ClockKind::Main => self.tick_main(generation),
            ClockKind::Shot => self.tick_shot(generation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_engine() -> ClockEngine {
        let mut engine = ClockEngine::new(600, SHOT_CLOCK_RESET_TENTHS);
        assert!(engine.start_main(Utc::now()));
        engine
    }

    /// Tick the shot clock `n` times with its current generation.
    fn shot_ticks(engine: &mut ClockEngine, n: usize) -> Vec<TickOutcome> {
        (0..n)
            .map(|_| {
                let generation = engine.shot_generation().expect("shot clock running");
                engine.tick_shot(generation)
            })
            .collect()
    }

    #[test]
    fn main_start_stamps_once() {
        let mut engine = ClockEngine::new(600, SHOT_CLOCK_RESET_TENTHS);
        let first = Utc::now();
        engine.start_main(first);
        engine.pause_main();
        engine.start_main(first + chrono::Duration::seconds(30));
        assert_eq!(engine.started_at(), Some(first));
    }

    #[test]
    fn starting_a_running_clock_keeps_its_generation() {
        let mut engine = running_engine();
        let generation = engine.main_generation();
        assert!(!engine.start_main(Utc::now()));
        assert_eq!(engine.main_generation(), generation);

        engine.start_shot();
        let shot_generation = engine.shot_generation();
        assert!(!engine.resume_shot());
        assert_eq!(engine.shot_generation(), shot_generation);
    }

    #[test]
    fn stale_ticks_do_not_mutate() {
        let mut engine = running_engine();
        let old = engine.main_generation().unwrap();
        engine.pause_main();
        assert_eq!(engine.tick_main(old), TickOutcome::Stale);
        engine.start_main(Utc::now());
        assert_eq!(engine.tick_main(old), TickOutcome::Stale);
        assert_eq!(engine.main_remaining(), 600);

        engine.start_shot();
        let shot_old = engine.shot_generation().unwrap();
        engine.start_shot();
        assert_eq!(engine.tick_shot(shot_old), TickOutcome::Stale);
        assert_eq!(engine.shot_tenths(), SHOT_CLOCK_RESET_TENTHS);
    }

    #[test]
    fn main_expiry_stops_both_clocks() {
        let mut engine = ClockEngine::new(2, SHOT_CLOCK_RESET_TENTHS);
        engine.start_main(Utc::now());
        engine.start_shot();
        let generation = engine.main_generation().unwrap();
        assert_eq!(engine.tick_main(generation), TickOutcome::Advanced);
        assert_eq!(engine.tick_main(generation), TickOutcome::TimeExpired);
        assert_eq!(engine.main_remaining(), 0);
        assert!(!engine.is_main_running());
        assert!(!engine.is_shot_running());
        assert!(!engine.start_main(Utc::now()));
    }

    #[test]
    fn shot_clock_needs_main_clock() {
        let mut engine = ClockEngine::new(600, SHOT_CLOCK_RESET_TENTHS);
        assert!(!engine.start_shot());
        assert!(!engine.resume_shot());
        assert!(!engine.is_shot_running());
    }

    #[test]
    fn shot_clock_stays_in_range_with_one_decimal() {
        let mut engine = running_engine();
        engine.start_shot();
        let outcomes = shot_ticks(&mut engine, 120);
        assert_eq!(outcomes.last(), Some(&TickOutcome::ShotExpired));
        assert_eq!(engine.shot_tenths(), 0);
        assert_eq!(engine.shot_seconds(), 0.0);
        assert!(!engine.is_shot_running());
        // Main clock is left to the controller.
        assert!(engine.is_main_running());
    }

    #[test]
    fn low_time_fires_once_per_crossing() {
        let mut engine = running_engine();
        engine.start_shot();
        let outcomes = shot_ticks(&mut engine, 120);
        let low: Vec<u8> = outcomes
            .iter()
            .filter_map(|o| match o {
                TickOutcome::LowTime(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(low, vec![4, 3, 2, 1, 0]);
        // 12.0 -> 11.9 is quiet.
        assert_eq!(outcomes[0], TickOutcome::Advanced);
    }

    #[test]
    fn resume_keeps_value_start_resets() {
        let mut engine = running_engine();
        engine.start_shot();
        shot_ticks(&mut engine, 35);
        engine.pause_shot();
        assert_eq!(engine.shot_tenths(), 85);
        assert!(engine.resume_shot());
        assert_eq!(engine.shot_tenths(), 85);
        engine.start_shot();
        assert_eq!(engine.shot_tenths(), SHOT_CLOCK_RESET_TENTHS);
    }

    #[test]
    fn idle_reset_does_not_start() {
        let mut engine = running_engine();
        engine.start_shot();
        shot_ticks(&mut engine, 7);
        engine.pause_main();
        engine.reset_shot_idle();
        assert_eq!(engine.shot_tenths(), SHOT_CLOCK_RESET_TENTHS);
        assert!(!engine.is_shot_running());
        assert_eq!(engine.shot_generation(), None);
    }
}
