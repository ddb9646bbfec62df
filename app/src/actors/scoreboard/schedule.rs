//! Periodic tick source for one clock.
//!
//! A schedule follows the engine's generation for its clock: a new
//! generation replaces the interval, `None` drops it. Each tick carries the
//! generation it was scheduled under.

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use hoopclock::clock::ClockKind;

pub struct TickSchedule {
    kind: ClockKind,
    generation: Option<u64>,
    interval: Option<Interval>,
}

impl TickSchedule {
    pub fn new(kind: ClockKind) -> Self {
        Self {
            kind,
            generation: None,
            interval: None,
        }
    }

    /// Follow the engine's running generation. The first tick of a new
    /// interval fires one full period after it is created.
    pub fn sync(&mut self, running: Option<u64>) {
        if running == self.generation {
            return;
        }
        self.generation = running;
        self.interval = running.map(|_| {
            let period = self.kind.period();
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
    }

    /// Wait for the next tick. Pending forever while the clock is stopped.
    pub async fn tick(&mut self) -> u64 {
        match (self.interval.as_mut(), self.generation) {
            (Some(interval), Some(generation)) => {
                interval.tick().await;
                generation
            }
            _ => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_after_one_period() {
        let mut schedule = TickSchedule::new(ClockKind::Shot);
        schedule.sync(Some(3));
        let start = Instant::now();
        assert_eq!(schedule.tick().await, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_schedule_never_ticks() {
        let mut schedule = TickSchedule::new(ClockKind::Main);
        schedule.sync(Some(1));
        schedule.sync(None);
        let waited = tokio::time::timeout(Duration::from_secs(5), schedule.tick()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn same_generation_keeps_phase() {
        let mut schedule = TickSchedule::new(ClockKind::Main);
        schedule.sync(Some(1));
        tokio::time::advance(Duration::from_millis(600)).await;
        schedule.sync(Some(1));
        let start = Instant::now();
        schedule.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }
}
