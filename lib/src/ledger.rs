//! Score and foul ledger. Counters only move through bounded steps.

use crate::Team;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TeamLine {
    score: u32,
    fouls: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    lines: [TeamLine; 2],
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, team: Team) -> &TeamLine {
        &self.lines[index(team)]
    }

    fn line_mut(&mut self, team: Team) -> &mut TeamLine {
        &mut self.lines[index(team)]
    }

    pub fn score(&self, team: Team) -> u32 {
        self.line(team).score
    }

    pub fn fouls(&self, team: Team) -> u32 {
        self.line(team).fouls
    }

    pub fn scores(&self) -> (u32, u32) {
        (self.score(Team::One), self.score(Team::Two))
    }

    pub fn add_score(&mut self, team: Team, points: u32) {
        let line = self.line_mut(team);
        line.score = line.score.saturating_add(points);
    }

    /// Take one point away. Returns `false` (and does nothing) at zero.
    pub fn remove_score(&mut self, team: Team) -> bool {
        decrement(&mut self.line_mut(team).score)
    }

    pub fn add_foul(&mut self, team: Team) {
        let line = self.line_mut(team);
        line.fouls = line.fouls.saturating_add(1);
    }

    /// Take one foul away. Returns `false` (and does nothing) at zero.
    pub fn remove_foul(&mut self, team: Team) -> bool {
        decrement(&mut self.line_mut(team).fouls)
    }
}

fn index(team: Team) -> usize {
    match team {
        Team::One => 0,
        Team::Two => 1,
    }
}

fn decrement(value: &mut u32) -> bool {
    match value.checked_sub(1) {
        Some(v) => {
            *value = v;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_is_bounded_at_zero() {
        let mut ledger = Ledger::new();
        assert!(!ledger.remove_score(Team::One));
        ledger.add_score(Team::One, 2);
        assert!(ledger.remove_score(Team::One));
        assert!(ledger.remove_score(Team::One));
        assert!(!ledger.remove_score(Team::One));
        assert_eq!(ledger.score(Team::One), 0);
    }

    #[test]
    fn scores_never_negative_for_mixed_sequences() {
        let mut ledger = Ledger::new();
        // Deterministic pseudo-random walk over add/remove for both teams.
        let mut expected = [0u32; 2];
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let (team, slot) = if seed & 1 == 0 {
                (Team::One, 0)
            } else {
                (Team::Two, 1)
            };
            if (seed >> 8) % 3 == 0 {
                let points = 1 + (seed >> 16) % 2;
                ledger.add_score(team, points);
                expected[slot] += points;
            } else {
                assert_eq!(ledger.remove_score(team), expected[slot] > 0);
                expected[slot] = expected[slot].saturating_sub(1);
            }
            assert_eq!(ledger.scores(), (expected[0], expected[1]));
        }
    }

    #[test]
    fn fouls_are_tracked_per_team() {
        let mut ledger = Ledger::new();
        ledger.add_foul(Team::Two);
        ledger.add_foul(Team::Two);
        assert!(!ledger.remove_foul(Team::One));
        assert_eq!(ledger.fouls(Team::One), 0);
        assert_eq!(ledger.fouls(Team::Two), 2);
    }
}
