//! Win evaluator for the score race.

pub const DEFAULT_TARGET_SCORE: u32 = 21;

/// Points ahead needed once both teams are one point from the target.
const DEUCE_MARGIN: u32 = 2;

/// Score-race rule: first to `target`, win by two once both sides reach
/// `target - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinRule {
    pub target: u32,
}

impl Default for WinRule {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET_SCORE,
        }
    }
}

impl WinRule {
    pub fn new(target: u32) -> Self {
        Self { target }
    }

    /// Whether the score alone ends the game. Time expiry is handled by
    /// the controller and does not go through here.
    pub fn is_decided(&self, score1: u32, score2: u32) -> bool {
        if score1 < self.target && score2 < self.target {
            return false;
        }
        let deuce = self.target.saturating_sub(1);
        if score1 >= deuce && score2 >= deuce {
            return score1.abs_diff(score2) >= DEUCE_MARGIN;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaching_target_ends_game() {
        let rule = WinRule::default();
        assert!(rule.is_decided(21, 0));
        assert!(rule.is_decided(19, 21));
        assert!(!rule.is_decided(20, 0));
    }

    #[test]
    fn deuce_needs_two_point_lead() {
        let rule = WinRule::default();
        assert!(!rule.is_decided(20, 20));
        assert!(!rule.is_decided(21, 20));
        assert!(rule.is_decided(22, 20));
        assert!(!rule.is_decided(25, 24));
        assert!(rule.is_decided(24, 26));
    }

    #[test]
    fn custom_target() {
        let rule = WinRule::new(11);
        assert!(rule.is_decided(11, 3));
        assert!(!rule.is_decided(11, 10));
        assert!(rule.is_decided(12, 10));
    }
}
