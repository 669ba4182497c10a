//! Merit/demerit counters and the terminal win/lose check.

use contracts::{ScoreSnapshot, Verdict};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreState {
    merits: u32,
    demerits: u32,
    merit_goal: u32,
    demerit_limit: u32,
}

impl ScoreState {
    pub fn new(merit_goal: u32, demerit_limit: u32) -> Self {
        Self {
            merits: 0,
            demerits: 0,
            merit_goal,
            demerit_limit,
        }
    }

    pub fn merits(&self) -> u32 {
        self.merits
    }

    pub fn demerits(&self) -> u32 {
        self.demerits
    }

    /// Returns `Some(Won)` when this merit reaches the goal.
    pub fn add_merit(&mut self) -> Option<Verdict> {
        self.merits = self.merits.saturating_add(1);
        info!(merits = self.merits, goal = self.merit_goal, "merit awarded");
        (self.merits >= self.merit_goal).then_some(Verdict::Won)
    }

    /// Returns `Some(Lost)` when this demerit reaches the limit.
    pub fn add_demerit(&mut self) -> Option<Verdict> {
        self.demerits = self.demerits.saturating_add(1);
        info!(demerits = self.demerits, limit = self.demerit_limit, "demerit awarded");
        (self.demerits >= self.demerit_limit).then_some(Verdict::Lost)
    }

    /// Star/cross progress lines, e.g. `MERITS: ***.......`.
    pub fn hud_lines(&self) -> [String; 2] {
        let bar = |filled: u32, total: u32, mark: char| {
            (0..total)
                .map(|slot| if slot < filled { mark } else { '.' })
                .collect::<String>()
        };
        [
            format!("MERITS: {}", bar(self.merits, self.merit_goal, '*')),
            format!("DEMERITS: {}", bar(self.demerits, self.demerit_limit, 'X')),
        ]
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            merits: self.merits,
            demerits: self.demerits,
            merit_goal: self.merit_goal,
            demerit_limit: self.demerit_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninth_merit_does_not_win_tenth_does() {
        let mut score = ScoreState::new(10, 3);
        for _ in 0..9 {
            assert_eq!(score.add_merit(), None);
        }
        assert_eq!(score.add_merit(), Some(Verdict::Won));
        assert_eq!(score.merits(), 10);
    }

    #[test]
    fn second_demerit_does_not_lose_third_does() {
        let mut score = ScoreState::new(10, 3);
        assert_eq!(score.add_demerit(), None);
        assert_eq!(score.add_demerit(), None);
        assert_eq!(score.add_demerit(), Some(Verdict::Lost));
    }

    #[test]
    fn counters_are_independent() {
        let mut score = ScoreState::new(10, 3);
        score.add_demerit();
        score.add_demerit();
        for _ in 0..5 {
            score.add_merit();
        }
        assert_eq!(score.demerits(), 2);
        assert_eq!(score.add_demerit(), Some(Verdict::Lost));
        assert_eq!(score.merits(), 5);
    }

    #[test]
    fn hud_lines_show_progress() {
        let mut score = ScoreState::new(10, 3);
        score.add_merit();
        score.add_merit();
        score.add_demerit();
        assert_eq!(
            score.hud_lines(),
            ["MERITS: **........".to_string(), "DEMERITS: X..".to_string()]
        );
    }
}
