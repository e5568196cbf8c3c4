//! Daily goal progress
//!
//! Turns today's completed count and the configured goal into the two lines
//! a front end shows under the clock.

use serde::Serialize;

use crate::labels::{self, Label, Language};

/// Completed work sessions against the daily goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyProgress {
    pub completed: u32,
    pub goal: u32,
}

impl DailyProgress {
    pub fn new(completed: u32, goal: u32) -> Self {
        Self { completed, goal }
    }

    /// Sessions still needed, zero once the goal is met
    pub fn remaining(&self) -> u32 {
        self.goal.saturating_sub(self.completed)
    }

    pub fn is_reached(&self) -> bool {
        self.completed >= self.goal
    }

    /// Share of the goal done, capped at 1.0
    pub fn fraction(&self) -> f64 {
        if self.goal == 0 {
            return 1.0;
        }
        (f64::from(self.completed) / f64::from(self.goal)).min(1.0)
    }

    /// "3/8 sessions", or the goal-reached banner
    pub fn headline(&self, lang: Language) -> String {
        if self.is_reached() {
            labels::label(lang, Label::GoalReached).to_string()
        } else {
            format!(
                "{}/{} {}",
                self.completed,
                self.goal,
                labels::label(lang, Label::Sessions)
            )
        }
    }

    /// Encouragement line under the headline
    pub fn detail(&self, lang: Language) -> String {
        if self.is_reached() {
            labels::label(lang, Label::ExceededGoal).to_string()
        } else {
            labels::remaining_goal(lang, self.remaining())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_progress() {
        let progress = DailyProgress::new(3, 8);
        assert_eq!(progress.remaining(), 5);
        assert!(!progress.is_reached());
        assert_eq!(progress.headline(Language::English), "3/8 sessions");
        assert_eq!(progress.detail(Language::English), "5 more to reach your goal");
        assert!((progress.fraction() - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_reached_and_exceeded() {
        let reached = DailyProgress::new(8, 8);
        assert!(reached.is_reached());
        assert_eq!(reached.remaining(), 0);
        assert_eq!(reached.headline(Language::French), "🎉 Objectif atteint!");

        let exceeded = DailyProgress::new(11, 8);
        assert_eq!(exceeded.remaining(), 0);
        assert_eq!(exceeded.fraction(), 1.0);
        assert_eq!(exceeded.detail(Language::English), "You exceeded your goal! 💪");
    }

    #[test]
    fn test_zero_goal() {
        let progress = DailyProgress::new(0, 0);
        assert!(progress.is_reached());
        assert_eq!(progress.fraction(), 1.0);
    }
}
