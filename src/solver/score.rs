//! The hard/soft score type, following the teacher's
//! `HardSoftDecimalScore` philosophy: hard is lexicographically dominant,
//! and "hard" constraints are enforced by heavy weighting rather than
//! algebraic pruning — the same technique `constraints.rs`'s
//! `penalize(HardSoftDecimalScore::ONE_HARD)` / `of_hard_scaled(..)` uses.

use std::fmt;

/// `hard` and `soft` are both penalties: `0.0` is perfect, more negative is
/// worse. A solution is feasible iff `hard >= 0` (within floating-point
/// tolerance).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Score {
    pub hard: f64,
    pub soft: f64,
}

impl Score {
    pub const ZERO: Score = Score { hard: 0.0, soft: 0.0 };

    pub fn is_feasible(&self) -> bool {
        self.hard >= -1e-6
    }

    /// `self` is at least as good as `other` under hard-then-soft
    /// lexicographic ordering.
    pub fn at_least_as_good_as(&self, other: &Score) -> bool {
        if (self.hard - other.hard).abs() > 1e-9 {
            self.hard > other.hard
        } else {
            self.soft >= other.soft - 1e-9
        }
    }

    pub fn strictly_better_than(&self, other: &Score) -> bool {
        if (self.hard - other.hard).abs() > 1e-9 {
            self.hard > other.hard
        } else {
            self.soft > other.soft + 1e-9
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}hard/{:.3}soft", self.hard, self.soft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_dominates_soft() {
        let better_hard = Score { hard: -1.0, soft: -1000.0 };
        let worse_hard_better_soft = Score { hard: -2.0, soft: 1000.0 };
        assert!(better_hard.strictly_better_than(&worse_hard_better_soft));
    }

    #[test]
    fn soft_breaks_ties_on_equal_hard() {
        let a = Score { hard: 0.0, soft: 5.0 };
        let b = Score { hard: 0.0, soft: 3.0 };
        assert!(a.strictly_better_than(&b));
    }

    #[test]
    fn zero_is_feasible() {
        assert!(Score::ZERO.is_feasible());
        assert!(!Score { hard: -0.5, soft: 0.0 }.is_feasible());
    }
}
