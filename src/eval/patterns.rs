//! Threat weights for position evaluation
//!
//! A weight table assigns one score per threat kind. The evaluator's core
//! invariant is that no combination of lower threats outweighs a single
//! higher one. Counts are capped at [`COUNT_CAP`] per kind, so the invariant
//! holds when every weight exceeds `COUNT_CAP` times the sum of all weights
//! below it; [`WeightTable::validate`] checks exactly that.

use serde::{Deserialize, Serialize};

use super::threats::{ThreatCounts, ThreatKind};
use crate::error::ConfigError;

/// Per-kind counts above this value add nothing to the score.
pub const COUNT_CAP: u32 = 9;

/// Score per threat kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightTable {
    pub two: i32,
    pub open_two: i32,
    pub three: i32,
    pub broken_three: i32,
    pub open_three: i32,
    pub four: i32,
    pub open_four: i32,
    pub five: i32,
}

impl WeightTable {
    /// Cheap tier: plain powers of ten.
    pub const fn basic() -> Self {
        Self {
            two: 1,
            open_two: 10,
            three: 100,
            broken_three: 1_000,
            open_three: 10_000,
            four: 100_000,
            open_four: 1_000_000,
            five: 10_000_000,
        }
    }

    /// Deep tier: slightly wider gaps between the attacking kinds.
    pub const fn pro() -> Self {
        Self {
            two: 1,
            open_two: 12,
            three: 120,
            broken_three: 1_300,
            open_three: 13_000,
            four: 140_000,
            open_four: 1_500_000,
            five: 16_000_000,
        }
    }

    #[inline]
    pub fn weight(&self, kind: ThreatKind) -> i32 {
        match kind {
            ThreatKind::Two => self.two,
            ThreatKind::OpenTwo => self.open_two,
            ThreatKind::Three => self.three,
            ThreatKind::BrokenThree => self.broken_three,
            ThreatKind::OpenThree => self.open_three,
            ThreatKind::Four => self.four,
            ThreatKind::OpenFour => self.open_four,
            ThreatKind::Five => self.five,
        }
    }

    /// Check the danger ordering: each weight must beat `COUNT_CAP` copies of
    /// everything below it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.two <= 0 {
            return Err(ConfigError::WeightOrdering(ThreatKind::Two.name()));
        }
        let mut lower: i64 = 0;
        for kind in ThreatKind::BY_DANGER.into_iter().rev() {
            let w = i64::from(self.weight(kind));
            if w <= i64::from(COUNT_CAP) * lower {
                return Err(ConfigError::WeightOrdering(kind.name()));
            }
            lower += w;
        }
        // The capped total must stay clear of terminal scores.
        if i64::from(COUNT_CAP) * lower >= i64::from(super::heuristic::WIN_SCORE) / 4 {
            return Err(ConfigError::WeightOrdering(ThreatKind::Five.name()));
        }
        Ok(())
    }

    /// Weighted sum of `counts`, each count capped at [`COUNT_CAP`].
    pub fn score(&self, counts: &ThreatCounts) -> i32 {
        ThreatKind::BY_DANGER
            .into_iter()
            .map(|kind| self.weight(kind) * counts.get(kind).min(COUNT_CAP) as i32)
            .sum()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::pro()
    }
}
