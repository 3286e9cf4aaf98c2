use std::{fmt, ops};

use serde::{Deserialize, Serialize};

/// Counters accumulated over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub max_combo: u32,
    pub success_count: u32,
    pub failure_count: u32,
    pub late_count: u32,
    pub safe_count: u32,
    /// A Death outcome happened during the session.
    pub treated_death: bool,
}

impl SessionResult {
    /// Encounters that produced a counted outcome. Death is not counted.
    pub fn total_encounters(&self) -> u32 {
        self.success_count + self.failure_count + self.late_count + self.safe_count
    }

    pub fn total_misses(&self) -> u32 {
        self.failure_count + self.late_count
    }

    pub fn total_non_misses(&self) -> u32 {
        self.success_count + self.safe_count
    }
}

/// Set of best-of metrics a result improved when it was recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImprovedMetrics(u8);

impl ImprovedMetrics {
    pub const NONE: Self = Self(0);
    pub const MAX_COMBO: Self = Self(1);
    pub const MAX_SUCCESS: Self = Self(1 << 1);
    pub const MAX_NON_MISSES: Self = Self(1 << 2);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl ops::BitOr for ImprovedMetrics {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for ImprovedMetrics {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl ops::BitAnd for ImprovedMetrics {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for ImprovedMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::MAX_COMBO, "max-combo"),
            (Self::MAX_SUCCESS, "max-success"),
            (Self::MAX_NON_MISSES, "max-non-misses"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();

        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Append-only record of finished sessions with running best indices.
///
/// A best index only moves when a later result is strictly greater, so ties
/// keep the earliest session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    results: Vec<SessionResult>,
    improvements: Vec<ImprovedMetrics>,
    best_max_combo: Option<usize>,
    best_success: Option<usize>,
    best_non_misses: Option<usize>,
    ever_treated_death: bool,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finished session and returns the metrics it improved.
    pub fn add_result(&mut self, result: SessionResult) -> ImprovedMetrics {
        let index = self.results.len();
        self.results.push(result);

        let mut improved = ImprovedMetrics::NONE;
        if Self::beats(&self.results, self.best_max_combo, index, |r| r.max_combo) {
            self.best_max_combo = Some(index);
            improved |= ImprovedMetrics::MAX_COMBO;
        }
        if Self::beats(&self.results, self.best_success, index, |r| {
            r.success_count
        }) {
            self.best_success = Some(index);
            improved |= ImprovedMetrics::MAX_SUCCESS;
        }
        if Self::beats(&self.results, self.best_non_misses, index, |r| {
            r.total_non_misses()
        }) {
            self.best_non_misses = Some(index);
            improved |= ImprovedMetrics::MAX_NON_MISSES;
        }
        self.ever_treated_death |= result.treated_death;
        self.improvements.push(improved);

        tracing::debug!(index, %improved, "session recorded");
        improved
    }

    /// Metrics improved by the result stored at `index`.
    pub fn evaluate(&self, index: usize) -> ImprovedMetrics {
        self.improvements
            .get(index)
            .copied()
            .unwrap_or(ImprovedMetrics::NONE)
    }

    /// Metrics improved by the most recent result.
    pub fn last_improved_metrics(&self) -> ImprovedMetrics {
        self.improvements
            .last()
            .copied()
            .unwrap_or(ImprovedMetrics::NONE)
    }

    pub fn best_max_combo(&self) -> Option<usize> {
        self.best_max_combo
    }

    pub fn best_success_count(&self) -> Option<usize> {
        self.best_success
    }

    pub fn best_total_non_misses(&self) -> Option<usize> {
        self.best_non_misses
    }

    pub fn ever_treated_death(&self) -> bool {
        self.ever_treated_death
    }

    pub fn results(&self) -> &[SessionResult] {
        &self.results
    }

    pub fn last_result(&self) -> Option<&SessionResult> {
        self.results.last()
    }

    /// At least one session has been recorded.
    pub fn played(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn beats<F>(results: &[SessionResult], best: Option<usize>, index: usize, metric: F) -> bool
    where
        F: Fn(&SessionResult) -> u32,
    {
        match best {
            None => true,
            Some(best) => metric(&results[index]) > metric(&results[best]),
        }
    }
}
