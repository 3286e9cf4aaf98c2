use serde::{Deserialize, Serialize};

use crate::{Result, TrickTreatError};

/// Difficulty configuration applied for a run of consecutive encounters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTier {
    /// Number of encounters that make up one phase of this tier.
    pub phase_encounters: u32,
    /// Tempo multiplier applied to the beat clock, `1.0` or faster.
    pub speed: f32,
    /// Probability that a single label is a Treat.
    pub treat_rate: f32,
    /// Probability that a single label is a Trick.
    pub trick_rate: f32,
}

impl DifficultyTier {
    pub fn new(phase_encounters: u32, speed: f32, treat_rate: f32, trick_rate: f32) -> Self {
        Self {
            phase_encounters,
            speed,
            treat_rate,
            trick_rate,
        }
    }

    /// Remaining probability mass, which is assigned to Death.
    pub fn death_rate(&self) -> f32 {
        (1.0 - self.treat_rate - self.trick_rate).max(0.0)
    }

    /// Checks the tier invariants. `name` is only used to label the error.
    pub fn validate(&self, name: impl ToString) -> Result<()> {
        if self.phase_encounters == 0 {
            return Err(TrickTreatError::tier(
                name,
                "phase must contain at least one encounter",
            ));
        }
        if !self.speed.is_finite() || self.speed < 1.0 {
            return Err(TrickTreatError::tier(
                name,
                format!("speed multiplier {} must be at least 1.0", self.speed),
            ));
        }
        for (label, rate) in [("treat", self.treat_rate), ("trick", self.trick_rate)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(TrickTreatError::tier(
                    name,
                    format!("{label} rate {rate} is outside [0, 1]"),
                ));
            }
        }
        if self.treat_rate + self.trick_rate > 1.0 {
            return Err(TrickTreatError::tier(
                name,
                format!(
                    "treat rate {} and trick rate {} add up to more than 1",
                    self.treat_rate, self.trick_rate
                ),
            ));
        }
        Ok(())
    }
}

/// Ordered difficulty tiers followed by an endless tier that is served for
/// every index past the end of the ordered list.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyProgression {
    ordered: Vec<DifficultyTier>,
    endless: DifficultyTier,
}

impl DifficultyProgression {
    /// Builds a progression, rejecting any tier that breaks its invariants.
    pub fn new(ordered: Vec<DifficultyTier>, endless: DifficultyTier) -> Result<Self> {
        for (index, tier) in ordered.iter().enumerate() {
            tier.validate(index)?;
        }
        endless.validate("endless")?;
        Ok(Self { ordered, endless })
    }

    /// Returns the ordered tier at `index`, or the endless tier once the
    /// ordered list is exhausted.
    pub fn tier(&self, index: usize) -> &DifficultyTier {
        self.ordered.get(index).unwrap_or(&self.endless)
    }

    /// Whether `index` lies past the ordered tiers.
    pub fn is_endless(&self, index: usize) -> bool {
        index >= self.ordered.len()
    }

    pub fn endless(&self) -> &DifficultyTier {
        &self.endless
    }

    pub fn ordered(&self) -> &[DifficultyTier] {
        &self.ordered
    }

    /// Number of ordered tiers, which is also the first endless index.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
