use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{DifficultyTier, Result, TrickTreatError};

/// Word shown to the player for one half of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Trick,
    Treat,
    Death,
}

impl Label {
    pub fn all() -> &'static [Label] {
        &[Label::Trick, Label::Treat, Label::Death]
    }

    /// Maps a uniform sample in `[0, 1)` onto a label using the tier's rates.
    pub fn from_sample(tier: &DifficultyTier, sample: f32) -> Self {
        if sample < tier.treat_rate {
            Label::Treat
        } else if sample < tier.treat_rate + tier.trick_rate {
            Label::Trick
        } else {
            Label::Death
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Label::Trick => "Trick",
            Label::Treat => "Treat",
            Label::Death => "Death",
        };
        f.write_str(text)
    }
}

/// The two labels drawn at the start of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterLabels {
    pub first: Label,
    pub second: Label,
}

impl EncounterLabels {
    pub fn new(first: Label, second: Label) -> Self {
        Self { first, second }
    }

    /// Whether either label equals `label`.
    pub fn contains(&self, label: Label) -> bool {
        self.first == label || self.second == label
    }
}

/// Supplies the labels for each new encounter.
pub trait LabelSource {
    fn draw(&mut self, tier: &DifficultyTier) -> EncounterLabels;
}

/// Draws both labels independently from the tier's distribution.
#[derive(Debug, Clone)]
pub struct RandomLabeler<R> {
    rng: R,
}

impl<R: Rng> RandomLabeler<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn draw_one(&mut self, tier: &DifficultyTier) -> Label {
        Label::from_sample(tier, self.rng.gen::<f32>())
    }
}

impl<R: Rng> LabelSource for RandomLabeler<R> {
    fn draw(&mut self, tier: &DifficultyTier) -> EncounterLabels {
        let first = self.draw_one(tier);
        let second = self.draw_one(tier);
        EncounterLabels::new(first, second)
    }
}

/// Serves the same labels for every encounter, for scripted play.
#[derive(Debug, Clone, Copy)]
pub struct FixedLabels(pub EncounterLabels);

impl LabelSource for FixedLabels {
    fn draw(&mut self, _tier: &DifficultyTier) -> EncounterLabels {
        self.0
    }
}

/// Replays a list of labels in order, then repeats the last one.
#[derive(Debug, Clone)]
pub struct ScriptedLabels {
    script: Vec<EncounterLabels>,
    next: usize,
}

impl ScriptedLabels {
    pub fn new(script: Vec<EncounterLabels>) -> Result<Self> {
        if script.is_empty() {
            return Err(TrickTreatError::msg("label script must not be empty"));
        }
        Ok(Self { script, next: 0 })
    }
}

impl LabelSource for ScriptedLabels {
    fn draw(&mut self, _tier: &DifficultyTier) -> EncounterLabels {
        let index = self.next.min(self.script.len() - 1);
        self.next += 1;
        self.script[index]
    }
}
