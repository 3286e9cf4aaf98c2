use std::{ops::RangeInclusive, path::Path};

use serde::{Deserialize, Serialize};

use crate::{DifficultyProgression, DifficultyTier, Result, TrickTreatError};

/// Top-level configuration for a play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Real-time delay in seconds before play begins.
    pub pre_delay: f32,
    pub bpm: f32,
    /// Beats in a single encounter. The last beat resolves the encounter.
    pub beats: u32,
    pub trigger_window: TriggerWindow,
    /// Initial life, which is also the maximum.
    pub life: u32,
    /// Every multiple of this combo restores one life.
    pub revive_combo: u32,
    pub difficulties: Vec<DifficultyTier>,
    pub endless: DifficultyTier,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            pre_delay: 1.0,
            bpm: 120.0,
            beats: 4,
            trigger_window: TriggerWindow::new(2, 3),
            life: 5,
            revive_combo: 5,
            difficulties: vec![
                DifficultyTier::new(4, 1.0, 0.5, 0.5),
                DifficultyTier::new(6, 1.2, 0.45, 0.4),
                DifficultyTier::new(8, 1.4, 0.4, 0.4),
                DifficultyTier::new(8, 1.7, 0.4, 0.35),
            ],
            endless: DifficultyTier::new(8, 2.0, 0.35, 0.4),
        }
    }
}

impl GameSettings {
    /// Parses and validates settings from a JSON document. Missing fields
    /// fall back to [`GameSettings::default`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Rejects settings that would break the engine's arithmetic or the
    /// tier invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(TrickTreatError::settings(format!(
                "bpm must be positive, got {}",
                self.bpm
            )));
        }
        if self.beats == 0 {
            return Err(TrickTreatError::settings(
                "an encounter needs at least one beat",
            ));
        }
        if !self.pre_delay.is_finite() || self.pre_delay < 0.0 {
            return Err(TrickTreatError::settings(format!(
                "pre-delay must be zero or positive, got {}",
                self.pre_delay
            )));
        }
        let window = self.trigger_window;
        if window.start > window.end || window.end >= self.beats {
            return Err(TrickTreatError::settings(format!(
                "trigger window [{}, {}] does not fit in {} beats",
                window.start, window.end, self.beats
            )));
        }
        if self.life == 0 {
            return Err(TrickTreatError::settings("life must be at least 1"));
        }
        if self.revive_combo == 0 {
            return Err(TrickTreatError::settings(
                "revive combo threshold must be at least 1",
            ));
        }
        self.progression().map(|_| ())
    }

    /// Builds the validated difficulty progression described by these settings.
    pub fn progression(&self) -> Result<DifficultyProgression> {
        DifficultyProgression::new(self.difficulties.clone(), self.endless.clone())
    }

    /// Index of the beat that resolves an encounter.
    pub fn last_beat(&self) -> u32 {
        self.beats.saturating_sub(1)
    }
}

/// Inclusive range of beat indices during which the trigger is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerWindow {
    pub start: u32,
    pub end: u32,
}

impl TriggerWindow {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, beat: u32) -> bool {
        self.start <= beat && beat <= self.end
    }

    pub fn as_range(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }
}
