//! Core engine for Trick or Beat.
//!
//! Encounters are presented on a fixed musical pulse. Each one shows two
//! labels, the player either reacts inside a short beat window or holds
//! back, and the encounter resolves into one of five outcomes that drive
//! combo, life and the session statistics.
//!
//! The engine is tick driven and never reads a clock or an input device on
//! its own: the caller supplies the time delta, a [`LabelSource`] and a
//! [`TriggerSource`] on every [`RoundState::tick`]. Presentation layers read
//! the state back through accessors.

pub mod config;
pub mod difficulty;
pub mod error;
pub mod history;
pub mod labels;
pub mod outcome;
pub mod round;
pub mod timeline;

pub use config::{GameSettings, TriggerWindow};
pub use difficulty::{DifficultyProgression, DifficultyTier};
pub use error::{Result, TrickTreatError};
pub use history::{ImprovedMetrics, SessionHistory, SessionResult};
pub use labels::{
    EncounterLabels, FixedLabels, Label, LabelSource, RandomLabeler, ScriptedLabels,
};
pub use outcome::OutcomeKind;
pub use round::{RoundState, RoundStatus, TickReport, TriggerSource};
pub use timeline::BeatClock;
