use serde::{Deserialize, Serialize};

use crate::{EncounterLabels, Label};

/// Classification of a finished encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success,
    Safe,
    Late,
    Fail,
    Death,
}

impl OutcomeKind {
    pub fn all() -> &'static [OutcomeKind] {
        &[
            OutcomeKind::Success,
            OutcomeKind::Safe,
            OutcomeKind::Late,
            OutcomeKind::Fail,
            OutcomeKind::Death,
        ]
    }

    /// Success and Safe keep the combo going.
    pub fn continues_combo(self) -> bool {
        matches!(self, OutcomeKind::Success | OutcomeKind::Safe)
    }

    /// Fail and Late count as misses. Death is tracked on its own.
    pub fn is_miss(self) -> bool {
        matches!(self, OutcomeKind::Fail | OutcomeKind::Late)
    }
}

/// Classifies an encounter from its labels and whether the trigger was
/// latched inside the window.
///
/// A Treat asks for a response: pressing succeeds, while holding back
/// degrades to Fail, Death or Late depending on the other label. Without a
/// Treat, pressing is a guess that fails, or kills when a Death is showing.
pub fn resolve(labels: &EncounterLabels, triggered: bool) -> OutcomeKind {
    let has_trick = labels.contains(Label::Trick);
    let has_death = labels.contains(Label::Death);

    if labels.contains(Label::Treat) {
        if triggered {
            OutcomeKind::Success
        } else if has_trick {
            OutcomeKind::Fail
        } else if has_death {
            OutcomeKind::Death
        } else {
            OutcomeKind::Late
        }
    } else if triggered {
        if has_death {
            OutcomeKind::Death
        } else {
            OutcomeKind::Fail
        }
    } else {
        OutcomeKind::Safe
    }
}
