//! Round state machine for a single play session.
//!
//! A [`RoundState`] is advanced by an external driver, one fixed delta per
//! tick. The driver also supplies the label source and the trigger capability.
//! Everything else is read back through accessors or the returned
//! [`TickReport`].

use serde::{Deserialize, Serialize};

use crate::{
    outcome, BeatClock, DifficultyProgression, DifficultyTier, EncounterLabels, GameSettings,
    LabelSource, OutcomeKind, Result, SessionResult,
};

/// Lifecycle of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Pre-roll delay before play begins.
    Ready,
    Game,
    /// Terminal. Nothing mutates once it is reached.
    GameOver,
}

/// Player input, sampled at most once per tick while the beat index is
/// inside the trigger window.
pub trait TriggerSource {
    fn sample(&mut self) -> bool;
}

impl<F: FnMut() -> bool> TriggerSource for F {
    fn sample(&mut self) -> bool {
        self()
    }
}

/// Snapshot of what happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub beat_index: u32,
    pub beat_triggered: bool,
    /// Outcome resolved on this tick, if the encounter ended.
    pub outcome: Option<OutcomeKind>,
    /// The encounter resolved on this tick completed its tier's phase.
    pub phase_advanced: bool,
    pub status: RoundStatus,
}

#[derive(Debug, Clone)]
pub struct RoundState {
    settings: GameSettings,
    progression: DifficultyProgression,
    clock: BeatClock,
    status: RoundStatus,
    pre_delay_elapsed: f32,
    tier_index: usize,
    phases_completed: u32,
    encounters_in_tier: u32,
    life: u32,
    combo: u32,
    trigger_armed: bool,
    labels: Option<EncounterLabels>,
    outcome: Option<OutcomeKind>,
    phase_advanced: bool,
    result: SessionResult,
}

impl RoundState {
    /// Creates a round in the `Ready` state. Fails if the settings are invalid.
    pub fn new(settings: GameSettings) -> Result<Self> {
        settings.validate()?;
        let progression = settings.progression()?;
        let clock = BeatClock::new(settings.bpm, settings.beats);
        let life = settings.life;

        Ok(Self {
            settings,
            progression,
            clock,
            status: RoundStatus::Ready,
            pre_delay_elapsed: 0.0,
            tier_index: 0,
            phases_completed: 0,
            encounters_in_tier: 0,
            life,
            combo: 0,
            trigger_armed: false,
            labels: None,
            outcome: None,
            phase_advanced: false,
            result: SessionResult::default(),
        })
    }

    /// Advances the round by `delta` seconds. Negative and non-finite
    /// deltas count as zero.
    pub fn tick<L, T>(&mut self, delta: f32, labels: &mut L, trigger: &mut T) -> TickReport
    where
        L: LabelSource + ?Sized,
        T: TriggerSource + ?Sized,
    {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.outcome = None;
        self.phase_advanced = false;

        match self.effective_status() {
            RoundStatus::GameOver => {
                self.status = RoundStatus::GameOver;
                self.clock.clear_trigger();
                return self.report();
            }
            RoundStatus::Ready => {
                if !self.advance_ready(delta) {
                    return self.report();
                }
            }
            RoundStatus::Game => {
                if !self.clock.advance(delta) && self.clock.is_paused() {
                    return self.report();
                }
            }
        }

        let beat = self.clock.beat_index();
        if !self.trigger_armed && self.settings.trigger_window.contains(beat) {
            self.trigger_armed = trigger.sample();
        }
        if self.clock.triggered() {
            // With a single beat per encounter, beat zero both ends one
            // encounter and starts the next. The play-start beat has nothing
            // to finish.
            if beat == self.settings.last_beat() && self.labels.is_some() {
                self.finish_encounter();
            }
            if beat == 0 && !self.is_game_over() {
                self.begin_encounter(labels);
            }
        }

        self.report()
    }

    /// Applies a resolved outcome to life, combo and the session counters.
    ///
    /// Returns `true` when the encounter completed the current tier's phase.
    /// Does nothing once the round is over.
    pub fn apply_outcome(&mut self, outcome: OutcomeKind) -> bool {
        if self.is_game_over() {
            return false;
        }

        match outcome {
            OutcomeKind::Success => self.result.success_count += 1,
            OutcomeKind::Safe => self.result.safe_count += 1,
            OutcomeKind::Late => self.result.late_count += 1,
            OutcomeKind::Fail => self.result.failure_count += 1,
            OutcomeKind::Death => self.result.treated_death = true,
        }

        if outcome.continues_combo() {
            self.combo += 1;
            self.result.max_combo = self.result.max_combo.max(self.combo);
            if self.combo % self.settings.revive_combo == 0 && self.life < self.settings.life {
                self.life += 1;
                tracing::debug!(combo = self.combo, life = self.life, "combo revived a life");
            }
        } else {
            self.combo = 0;
            self.life = if outcome.is_miss() {
                self.life.saturating_sub(1)
            } else {
                0
            };
        }

        if self.life == 0 {
            self.status = RoundStatus::GameOver;
            tracing::info!(
                ?outcome,
                max_combo = self.result.max_combo,
                encounters = self.result.total_encounters(),
                "game over"
            );
        }

        self.encounters_in_tier += 1;
        if self.encounters_in_tier < self.current_tier().phase_encounters {
            return false;
        }

        self.encounters_in_tier = 0;
        self.phases_completed += 1;
        if self.tier_index + 1 < self.progression.len() {
            self.tier_index += 1;
        }
        tracing::debug!(
            tier = self.tier_index,
            endless = self.endless_reached(),
            "phase complete"
        );
        true
    }

    /// Overrides the clock speed. `0` pauses the round; the next encounter
    /// start applies the tier's own speed again.
    pub fn set_speed(&mut self, speed: f32) {
        self.clock.set_speed(speed);
    }

    pub fn beat_index(&self) -> u32 {
        self.clock.beat_index()
    }

    pub fn beat_triggered(&self) -> bool {
        self.clock.triggered()
    }

    /// Outcome produced by the most recent tick, if any.
    pub fn current_outcome(&self) -> Option<OutcomeKind> {
        self.outcome
    }

    pub fn phase_advanced(&self) -> bool {
        self.phase_advanced
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn life(&self) -> u32 {
        self.life
    }

    /// Status as callers should see it: zero life is game over even before
    /// the next tick writes the transition.
    pub fn effective_status(&self) -> RoundStatus {
        if self.life == 0 {
            RoundStatus::GameOver
        } else {
            self.status
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.effective_status() == RoundStatus::GameOver
    }

    /// Counters accumulated so far.
    pub fn session_result(&self) -> SessionResult {
        self.result
    }

    /// Consumes the round and returns its final counters.
    pub fn finish(self) -> SessionResult {
        self.result
    }

    /// Labels of the encounter in progress. `None` until play begins.
    pub fn labels(&self) -> Option<EncounterLabels> {
        self.labels
    }

    pub fn trigger_armed(&self) -> bool {
        self.trigger_armed
    }

    pub fn current_tier(&self) -> &DifficultyTier {
        self.progression.tier(self.tier_index)
    }

    pub fn tier_index(&self) -> usize {
        self.tier_index
    }

    /// Number of phases completed, including phases of the endless tier.
    pub fn phase_number(&self) -> u32 {
        self.phases_completed
    }

    pub fn encounters_completed_in_tier(&self) -> u32 {
        self.encounters_in_tier
    }

    /// Whether the endless tier is in play. The index stops at the last
    /// ordered tier, so this only holds when no ordered tiers are configured.
    pub fn endless_reached(&self) -> bool {
        self.progression.is_endless(self.tier_index)
    }

    pub fn speed(&self) -> f32 {
        self.clock.speed()
    }

    pub fn beat_duration(&self) -> f32 {
        self.clock.beat_duration()
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn progression(&self) -> &DifficultyProgression {
        &self.progression
    }

    fn report(&self) -> TickReport {
        TickReport {
            beat_index: self.clock.beat_index(),
            beat_triggered: self.clock.triggered(),
            outcome: self.outcome,
            phase_advanced: self.phase_advanced,
            status: self.effective_status(),
        }
    }

    /// Runs the pre-roll. The clock keeps its idle pulse until the delay has
    /// elapsed, then play begins on a re-synchronised beat zero.
    fn advance_ready(&mut self, delta: f32) -> bool {
        if self.clock.is_paused() {
            self.clock.clear_trigger();
            return false;
        }

        self.pre_delay_elapsed += delta.max(0.0);
        if self.pre_delay_elapsed < self.settings.pre_delay {
            self.clock.advance(delta);
            return false;
        }

        self.status = RoundStatus::Game;
        self.clock.reset();
        tracing::debug!(elapsed = self.pre_delay_elapsed, "play started");
        true
    }

    fn begin_encounter<L: LabelSource + ?Sized>(&mut self, source: &mut L) {
        let tier = self.progression.tier(self.tier_index);
        let labels = source.draw(tier);
        self.clock.set_speed(tier.speed);
        self.clock.reset();
        self.trigger_armed = false;
        self.labels = Some(labels);
        tracing::trace!(
            first = %labels.first,
            second = %labels.second,
            tier = self.tier_index,
            "encounter started"
        );
    }

    fn finish_encounter(&mut self) {
        let labels = self
            .labels
            .expect("encounter labels must be drawn before resolution");
        let outcome = outcome::resolve(&labels, self.trigger_armed);
        tracing::debug!(?outcome, triggered = self.trigger_armed, "encounter resolved");

        self.outcome = Some(outcome);
        self.phase_advanced = self.apply_outcome(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedLabels, Label, ScriptedLabels};

    const TICK: f32 = 0.125;

    fn settings() -> GameSettings {
        GameSettings {
            pre_delay: 0.0,
            bpm: 120.0,
            beats: 4,
            life: 3,
            revive_combo: 2,
            difficulties: vec![
                DifficultyTier::new(2, 1.0, 0.5, 0.5),
                DifficultyTier::new(3, 2.0, 0.5, 0.5),
            ],
            endless: DifficultyTier::new(4, 3.0, 0.5, 0.5),
            ..GameSettings::default()
        }
    }

    fn round() -> RoundState {
        RoundState::new(settings()).unwrap()
    }

    fn labels(first: Label, second: Label) -> FixedLabels {
        FixedLabels(EncounterLabels::new(first, second))
    }

    /// Ticks until an outcome is produced or `limit` ticks have elapsed.
    fn run_encounter<L: LabelSource>(
        round: &mut RoundState,
        source: &mut L,
        pressed: bool,
    ) -> Option<TickReport> {
        let mut trigger = || pressed;
        for _ in 0..64 {
            let report = round.tick(TICK, source, &mut trigger);
            if report.outcome.is_some() {
                return Some(report);
            }
        }
        None
    }

    #[test]
    fn starts_ready_with_full_life() {
        let round = round();

        assert_eq!(round.effective_status(), RoundStatus::Ready);
        assert_eq!(round.life(), 3);
        assert_eq!(round.combo(), 0);
        assert_eq!(round.tier_index(), 0);
        assert!(round.labels().is_none());
    }

    #[test]
    fn rejects_invalid_settings() {
        let settings = GameSettings {
            difficulties: vec![DifficultyTier::new(0, 1.0, 0.5, 0.5)],
            ..settings()
        };
        assert!(RoundState::new(settings).is_err());
    }

    #[test]
    fn ready_keeps_pulse_until_pre_delay() {
        let mut round = RoundState::new(GameSettings {
            pre_delay: 1.0,
            ..settings()
        })
        .unwrap();
        let mut source = labels(Label::Treat, Label::Treat);
        let mut sampled = 0;
        let mut trigger = || {
            sampled += 1;
            true
        };

        let reports: Vec<TickReport> = (0..8)
            .map(|_| round.tick(TICK, &mut source, &mut trigger))
            .collect();

        assert!(reports[..7].iter().all(|r| r.status == RoundStatus::Ready));
        assert!(reports[3].beat_triggered);
        assert_eq!(reports[3].beat_index, 1);
        assert_eq!(reports[7].status, RoundStatus::Game);
        assert!(reports[7].beat_triggered);
        assert_eq!(reports[7].beat_index, 0);
        assert!(round.labels().is_some());
        assert_eq!(sampled, 0);
    }

    #[test]
    fn samples_only_inside_window() {
        let mut round = round();
        let mut source = labels(Label::Trick, Label::Trick);
        let mut sampled = 0;
        let mut trigger = || {
            sampled += 1;
            false
        };

        // Entering play, then one full encounter of four beats.
        for _ in 0..17 {
            round.tick(TICK, &mut source, &mut trigger);
        }

        // Beats 2 and 3 last four ticks each.
        assert_eq!(sampled, 8);
        assert_eq!(round.session_result().safe_count, 1);
    }

    #[test]
    fn trigger_latches_for_the_encounter() {
        let mut round = round();
        let mut source = labels(Label::Treat, Label::Trick);
        let mut presses = [true, false, false, false, false, false, false, false].into_iter();
        let mut trigger = || presses.next().unwrap_or(false);

        let report = run_encounter_with(&mut round, &mut source, &mut trigger);

        assert_eq!(report.outcome, Some(OutcomeKind::Success));
        assert_eq!(report.beat_index, 3);
    }

    fn run_encounter_with<L: LabelSource, T: TriggerSource>(
        round: &mut RoundState,
        source: &mut L,
        trigger: &mut T,
    ) -> TickReport {
        for _ in 0..64 {
            let report = round.tick(TICK, source, trigger);
            if report.outcome.is_some() {
                return report;
            }
        }
        panic!("no encounter resolved");
    }

    #[test]
    fn miss_resets_combo_and_costs_life() {
        let mut round = round();
        let mut hit = labels(Label::Treat, Label::Treat);

        run_encounter(&mut round, &mut hit, true).unwrap();
        assert_eq!(round.combo(), 1);

        let report = run_encounter(&mut round, &mut hit, false).unwrap();
        assert_eq!(report.outcome, Some(OutcomeKind::Late));
        assert_eq!(round.combo(), 0);
        assert_eq!(round.life(), 2);
        assert_eq!(round.session_result().max_combo, 1);
        assert_eq!(round.session_result().late_count, 1);
    }

    #[test]
    fn revive_only_on_combo_multiples_below_max() {
        let mut round = round();

        assert!(!round.apply_outcome(OutcomeKind::Fail));
        assert_eq!(round.life(), 2);

        round.apply_outcome(OutcomeKind::Success);
        assert_eq!(round.life(), 2);
        round.apply_outcome(OutcomeKind::Safe);
        assert_eq!((round.combo(), round.life()), (2, 3));

        for _ in 0..4 {
            round.apply_outcome(OutcomeKind::Success);
            assert_eq!(round.life(), 3);
        }
        assert_eq!(round.combo(), 6);
    }

    #[test]
    fn death_ends_the_round_and_freezes_counters() {
        let mut round = round();
        let mut source = labels(Label::Death, Label::Death);

        let report = run_encounter(&mut round, &mut source, true).unwrap();

        assert_eq!(report.outcome, Some(OutcomeKind::Death));
        assert_eq!(report.status, RoundStatus::GameOver);
        assert_eq!(round.life(), 0);
        assert!(round.session_result().treated_death);

        let frozen = round.session_result();
        let mut trigger = || true;
        for _ in 0..40 {
            let report = round.tick(TICK, &mut source, &mut trigger);
            assert_eq!(report.status, RoundStatus::GameOver);
            assert!(report.outcome.is_none());
            assert!(!report.beat_triggered);
        }
        assert!(!round.apply_outcome(OutcomeKind::Success));
        assert_eq!(round.session_result(), frozen);
        assert_eq!(round.combo(), 0);
    }

    #[test]
    fn zero_life_reads_as_game_over_immediately() {
        let mut round = round();
        for _ in 0..3 {
            round.apply_outcome(OutcomeKind::Fail);
        }

        assert_eq!(round.life(), 0);
        assert_eq!(round.effective_status(), RoundStatus::GameOver);
        round.apply_outcome(OutcomeKind::Fail);
        assert_eq!(round.session_result().failure_count, 3);
    }

    #[test]
    fn phases_stop_at_the_last_ordered_tier() {
        let mut round = round();
        let mut source = labels(Label::Trick, Label::Death);

        let first = run_encounter(&mut round, &mut source, false).unwrap();
        assert!(!first.phase_advanced);
        let second = run_encounter(&mut round, &mut source, false).unwrap();
        assert!(second.phase_advanced);
        assert_eq!(round.tier_index(), 1);
        assert_eq!(round.encounters_completed_in_tier(), 0);

        for _ in 0..9 {
            run_encounter(&mut round, &mut source, false).unwrap();
        }
        assert_eq!(round.phase_number(), 4);
        assert_eq!(round.tier_index(), 1);
        assert!(!round.endless_reached());
        assert_eq!(round.current_tier().phase_encounters, 3);
        assert_eq!(round.speed(), 2.0);
    }

    #[test]
    fn empty_progression_plays_the_endless_tier() {
        let mut round = RoundState::new(GameSettings {
            difficulties: Vec::new(),
            ..settings()
        })
        .unwrap();
        let mut source = labels(Label::Trick, Label::Trick);

        for _ in 0..5 {
            run_encounter(&mut round, &mut source, false).unwrap();
        }
        assert_eq!(round.tier_index(), 0);
        assert!(round.endless_reached());
        assert_eq!(round.phase_number(), 1);
        assert_eq!(round.speed(), 3.0);
    }

    #[test]
    fn single_beat_encounters_keep_the_latched_trigger() {
        let mut round = RoundState::new(GameSettings {
            beats: 1,
            trigger_window: crate::TriggerWindow::new(0, 0),
            life: 2,
            ..settings()
        })
        .unwrap();
        let mut source = labels(Label::Treat, Label::Treat);

        for expected_combo in 1..=5 {
            let report = run_encounter(&mut round, &mut source, true).unwrap();
            assert_eq!(report.outcome, Some(OutcomeKind::Success));
            assert_eq!(round.combo(), expected_combo);
        }
        assert_eq!(round.life(), 2);
        assert_eq!(round.effective_status(), RoundStatus::Game);
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let mut round = round();
        let mut source = labels(Label::Treat, Label::Treat);
        let mut trigger = || false;

        let report = round.tick(f32::INFINITY, &mut source, &mut trigger);
        assert_eq!(report.status, RoundStatus::Game);
        round.tick(f32::NAN, &mut source, &mut trigger);
        round.tick(f32::INFINITY, &mut source, &mut trigger);

        assert_eq!(round.beat_index(), 0);
        let report = run_encounter(&mut round, &mut source, true).unwrap();
        assert_eq!(report.outcome, Some(OutcomeKind::Success));
    }

    #[test]
    fn tier_speed_applies_from_next_encounter() {
        let mut round = round();
        let mut source = labels(Label::Trick, Label::Trick);

        run_encounter(&mut round, &mut source, false).unwrap();
        run_encounter(&mut round, &mut source, false).unwrap();
        assert_eq!(round.speed(), 1.0);

        let mut trigger = || false;
        // Beat 3 of the last encounter at normal speed lasts four ticks.
        for _ in 0..4 {
            round.tick(TICK, &mut source, &mut trigger);
        }
        assert_eq!(round.beat_index(), 0);
        assert_eq!(round.speed(), 2.0);
        assert!((round.beat_duration() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn paused_round_does_not_resolve() {
        let mut round = round();
        let mut source = labels(Label::Treat, Label::Treat);
        let mut trigger = || true;
        round.tick(TICK, &mut source, &mut trigger);
        round.set_speed(0.0);

        for _ in 0..100 {
            let report = round.tick(TICK, &mut source, &mut trigger);
            assert!(!report.beat_triggered);
            assert!(report.outcome.is_none());
        }
        assert_eq!(round.beat_index(), 0);
        assert!(!round.trigger_armed());
    }

    #[test]
    fn scripted_sequence_updates_every_counter() {
        let mut round = RoundState::new(GameSettings {
            life: 5,
            ..settings()
        })
        .unwrap();
        let mut source = ScriptedLabels::new(vec![
            EncounterLabels::new(Label::Treat, Label::Trick),
            EncounterLabels::new(Label::Trick, Label::Trick),
            EncounterLabels::new(Label::Treat, Label::Treat),
            EncounterLabels::new(Label::Trick, Label::Treat),
        ])
        .unwrap();

        let outcomes: Vec<_> = [true, false, false, true]
            .into_iter()
            .filter_map(|pressed| run_encounter(&mut round, &mut source, pressed))
            .filter_map(|report| report.outcome)
            .collect();

        assert_eq!(
            outcomes,
            vec![
                OutcomeKind::Success,
                OutcomeKind::Safe,
                OutcomeKind::Late,
                OutcomeKind::Success
            ]
        );
        let result = round.finish();
        assert_eq!(result.success_count, 2);
        assert_eq!(result.safe_count, 1);
        assert_eq!(result.late_count, 1);
        assert_eq!(result.max_combo, 2);
        assert_eq!(result.total_encounters(), 4);
    }
}
