use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;
use tricktreat_core::{
    GameSettings, ImprovedMetrics, Label, RandomLabeler, RoundState, RoundStatus,
    SessionHistory, SessionResult, TrickTreatError,
};

fn main() -> tricktreat_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            settings,
            seed,
            sessions,
            accuracy,
            delta,
            max_ticks,
        } => {
            let settings = load_settings(settings.as_deref())?;
            let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
            let player = AutoPlayer::new(accuracy)?;
            run_simulation(&settings, seed, sessions, player, delta, max_ticks)
        }
        Commands::CheckSettings { path } => check_settings(&path),
    }
}

fn load_settings(path: Option<&Path>) -> tricktreat_core::Result<GameSettings> {
    match path {
        Some(path) => GameSettings::load(path),
        None => {
            let settings = GameSettings::default();
            settings.validate()?;
            Ok(settings)
        }
    }
}

fn run_simulation(
    settings: &GameSettings,
    seed: u64,
    sessions: u32,
    player: AutoPlayer,
    delta: f32,
    max_ticks: u64,
) -> tricktreat_core::Result<()> {
    if !delta.is_finite() || delta <= 0.0 {
        return Err(TrickTreatError::msg(format!(
            "tick delta must be positive, got {delta}"
        )));
    }
    tracing::info!(seed, sessions, accuracy = player.accuracy, delta, "starting simulation");

    let mut labels = RandomLabeler::new(ChaCha8Rng::seed_from_u64(seed));
    let mut player_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut history = SessionHistory::new();

    for session in 0..sessions {
        let mut round = RoundState::new(settings.clone())?;
        let mut press = false;
        let mut ticks = 0;

        while round.effective_status() != RoundStatus::GameOver && ticks < max_ticks {
            let mut trigger = || press;
            let report = round.tick(delta, &mut labels, &mut trigger);
            ticks += 1;

            if report.beat_triggered && report.beat_index == 0 && report.status == RoundStatus::Game
            {
                let treat = round.labels().is_some_and(|l| l.contains(Label::Treat));
                press = player.decide(treat, &mut player_rng);
            }
            if report.phase_advanced {
                tracing::info!(
                    session,
                    phase = round.phase_number(),
                    endless = round.endless_reached(),
                    speed = round.current_tier().speed,
                    "next phase"
                );
            }
        }

        if round.effective_status() != RoundStatus::GameOver {
            tracing::warn!(session, ticks, "tick limit reached before game over");
        }
        let result = round.finish();
        let improved = history.add_result(result);
        log_result(session, &result, improved);
    }

    tracing::info!(
        sessions = history.len(),
        best_max_combo = ?history.best_max_combo(),
        best_success = ?history.best_success_count(),
        best_non_misses = ?history.best_total_non_misses(),
        ever_treated_death = history.ever_treated_death(),
        "simulation finished"
    );
    Ok(())
}

fn log_result(session: u32, result: &SessionResult, improved: ImprovedMetrics) {
    tracing::info!(
        session,
        encounters = result.total_encounters(),
        success = result.success_count,
        safe = result.safe_count,
        late = result.late_count,
        fail = result.failure_count,
        max_combo = result.max_combo,
        treated_death = result.treated_death,
        %improved,
        "session finished"
    );
}

fn check_settings(path: &Path) -> tricktreat_core::Result<()> {
    let settings = GameSettings::load(path)?;
    let progression = settings.progression()?;
    tracing::info!(
        ?path,
        bpm = settings.bpm,
        beats = settings.beats,
        window = ?settings.trigger_window.as_range(),
        life = settings.life,
        revive_combo = settings.revive_combo,
        "settings are valid"
    );
    for (index, tier) in progression.ordered().iter().enumerate() {
        tracing::info!(
            index,
            encounters = tier.phase_encounters,
            speed = tier.speed,
            treat = tier.treat_rate,
            trick = tier.trick_rate,
            death = tier.death_rate(),
            "tier"
        );
    }
    let endless = progression.endless();
    tracing::info!(
        encounters = endless.phase_encounters,
        speed = endless.speed,
        treat = endless.treat_rate,
        trick = endless.trick_rate,
        death = endless.death_rate(),
        "endless tier"
    );
    Ok(())
}

/// Scripted stand-in for a player. Presses for a Treat with probability
/// `accuracy` and guesses on other encounters far less often.
#[derive(Debug, Clone, Copy)]
struct AutoPlayer {
    accuracy: f64,
}

impl AutoPlayer {
    fn new(accuracy: f64) -> tricktreat_core::Result<Self> {
        if !(0.0..=1.0).contains(&accuracy) {
            return Err(TrickTreatError::msg(format!(
                "accuracy must be within [0, 1], got {accuracy}"
            )));
        }
        Ok(Self { accuracy })
    }

    fn decide(&self, treat_showing: bool, rng: &mut impl Rng) -> bool {
        let chance = if treat_showing {
            self.accuracy
        } else {
            (1.0 - self.accuracy) * 0.25
        };
        rng.gen_bool(chance)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the Trick or Beat engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play sessions with an automated player and report the results.
    Simulate {
        /// JSON settings file. Built-in settings are used when omitted.
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Seed for labels and player decisions.
        #[arg(long)]
        seed: Option<u64>,
        /// Number of sessions to play.
        #[arg(short = 'n', long, default_value_t = 3)]
        sessions: u32,
        /// Chance of pressing when a Treat is showing.
        #[arg(short, long, default_value_t = 0.85)]
        accuracy: f64,
        /// Fixed tick length in seconds.
        #[arg(long, default_value_t = 0.02)]
        delta: f32,
        /// Upper bound on ticks per session.
        #[arg(long, default_value_t = 200_000)]
        max_ticks: u64,
    },
    /// Validate a settings file and print its tier table.
    CheckSettings {
        /// Path to the JSON settings file.
        path: PathBuf,
    },
}
