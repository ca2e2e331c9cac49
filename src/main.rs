//! Pop Rush entry point
//!
//! Runs a headless Speed Mode game with an auto-player and records the result
//! in the high score table.
//!
//! Usage: `pop-rush [pace] [data_dir]`
//! Default data directory: `./pop-rush-data`

use std::path::PathBuf;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use pop_rush::board::BubbleId;
use pop_rush::{HighScores, LoopEvent, Pace, Settings, SpeedSession};

/// How often progress is logged
const REPORT_EVERY: Duration = Duration::from_secs(5);

/// Demo player: pops one random lit bubble per reaction window. It keeps up
/// until the activation interval drops below its reaction time.
struct AutoPlayer {
    rng: Pcg32,
    reaction_ms: u64,
    next_pop_at: Duration,
}

impl AutoPlayer {
    fn new(seed: u64, reaction_ms: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            reaction_ms,
            next_pop_at: Duration::ZERO,
        }
    }

    fn on_tick(&mut self, session: &mut SpeedSession, elapsed: Duration) {
        if elapsed < self.next_pop_at {
            return;
        }

        let lit: Vec<BubbleId> = session
            .board()
            .bubbles()
            .iter()
            .filter(|b| b.lit)
            .map(|b| b.id)
            .collect();
        if lit.is_empty() {
            return;
        }

        let id = lit[self.rng.random_range(0..lit.len())];
        if session.pop(id) {
            log::trace!("Popped bubble {}", id);
        }

        // Some variety so the run doesn't look mechanical
        let jitter = self.rng.random_range(0..=self.reaction_ms / 4);
        self.next_pop_at = elapsed + Duration::from_millis(self.reaction_ms + jitter);
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pop Rush (headless) starting...");

    let mut args = std::env::args().skip(1);
    let pace = args.next().and_then(|arg| {
        let pace = Pace::from_str(&arg);
        if pace.is_none() {
            log::warn!("Unknown pace '{}', keeping saved setting", arg);
        }
        pace
    });
    let data_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pop-rush-data"));
    let settings_path = data_dir.join("settings.json");
    let scores_path = data_dir.join("highscores.json");

    let mut settings = Settings::load(&settings_path);
    if let Some(pace) = pace {
        settings.apply_pace(pace);
        if let Err(err) = settings.save(&settings_path) {
            log::warn!("Could not save settings: {}", err);
        }
    }

    let mut session = match SpeedSession::new(&settings) {
        Ok(session) => session,
        Err(err) => {
            log::error!("Cannot start Speed session: {}", err);
            std::process::exit(1);
        }
    };

    let mut player = AutoPlayer::new(settings.seed.unwrap_or_else(rand::random), 300);
    let mut next_report = REPORT_EVERY;

    session.start();
    log::info!("Pace: {}", settings.pace.as_str());

    while let Some(event) = session.next_event().await {
        match event {
            LoopEvent::Tick { elapsed } => {
                player.on_tick(&mut session, elapsed);
                if elapsed >= next_report {
                    next_report += REPORT_EVERY;
                    let state = session.engine().snapshot();
                    let (lit, total) = {
                        let board = session.board();
                        (board.lit_count(), board.len())
                    };
                    log::info!(
                        "{:>5.1}s  interval {:.2}s  lit {}/{}  pops {}",
                        elapsed.as_secs_f32(),
                        state.interval,
                        lit,
                        total,
                        session.pops()
                    );
                }
            }
            LoopEvent::GameOver => break,
            LoopEvent::ActivateTarget(_) => {}
        }
    }

    let summary = session.summary();
    let mut scores = HighScores::load(&scores_path);
    match scores.add_run(&summary) {
        Some(rank) => {
            log::info!("New high score! Rank #{} with {} points", rank, summary.score);
            if let Err(err) = scores.save(&scores_path) {
                log::error!("Could not save high scores: {}", err);
            }
        }
        None => log::info!(
            "Final score {} (best {})",
            summary.score,
            scores.top_score().unwrap_or(0)
        ),
    }
}
