//! Pop Rush - bubble-popping arcade game engine
//!
//! Core modules:
//! - `speed`: Speed Mode activation loop (difficulty curve, random activation, lifecycle)
//! - `board`: Bubble board owned by the host, and the snapshot contract the loop reads
//! - `session`: Headless host that drives a Speed run end to end
//! - `settings`: Player preferences and loop tuning
//! - `highscores`: Top Speed runs
//! - `persistence`: JSON file storage

pub mod board;
pub mod highscores;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod speed;

pub use board::{Board, Bubble, BubbleId, SharedBoard, TargetSource};
pub use highscores::HighScores;
pub use session::{RunSummary, SpeedSession};
pub use settings::{Pace, Settings};
pub use speed::{
    ActivationLoop, ActivationState, ActivationTarget, LoopEvent, LoopStatus, SpeedTuning,
};

/// Game configuration constants
pub mod consts {
    /// Loop heartbeat period (ms)
    pub const TICK_MS: u64 = 50;

    /// Length of one difficulty phase (seconds)
    pub const PHASE_DURATION_SECS: f32 = 3.0;

    /// Activation interval at the start of a run (seconds)
    pub const INITIAL_INTERVAL_SECS: f32 = 1.5;
    /// Interval reduction per completed phase (seconds)
    pub const INTERVAL_STEP_SECS: f32 = 0.05;
    /// Interval never drops below this, so the loop always makes progress
    pub const MIN_INTERVAL_SECS: f32 = 0.1;
    /// Upper bound accepted for any tuned duration (seconds)
    pub const MAX_TUNED_SECS: f32 = 3600.0;

    /// Delay before the first activation of a fresh run (ms)
    pub const START_DELAY_MS: u64 = 1000;
    /// Delay before the first activation after a resume (ms)
    pub const RESUME_DELAY_MS: u64 = 100;

    /// Bubbles on a Speed board
    pub const DEFAULT_BUBBLE_COUNT: usize = 50;

    /// Score: points per tenth of a second survived
    pub const POINTS_PER_DECISECOND: u64 = 1;
    /// Score: points per popped bubble
    pub const POINTS_PER_POP: u64 = 10;
}
