//! Speed Mode activation engine
//!
//! Bubbles light up at random at an interval that shrinks every phase; the
//! run ends when every bubble is lit at once.
//! - `state`: tuning constants and the loop's working state
//! - `tick`: pure per-tick progression
//! - `events`: what the loop publishes, and the single-consumer channel
//! - `engine`: the tokio task and its lifecycle

pub mod engine;
pub mod events;
pub mod state;
pub mod tick;

pub use engine::ActivationLoop;
pub use events::{ActivationTarget, LoopError, LoopEvent, LoopEvents};
pub use state::{ActivationState, ConfigError, LoopStatus, SpeedTuning};
pub use tick::{TickOutcome, advance};
