//! Per-tick difficulty progression
//!
//! Pure function of the previous state and the wall-clock delta, so a late
//! tick simply catches up on the next call.

use std::time::Duration;

use super::state::{ActivationState, SpeedTuning};

/// What a single tick decided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A difficulty phase completed this tick
    pub phase_advanced: bool,
    /// Time since the last activation has reached the interval
    pub activation_due: bool,
}

/// Advance the activation state by `dt` of active play time
pub fn advance(state: &mut ActivationState, tuning: &SpeedTuning, dt: Duration) -> TickOutcome {
    if state.terminal {
        return TickOutcome::default();
    }

    state.run_elapsed += dt;
    state.phase_elapsed += dt.as_secs_f32();

    let mut outcome = TickOutcome::default();

    if state.phase_elapsed >= tuning.phase_duration {
        state.phases_completed += 1;
        state.phase_elapsed = 0.0;
        // min() keeps the interval from widening if tuning changed mid-run
        state.interval = state
            .interval
            .min(tuning.interval_for_phase(state.phases_completed));
        outcome.phase_advanced = true;
    }

    outcome.activation_due = state.since_activation() >= state.interval_duration();
    outcome
}
