//! Speed Mode state and tuning
//!
//! `ActivationState` is owned by the running loop task; everything else only
//! ever sees published copies of it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::BubbleId;
use crate::consts::*;

/// Lifecycle of an activation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStatus {
    /// Not running. Initial state, and where a finished run ends up
    Stopped,
    /// Task alive and ticking
    Running,
    /// Task cancelled, state kept for resume
    Paused,
}

/// Invalid tuning values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick period must be non-zero")]
    ZeroTick,
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("{name} must be at most {max}s, got {value}")]
    TooLarge {
        name: &'static str,
        value: f32,
        max: f32,
    },
    #[error("interval step must not be negative, got {0}")]
    NegativeStep(f32),
    #[error("minimum interval {min}s exceeds initial interval {initial}s")]
    MinAboveInitial { min: f32, initial: f32 },
    #[error("board needs at least one bubble")]
    NoBubbles,
}

/// Difficulty curve and timing constants for the activation loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedTuning {
    /// Heartbeat period (ms)
    pub tick_ms: u64,
    /// Length of one difficulty phase (seconds)
    pub phase_duration: f32,
    /// Interval between activations at the start of a run (seconds)
    pub initial_interval: f32,
    /// Interval reduction per completed phase (seconds)
    pub interval_step: f32,
    /// Interval floor (seconds)
    pub min_interval: f32,
    /// First activation delay on a fresh start (ms)
    pub start_delay_ms: u64,
    /// First activation delay on resume (ms)
    pub resume_delay_ms: u64,
}

impl Default for SpeedTuning {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            phase_duration: PHASE_DURATION_SECS,
            initial_interval: INITIAL_INTERVAL_SECS,
            interval_step: INTERVAL_STEP_SECS,
            min_interval: MIN_INTERVAL_SECS,
            start_delay_ms: START_DELAY_MS,
            resume_delay_ms: RESUME_DELAY_MS,
        }
    }
}

impl SpeedTuning {
    /// Check the invariants the loop relies on to make progress
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        for (name, value) in [
            ("phase duration", self.phase_duration),
            ("initial interval", self.initial_interval),
            ("minimum interval", self.min_interval),
        ] {
            // Negated so NaN is rejected too
            if !(value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
            if !(value <= MAX_TUNED_SECS) {
                return Err(ConfigError::TooLarge {
                    name,
                    value,
                    max: MAX_TUNED_SECS,
                });
            }
        }
        if !(self.interval_step >= 0.0) {
            return Err(ConfigError::NegativeStep(self.interval_step));
        }
        if !(self.interval_step <= MAX_TUNED_SECS) {
            return Err(ConfigError::TooLarge {
                name: "interval step",
                value: self.interval_step,
                max: MAX_TUNED_SECS,
            });
        }
        if self.min_interval > self.initial_interval {
            return Err(ConfigError::MinAboveInitial {
                min: self.min_interval,
                initial: self.initial_interval,
            });
        }
        Ok(())
    }

    /// Interval after `phases` completed phases, clamped to the floor
    pub fn interval_for_phase(&self, phases: u32) -> f32 {
        (self.initial_interval - phases as f32 * self.interval_step).max(self.min_interval)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }
}

/// Current difficulty and timing of a Speed run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationState {
    /// Seconds between activations
    pub interval: f32,
    /// Seconds into the current difficulty phase
    pub phase_elapsed: f32,
    /// Completed difficulty phases
    pub phases_completed: u32,
    /// Most recently activated bubble
    pub last_target: Option<BubbleId>,
    /// Active play time (paused time excluded)
    pub run_elapsed: Duration,
    /// `run_elapsed` at the last activation
    pub last_activation_at: Option<Duration>,
    /// Every bubble was lit; only a reset or fresh start clears this
    pub terminal: bool,
}

impl Default for ActivationState {
    fn default() -> Self {
        Self::new(&SpeedTuning::default())
    }
}

impl ActivationState {
    pub fn new(tuning: &SpeedTuning) -> Self {
        Self {
            interval: tuning.initial_interval,
            phase_elapsed: 0.0,
            phases_completed: 0,
            last_target: None,
            run_elapsed: Duration::ZERO,
            last_activation_at: None,
            terminal: false,
        }
    }

    /// Active time since the last activation (or since the run began)
    pub fn since_activation(&self) -> Duration {
        self.run_elapsed
            .saturating_sub(self.last_activation_at.unwrap_or(Duration::ZERO))
    }

    /// Interval as a `Duration`; out-of-range values saturate instead of panicking
    pub fn interval_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.interval.clamp(0.0, MAX_TUNED_SECS))
            .unwrap_or(Duration::ZERO)
    }

    pub fn record_activation(&mut self, id: BubbleId) {
        self.last_target = Some(id);
        self.last_activation_at = Some(self.run_elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = ActivationState::default();
        assert_eq!(state.interval, 1.5);
        assert_eq!(state.phases_completed, 0);
        assert_eq!(state.phase_elapsed, 0.0);
        assert!(!state.terminal);
        assert_eq!(state.last_target, None);
    }

    #[test]
    fn test_interval_for_phase_clamps() {
        let tuning = SpeedTuning::default();
        assert!((tuning.interval_for_phase(3) - 1.35).abs() < 1e-5);
        assert_eq!(tuning.interval_for_phase(1000), tuning.min_interval);
    }

    #[test]
    fn test_validate() {
        assert_eq!(SpeedTuning::default().validate(), Ok(()));

        let zero_tick = SpeedTuning {
            tick_ms: 0,
            ..Default::default()
        };
        assert_eq!(zero_tick.validate(), Err(ConfigError::ZeroTick));

        let no_floor = SpeedTuning {
            min_interval: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            no_floor.validate(),
            Err(ConfigError::NonPositive { name: "minimum interval", .. })
        ));

        let nan_phase = SpeedTuning {
            phase_duration: f32::NAN,
            ..Default::default()
        };
        assert!(nan_phase.validate().is_err());

        let huge = SpeedTuning {
            initial_interval: 1e20,
            ..Default::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::TooLarge { name: "initial interval", .. })
        ));

        let endless_phase = SpeedTuning {
            phase_duration: f32::INFINITY,
            ..Default::default()
        };
        assert!(matches!(
            endless_phase.validate(),
            Err(ConfigError::TooLarge { .. })
        ));

        let inverted = SpeedTuning {
            min_interval: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::MinAboveInitial { .. })
        ));
    }

    #[test]
    fn test_interval_duration_saturates() {
        let mut state = ActivationState::default();
        state.interval = 1e20;
        assert_eq!(
            state.interval_duration(),
            Duration::from_secs_f32(MAX_TUNED_SECS)
        );

        state.interval = f32::NAN;
        assert_eq!(state.interval_duration(), Duration::ZERO);
    }

    #[test]
    fn test_since_activation() {
        let mut state = ActivationState::default();
        state.run_elapsed = Duration::from_millis(1200);
        assert_eq!(state.since_activation(), Duration::from_millis(1200));

        state.record_activation(4);
        state.run_elapsed += Duration::from_millis(300);
        assert_eq!(state.since_activation(), Duration::from_millis(300));
        assert_eq!(state.last_target, Some(4));
    }
}
