//! Speed Mode activation loop
//!
//! One tokio task per running loop. The task owns the working
//! [`ActivationState`] and publishes a copy after every iteration; pause and
//! stop abort the task and wait for it, so nothing is emitted once they return.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

use super::events::{ActivationTarget, EventSender, LoopError, LoopEvent, LoopEvents};
use super::state::{ActivationState, LoopStatus, SpeedTuning};
use super::tick::advance;
use crate::board::{TargetSource, pick_idle};

/// Drives random bubble activations at an accelerating cadence
pub struct ActivationLoop {
    tuning: SpeedTuning,
    source: Arc<dyn TargetSource>,
    seed: u64,
    /// Runs spawned so far, mixed into the RNG seed
    runs: u64,
    events: EventSender,
    receiver: Option<LoopEvents>,
    state: Arc<watch::Sender<ActivationState>>,
    running: Arc<AtomicBool>,
    paused: bool,
    task: Option<JoinHandle<()>>,
}

impl ActivationLoop {
    pub fn new(
        tuning: SpeedTuning,
        source: Arc<dyn TargetSource>,
        seed: u64,
    ) -> Result<Self, LoopError> {
        tuning.validate()?;
        let (events, receiver) = EventSender::channel();
        let (state, _) = watch::channel(ActivationState::new(&tuning));

        Ok(Self {
            tuning,
            source,
            seed,
            runs: 0,
            events,
            receiver: Some(receiver),
            state: Arc::new(state),
            running: Arc::new(AtomicBool::new(false)),
            paused: false,
            task: None,
        })
    }

    /// Take the event receiver. Only one subscriber is ever handed out.
    pub fn subscribe(&mut self) -> Result<LoopEvents, LoopError> {
        self.receiver.take().ok_or(LoopError::AlreadySubscribed)
    }

    pub fn tuning(&self) -> &SpeedTuning {
        &self.tuning
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn status(&self) -> LoopStatus {
        if self.is_running() {
            LoopStatus::Running
        } else if self.paused {
            LoopStatus::Paused
        } else {
            LoopStatus::Stopped
        }
    }

    /// Latest published state
    pub fn snapshot(&self) -> ActivationState {
        *self.state.borrow()
    }

    /// Follow published states as the loop runs
    pub fn watch_state(&self) -> watch::Receiver<ActivationState> {
        self.state.subscribe()
    }

    /// Start the loop. Does nothing if it is already running, or if nobody
    /// has taken the event receiver yet.
    ///
    /// With `reset_elapsed` the run starts over from default state and the
    /// first activation comes after the start delay. Without it the current
    /// state is kept and the first activation comes after the shorter resume
    /// delay; a finished (terminal) run is not restarted this way.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, reset_elapsed: bool) {
        if self.receiver.is_some() {
            log::warn!("Activation loop has no subscriber, start ignored");
            return;
        }
        if self.running.swap(true, Ordering::AcqRel) {
            log::debug!("Activation loop already running, start ignored");
            return;
        }

        let (state, delay) = if reset_elapsed {
            self.events.bump_generation();
            (ActivationState::new(&self.tuning), self.tuning.start_delay())
        } else {
            (self.snapshot(), self.tuning.resume_delay())
        };

        if state.terminal {
            self.running.store(false, Ordering::Release);
            log::debug!("Activation loop finished, reset before starting again");
            return;
        }

        self.state.send_replace(state);
        self.paused = false;
        self.runs += 1;

        // Left over from a run that ended itself
        if let Some(finished) = self.task.take() {
            finished.abort();
        }

        let ctx = RunContext {
            tuning: self.tuning,
            source: Arc::clone(&self.source),
            events: self.events.clone(),
            generation: self.events.generation(),
            running: Arc::clone(&self.running),
            state: Arc::clone(&self.state),
            rng: Pcg32::seed_from_u64(self.seed.wrapping_add(self.runs)),
        };
        self.task = Some(tokio::spawn(run(ctx, state, delay)));

        log::info!(
            "Activation loop started (fresh: {}, interval {:.2}s, phase {})",
            reset_elapsed,
            state.interval,
            state.phases_completed
        );
    }

    /// Cancel the loop. Safe to call in any state.
    pub async fn stop(&mut self) {
        self.halt().await;
        self.paused = false;
    }

    /// Cancel the loop, keeping elapsed time and interval for `resume`
    pub async fn pause(&mut self) {
        if !self.is_running() {
            log::debug!("Activation loop not running, pause ignored");
            return;
        }
        self.halt().await;
        // The run may have ended while we were cancelling it
        self.paused = !self.snapshot().terminal;
        if self.paused {
            log::info!("Activation loop paused");
        }
    }

    /// Continue a paused loop
    pub fn resume(&mut self) {
        if !self.paused {
            log::debug!("Activation loop not paused, resume ignored");
            return;
        }
        self.start(false);
    }

    /// Stop, restore default state and discard pending events
    pub async fn reset(&mut self) {
        self.stop().await;
        self.events.bump_generation();
        self.state.send_replace(ActivationState::new(&self.tuning));
        log::info!("Activation loop reset");
    }

    /// Activate a bubble outside the random schedule. Only honoured while
    /// running; returns whether the event was sent.
    pub fn trigger_manual_activation(&self, target: ActivationTarget) -> bool {
        if !self.is_running() {
            log::debug!("Manual activation {:?} ignored, loop not running", target);
            return false;
        }
        self.events.send(LoopEvent::ActivateTarget(target))
    }

    async fn halt(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(err) = task.await
                && err.is_panic()
            {
                log::error!("Activation loop task panicked: {}", err);
            }
        }
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for ActivationLoop {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct RunContext {
    tuning: SpeedTuning,
    source: Arc<dyn TargetSource>,
    events: EventSender,
    generation: u64,
    running: Arc<AtomicBool>,
    state: Arc<watch::Sender<ActivationState>>,
    rng: Pcg32,
}

impl RunContext {
    fn emit(&self, event: LoopEvent) -> bool {
        let delivered = self.events.send_as(self.generation, event);
        if !delivered {
            log::warn!("Loop event consumer dropped, stopping activation loop");
        }
        delivered
    }

    fn publish(&self, state: ActivationState) {
        self.state.send_replace(state);
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        // A panicking iteration must not leave the loop looking alive
        if std::thread::panicking() {
            log::error!("Activation loop task panicked, marking loop stopped");
            self.running.store(false, Ordering::Release);
        }
    }
}

async fn run(mut ctx: RunContext, mut state: ActivationState, first_delay: Duration) {
    let mut last_tick = Instant::now();
    let mut force_activation = true;

    sleep(first_delay).await;

    loop {
        let now = Instant::now();
        let dt = now.saturating_duration_since(last_tick);
        last_tick = now;

        let outcome = advance(&mut state, &ctx.tuning, dt);
        if outcome.phase_advanced {
            log::debug!(
                "Phase {} complete, interval now {:.2}s",
                state.phases_completed,
                state.interval
            );
        }

        if force_activation || outcome.activation_due {
            force_activation = false;
            match pick_idle(&ctx.source.snapshot(), &mut ctx.rng) {
                Some(id) => {
                    state.record_activation(id);
                    log::trace!("Activating bubble {}", id);
                    if !ctx.emit(LoopEvent::ActivateTarget(ActivationTarget::Bubble(id))) {
                        break;
                    }
                }
                None => {
                    state.terminal = true;
                    ctx.publish(state);
                    // Cleared before GameOver goes out so the host can start
                    // a new run as soon as it sees it
                    ctx.running.store(false, Ordering::Release);
                    log::info!(
                        "All bubbles lit after {:.1}s, game over",
                        state.run_elapsed.as_secs_f32()
                    );
                    ctx.emit(LoopEvent::GameOver);
                    return;
                }
            }
        }

        ctx.publish(state);

        if !ctx.emit(LoopEvent::Tick {
            elapsed: state.run_elapsed,
        }) {
            break;
        }

        sleep(ctx.tuning.tick_period()).await;

        if !ctx.running.load(Ordering::Acquire) {
            break;
        }
    }

    ctx.publish(state);
    ctx.running.store(false, Ordering::Release);
}
