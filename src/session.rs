//! Speed Mode session
//!
//! Headless host for one board and one activation loop. It is the loop's only
//! event consumer: activations light bubbles, ticks update the clock, and
//! GameOver freezes input.

use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::board::{Board, BubbleId, SharedBoard};
use crate::consts::{POINTS_PER_DECISECOND, POINTS_PER_POP};
use crate::settings::Settings;
use crate::speed::{ActivationLoop, ActivationTarget, LoopError, LoopEvent, LoopEvents, LoopStatus};

/// End-of-run numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub score: u64,
    /// Active play time survived
    pub elapsed: Duration,
    pub pops: u32,
}

impl RunSummary {
    pub fn compute(elapsed: Duration, pops: u32) -> Self {
        let deciseconds = (elapsed.as_millis() / 100) as u64;
        Self {
            score: deciseconds * POINTS_PER_DECISECOND + pops as u64 * POINTS_PER_POP,
            elapsed,
            pops,
        }
    }
}

/// One Speed Mode board driven by its own activation loop
pub struct SpeedSession {
    board: SharedBoard,
    engine: ActivationLoop,
    events: LoopEvents,
    /// Resolves `ActivationTarget::Random`
    rng: Pcg32,
    elapsed: Duration,
    pops: u32,
    over: bool,
}

impl SpeedSession {
    pub fn new(settings: &Settings) -> Result<Self, LoopError> {
        settings.validate()?;

        let seed = settings.seed.unwrap_or_else(rand::random);
        let board = SharedBoard::new(Board::new(settings.bubble_count));
        let mut engine = ActivationLoop::new(settings.tuning(), Arc::new(board.clone()), seed)?;
        let events = engine.subscribe()?;

        log::info!(
            "Speed session ready: {} bubbles, pace {}, seed {}",
            settings.bubble_count,
            settings.pace.as_str(),
            seed
        );

        Ok(Self {
            board,
            engine,
            events,
            rng: Pcg32::seed_from_u64(seed.rotate_left(32)),
            elapsed: Duration::ZERO,
            pops: 0,
            over: false,
        })
    }

    pub fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock()
    }

    pub fn engine(&self) -> &ActivationLoop {
        &self.engine
    }

    pub fn status(&self) -> LoopStatus {
        self.engine.status()
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn pops(&self) -> u32 {
        self.pops
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::compute(self.elapsed, self.pops)
    }

    fn clear_run(&mut self) {
        self.board.lock().clear();
        self.elapsed = Duration::ZERO;
        self.pops = 0;
        self.over = false;
    }

    /// Begin a run on screen entry. Ignored while a run is in progress.
    pub fn start(&mut self) {
        if self.engine.is_running() {
            log::debug!("Speed run already in progress");
            return;
        }
        self.clear_run();
        self.engine.start(true);
    }

    /// Throw away the current run and start a new one
    pub async fn restart(&mut self) {
        self.engine.reset().await;
        self.clear_run();
        self.engine.start(true);
    }

    /// App went to the background or the pause menu opened
    pub async fn pause(&mut self) {
        self.engine.pause().await;
    }

    pub fn resume(&mut self) {
        if self.over {
            return;
        }
        self.engine.resume();
    }

    pub async fn stop(&mut self) {
        self.engine.stop().await;
    }

    /// Force an activation outside the loop's schedule
    pub fn trigger(&self, target: ActivationTarget) -> bool {
        self.engine.trigger_manual_activation(target)
    }

    /// Wait for the next loop event and apply it
    pub async fn next_event(&mut self) -> Option<LoopEvent> {
        let event = self.events.recv().await?;
        self.apply(event);
        Some(event)
    }

    /// Apply every event already queued, returning how many there were
    pub fn poll_events(&mut self) -> usize {
        let events = self.events.drain();
        for event in &events {
            self.apply(*event);
        }
        events.len()
    }

    pub fn apply(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Tick { elapsed } => {
                self.elapsed = elapsed;
            }
            LoopEvent::ActivateTarget(_) if self.over => {}
            LoopEvent::ActivateTarget(ActivationTarget::Bubble(id)) => {
                if !self.board.lock().activate(id) {
                    log::debug!("Bubble {} already lit", id);
                }
            }
            LoopEvent::ActivateTarget(ActivationTarget::Random) => {
                if self.board.lock().activate_random(&mut self.rng).is_none() {
                    log::debug!("No idle bubble for random activation");
                }
            }
            LoopEvent::GameOver => {
                self.over = true;
                self.elapsed = self.engine.snapshot().run_elapsed;
                let summary = self.summary();
                log::info!(
                    "Speed run over: {} points, {:.1}s, {} pops",
                    summary.score,
                    summary.elapsed.as_secs_f32(),
                    summary.pops
                );
            }
        }
    }

    /// Pop a lit bubble. Refused while paused, stopped or after GameOver.
    pub fn pop(&mut self, id: BubbleId) -> bool {
        if self.over || !self.engine.is_running() {
            return false;
        }
        let popped = self.board.lock().pop(id);
        if popped {
            self.pops += 1;
        }
        popped
    }
}
