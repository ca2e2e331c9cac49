//! Loop events and the single-consumer channel that carries them
//!
//! Every event is stamped with the generation it was produced in. A reset
//! bumps the generation, and the receiver silently drops anything older, which
//! is how pending events are discarded without touching the receiver.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::state::ConfigError;
use crate::board::BubbleId;

/// Which bubble an activation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationTarget {
    Bubble(BubbleId),
    /// Host picks any idle bubble
    Random,
}

/// Published by the activation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// Heartbeat, carrying active play time so far
    Tick { elapsed: Duration },
    ActivateTarget(ActivationTarget),
    /// Every bubble is lit; the loop has stopped itself
    GameOver,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoopError {
    #[error("loop events already have a subscriber")]
    AlreadySubscribed,
    #[error("invalid tuning: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug)]
struct Envelope {
    generation: u64,
    event: LoopEvent,
}

/// Producer side, shared by the loop task and manual triggers
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: UnboundedSender<Envelope>,
    generation: Arc<AtomicU64>,
}

impl EventSender {
    pub(crate) fn channel() -> (EventSender, LoopEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        (
            EventSender {
                tx,
                generation: Arc::clone(&generation),
            },
            LoopEvents { rx, generation },
        )
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate everything sent so far
    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Send in the current generation. False once the consumer is gone.
    pub(crate) fn send(&self, event: LoopEvent) -> bool {
        self.send_as(self.generation(), event)
    }

    pub(crate) fn send_as(&self, generation: u64, event: LoopEvent) -> bool {
        self.tx.send(Envelope { generation, event }).is_ok()
    }
}

/// The one receiver of a loop's events
#[derive(Debug)]
pub struct LoopEvents {
    rx: UnboundedReceiver<Envelope>,
    generation: Arc<AtomicU64>,
}

impl LoopEvents {
    fn is_current(&self, envelope: &Envelope) -> bool {
        let current = self.generation.load(Ordering::Acquire);
        if envelope.generation != current {
            log::trace!(
                "Dropping stale {:?} (generation {} < {})",
                envelope.event,
                envelope.generation,
                current
            );
            return false;
        }
        true
    }

    /// Wait for the next current event. `None` once the loop is dropped.
    pub async fn recv(&mut self) -> Option<LoopEvent> {
        loop {
            let envelope = self.rx.recv().await?;
            if self.is_current(&envelope) {
                return Some(envelope.event);
            }
        }
    }

    /// Next current event if one is already queued
    pub fn try_recv(&mut self) -> Option<LoopEvent> {
        while let Ok(envelope) = self.rx.try_recv() {
            if self.is_current(&envelope) {
                return Some(envelope.event);
            }
        }
        None
    }

    /// Everything currently queued
    pub fn drain(&mut self) -> Vec<LoopEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_generation_dropped() {
        let (tx, mut rx) = EventSender::channel();
        assert!(tx.send(LoopEvent::ActivateTarget(ActivationTarget::Bubble(1))));
        assert!(tx.send(LoopEvent::GameOver));

        tx.bump_generation();
        assert!(tx.send(LoopEvent::ActivateTarget(ActivationTarget::Random)));

        assert_eq!(
            rx.drain(),
            vec![LoopEvent::ActivateTarget(ActivationTarget::Random)]
        );
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = EventSender::channel();
        drop(rx);
        assert!(!tx.send(LoopEvent::GameOver));
    }

    #[tokio::test]
    async fn test_recv_in_order() {
        let (tx, mut rx) = EventSender::channel();
        let generation = tx.generation();
        tx.send_as(generation, LoopEvent::ActivateTarget(ActivationTarget::Bubble(3)));
        tx.send_as(
            generation,
            LoopEvent::Tick {
                elapsed: Duration::from_millis(50),
            },
        );

        assert_eq!(
            rx.recv().await,
            Some(LoopEvent::ActivateTarget(ActivationTarget::Bubble(3)))
        );
        assert_eq!(
            rx.recv().await,
            Some(LoopEvent::Tick {
                elapsed: Duration::from_millis(50)
            })
        );
    }
}
