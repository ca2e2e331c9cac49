//! Bubble board
//!
//! The host owns the bubbles. The activation loop never holds on to them: it
//! asks a [`TargetSource`] for a snapshot each time it needs to pick one, and
//! tolerates that snapshot being a tick behind.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable bubble identifier
pub type BubbleId = u32;

/// A single bubble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bubble {
    pub id: BubbleId,
    /// Visible and tappable
    pub lit: bool,
    /// Popped at least once this run
    pub cleared: bool,
}

impl Bubble {
    pub fn new(id: BubbleId) -> Self {
        Self {
            id,
            lit: false,
            cleared: false,
        }
    }

    /// Candidate for activation
    pub fn is_idle(&self) -> bool {
        !self.lit
    }
}

/// Pick a random idle bubble, or `None` when every bubble is lit.
pub fn pick_idle<R: Rng + ?Sized>(bubbles: &[Bubble], rng: &mut R) -> Option<BubbleId> {
    let idle: Vec<BubbleId> = bubbles
        .iter()
        .filter(|b| b.is_idle())
        .map(|b| b.id)
        .collect();

    match idle.len() {
        0 => None,
        1 => Some(idle[0]),
        n => Some(idle[rng.random_range(0..n)]),
    }
}

/// Supplies the current bubbles to the activation loop
pub trait TargetSource: Send + Sync {
    fn snapshot(&self) -> Vec<Bubble>;
}

/// The full set of bubbles for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    bubbles: Vec<Bubble>,
}

impl Board {
    /// Create a board of `count` idle bubbles with ids `0..count`
    pub fn new(count: usize) -> Self {
        Self {
            bubbles: (0..count as BubbleId).map(Bubble::new).collect(),
        }
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn get(&self, id: BubbleId) -> Option<&Bubble> {
        self.bubbles.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BubbleId) -> Option<&mut Bubble> {
        self.bubbles.iter_mut().find(|b| b.id == id)
    }

    pub fn lit_count(&self) -> usize {
        self.bubbles.iter().filter(|b| b.lit).count()
    }

    /// Every bubble is lit (nothing left to activate)
    pub fn is_full(&self) -> bool {
        self.bubbles.iter().all(|b| b.lit)
    }

    /// Light a bubble. Returns false for unknown ids and bubbles that are
    /// already lit, so repeated activations are harmless.
    pub fn activate(&mut self, id: BubbleId) -> bool {
        match self.get_mut(id) {
            Some(bubble) if !bubble.lit => {
                bubble.lit = true;
                true
            }
            _ => false,
        }
    }

    /// Light a random idle bubble
    pub fn activate_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<BubbleId> {
        let id = pick_idle(&self.bubbles, rng)?;
        self.activate(id);
        Some(id)
    }

    /// Pop a lit bubble. It goes dark and can be lit again later.
    pub fn pop(&mut self, id: BubbleId) -> bool {
        match self.get_mut(id) {
            Some(bubble) if bubble.lit => {
                bubble.lit = false;
                bubble.cleared = true;
                true
            }
            _ => false,
        }
    }

    /// Return every bubble to idle
    pub fn clear(&mut self) {
        for bubble in &mut self.bubbles {
            *bubble = Bubble::new(bubble.id);
        }
    }
}

/// Board handle shared between the host and the activation loop
#[derive(Debug, Clone, Default)]
pub struct SharedBoard(Arc<Mutex<Board>>);

impl SharedBoard {
    pub fn new(board: Board) -> Self {
        Self(Arc::new(Mutex::new(board)))
    }

    /// Lock the board. A panic in another holder never leaves the bubbles
    /// half-written, so a poisoned lock is still usable.
    pub fn lock(&self) -> MutexGuard<'_, Board> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TargetSource for SharedBoard {
    fn snapshot(&self) -> Vec<Bubble> {
        self.lock().bubbles.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_pick_last_idle_bubble() {
        let mut board = Board::new(50);
        for id in 0..50 {
            if id != 17 {
                board.activate(id);
            }
        }

        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(pick_idle(board.bubbles(), &mut rng), Some(17));
        }
    }

    #[test]
    fn test_pick_none_when_full() {
        let mut board = Board::new(5);
        for id in 0..5 {
            board.activate(id);
        }
        assert!(board.is_full());

        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(pick_idle(board.bubbles(), &mut rng), None);
        assert_eq!(board.activate_random(&mut rng), None);
    }

    #[test]
    fn test_pick_only_idle() {
        let mut board = Board::new(10);
        for id in [0, 2, 4, 6, 8] {
            board.activate(id);
        }

        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..100 {
            let id = pick_idle(board.bubbles(), &mut rng).unwrap();
            assert!(id % 2 == 1, "picked lit bubble {id}");
        }
    }

    #[test]
    fn test_activate_is_idempotent() {
        let mut board = Board::new(3);
        assert!(board.activate(1));
        assert!(!board.activate(1));
        assert!(!board.activate(99));
        assert_eq!(board.lit_count(), 1);
    }

    #[test]
    fn test_pop_relights() {
        let mut board = Board::new(3);
        assert!(!board.pop(0), "idle bubble cannot be popped");

        board.activate(0);
        assert!(board.pop(0));
        let bubble = board.get(0).unwrap();
        assert!(!bubble.lit);
        assert!(bubble.cleared);

        // Popped bubbles are idle again and can be re-lit
        assert!(board.activate(0));
    }

    #[test]
    fn test_shared_snapshot() {
        let shared = SharedBoard::new(Board::new(4));
        shared.lock().activate(2);

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.len(), 4);
        assert!(snapshot[2].lit);

        shared.lock().clear();
        assert_eq!(shared.lock().lit_count(), 0);
    }
}
