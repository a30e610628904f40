//! RNG module - bag random piece generation
//!
//! Upcoming pieces come from shuffled "bags": each bag holds one of each of the
//! seven kinds in random order. Whenever fewer than
//! [`QUEUE_REFILL_THRESHOLD`](crate::types::QUEUE_REFILL_THRESHOLD) pieces
//! remain, a whole new bag is appended, so the next piece is always known and
//! every kind appears once per seven draws.
//!
//! Also provides a simple LCG so a seed reproduces a whole match.

use std::collections::VecDeque;

use crate::types::{PieceKind, QUEUE_REFILL_THRESHOLD};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        // High bits of an LCG are far better distributed than the low ones.
        (self.next_u32() >> 16) % max.max(1)
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }
}

/// Bag-refilled queue of upcoming pieces.
#[derive(Debug, Clone)]
pub struct PieceQueue {
    upcoming: VecDeque<PieceKind>,
    rng: SimpleRng,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u32) -> Self {
        Self::with_rng(SimpleRng::new(seed))
    }

    pub fn with_rng(rng: SimpleRng) -> Self {
        let mut queue = Self {
            upcoming: VecDeque::with_capacity(QUEUE_REFILL_THRESHOLD + PieceKind::ALL.len()),
            rng,
        };
        queue.top_up();
        queue
    }

    /// Append shuffled bags until at least the refill threshold is queued.
    fn top_up(&mut self) {
        while self.upcoming.len() < QUEUE_REFILL_THRESHOLD {
            let mut bag = PieceKind::ALL;
            self.rng.shuffle(&mut bag);
            self.upcoming.extend(bag);
        }
    }

    /// Peek at the next piece without removing it
    pub fn peek(&self) -> PieceKind {
        // top_up() runs after every draw, so the queue is never empty here.
        self.upcoming.front().copied().unwrap_or(PieceKind::I)
    }

    /// Draw the next piece from the queue
    pub fn draw(&mut self) -> PieceKind {
        self.top_up();
        let piece = self.upcoming.pop_front().unwrap_or(PieceKind::I);
        self.top_up();
        piece
    }

    /// Pieces currently queued, next first.
    pub fn upcoming(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.upcoming.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.upcoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upcoming.is_empty()
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
