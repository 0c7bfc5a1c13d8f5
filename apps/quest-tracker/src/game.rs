//! Three-slot dice roll mini-game.

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};

/// Minimum time a roll spins before it settles.
pub const SETTLE_AFTER: Duration = Duration::from_millis(1600);
const MIN_REVEAL_MS: u64 = 500;
const MAX_REVEAL_MS: u64 = 1500;

/// Symbol shown in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Star,
    Heart,
    Question,
}

impl Symbol {
    pub const ALL: [Symbol; 3] = [Symbol::Star, Symbol::Heart, Symbol::Question];

    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Star => "★",
            Self::Heart => "♥",
            Self::Question => "?",
        }
    }
}

/// Result of a settled roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

#[derive(Debug, Clone)]
struct PendingRoll {
    started: Instant,
    targets: [Symbol; 3],
    delays: [Duration; 3],
}

/// Slot machine state. Slots keep their last symbols between rolls.
#[derive(Debug, Clone)]
pub struct SlotMachine {
    slots: [Symbol; 3],
    pending: Option<PendingRoll>,
    last_outcome: Option<Outcome>,
}

impl Default for SlotMachine {
    fn default() -> Self {
        Self {
            slots: [Symbol::Star, Symbol::Heart, Symbol::Question],
            pending: None,
            last_outcome: None,
        }
    }
}

impl SlotMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current slot symbols.
    pub fn slots(&self) -> [Symbol; 3] {
        self.slots
    }

    /// Whether a roll is in flight.
    pub fn is_rolling(&self) -> bool {
        self.pending.is_some()
    }

    /// Which slots have stopped on their new symbol.
    pub fn revealed(&self, now: Instant) -> [bool; 3] {
        match &self.pending {
            Some(p) => {
                let elapsed = now.saturating_duration_since(p.started);
                p.delays.map(|d| elapsed >= d)
            }
            None => [true; 3],
        }
    }

    /// Outcome of the most recent settled roll.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Start a roll. Returns false if one is already in flight.
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R, now: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }

        let mut pick = || *Symbol::ALL.choose(rng).unwrap_or(&Symbol::Star);
        let targets = [pick(), pick(), pick()];
        let delays = [(); 3].map(|_| Duration::from_millis(rng.gen_range(MIN_REVEAL_MS..=MAX_REVEAL_MS)));

        tracing::debug!(?targets, ?delays, "roll started");
        self.pending = Some(PendingRoll {
            started: now,
            targets,
            delays,
        });
        self.last_outcome = None;
        true
    }

    /// Advance the roll. Returns the outcome once it settles.
    pub fn tick(&mut self, now: Instant) -> Option<Outcome> {
        let pending = self.pending.as_ref()?;
        let elapsed = now.saturating_duration_since(pending.started);

        for (slot, (target, delay)) in self
            .slots
            .iter_mut()
            .zip(pending.targets.iter().zip(pending.delays.iter()))
        {
            if elapsed >= *delay {
                *slot = *target;
            }
        }

        let longest = pending.delays.iter().max().copied().unwrap_or_default();
        if elapsed < SETTLE_AFTER.max(longest) {
            return None;
        }

        self.pending = None;
        let outcome = if self.slots[0] == self.slots[1] && self.slots[1] == self.slots[2] {
            Outcome::Win
        } else {
            Outcome::Lose
        };
        tracing::info!(?outcome, slots = ?self.slots, "roll settled");
        self.last_outcome = Some(outcome);
        Some(outcome)
    }
}
