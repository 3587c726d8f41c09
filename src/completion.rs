//! Checks that every hand a movement expects has been scored.
//!
//! Scores are entered by the North pair of each table, so a hand counts as scored for a round
//! when the North pair of that round has a score recorded for it.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::movement::{Movement, Seat};

/// Hands already scored, keyed by the pair that sat North.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoredHands {
    by_north: BTreeMap<u32, BTreeSet<u32>>,
}

impl ScoredHands {
    /// No scores yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `ns_pair` entered a score for `hand`.
    pub fn insert(&mut self, ns_pair: u32, hand: u32) {
        self.by_north.entry(ns_pair).or_default().insert(hand);
    }

    /// Whether `ns_pair` entered a score for `hand`.
    pub fn contains(&self, ns_pair: u32, hand: u32) -> bool {
        self.by_north
            .get(&ns_pair)
            .is_some_and(|hands| hands.contains(&hand))
    }

    /// Number of scored `(pair, hand)` entries.
    pub fn len(&self) -> usize {
        self.by_north.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing has been scored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds from `(ns_pair, hand)` rows.
impl FromIterator<(u32, u32)> for ScoredHands {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        let mut scored = ScoredHands::new();
        for (ns_pair, hand) in iter {
            scored.insert(ns_pair, hand);
        }
        scored
    }
}

/// A hand that should have been scored but was not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MissingHand {
    /// Round the hand is played in.
    pub round_no: u32,
    /// Table the hand is played at.
    pub table: u32,
    /// Pair expected to enter the score.
    pub north_pair: u32,
    /// Hand number.
    pub hand: u32,
}

impl Movement {
    /// Every expected score absent from `scored`, ordered by round, then table, then hand.
    pub fn unscored_hands(&self, scored: &ScoredHands) -> Vec<MissingHand> {
        let mut missing: Vec<MissingHand> = self
            .records()
            .filter_map(|(pair_no, record)| {
                Some((pair_no, record.round_no, record.seating.as_ref()?))
            })
            .filter(|(_, _, seating)| seating.seat == Seat::North)
            .flat_map(|(pair_no, round_no, seating)| {
                seating
                    .hands
                    .iter()
                    .filter(move |&&hand| !scored.contains(pair_no, hand))
                    .map(move |&hand| MissingHand {
                        round_no,
                        table: seating.table,
                        north_pair: pair_no,
                        hand,
                    })
            })
            .collect();
        missing.sort_unstable();
        debug!(missing = missing.len(), scored = scored.len(), "completion check");
        missing
    }

    /// Whether every hand of the movement has been scored.
    pub fn is_fully_scored(&self, scored: &ScoredHands) -> bool {
        self.unscored_hands(scored).is_empty()
    }
}
