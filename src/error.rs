//! Errors returned while building a movement.
//!
//! Every failure is a deterministic function of the inputs: asking again with the same
//! parameters gives the same error. Use [`MovementError::is_configuration`] to tell a rejected
//! request apart from a defect in the generator itself.

use thiserror::Error;

use crate::factory::AlgorithmVersion;

/// Why a movement could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MovementError {
    /// Fewer than two pairs registered.
    #[error("number of pairs must be > 1, was {0}")]
    TooFewPairs(u32),

    /// Zero hands per round requested.
    #[error("number of hands per round must be > 0")]
    NoHandsPerRound,

    /// Zero physical boards.
    #[error("number of boards must be > 0")]
    NoBoards,

    /// Not even one table can be supplied with a full set of hands.
    #[error(
        "{board_count} boards cannot supply {hands_per_round} hands per round to {pair_count} pairs"
    )]
    NoBalancedAllocation {
        /// Number of pairs requested.
        pair_count: u32,
        /// Hands dealt to each table every round.
        hands_per_round: u32,
        /// Physical boards available.
        board_count: u32,
    },

    /// Fewer boards than rounds, when the board count is the number of hands dealt.
    #[error("{board_count} boards cannot deal one hand to each of {rounds} rounds")]
    TooFewBoards {
        /// Boards recorded for the tournament.
        board_count: u32,
        /// Rounds the pairs need to meet each other once.
        rounds: u32,
    },

    /// The stored version tag does not name any known algorithm.
    #[error("unknown movement version {0:?}")]
    UnknownVersion(String),

    /// The selected algorithm needs an explicit number of hands per round.
    #[error("movement version {0} requires the number of hands per round")]
    MissingHandsPerRound(AlgorithmVersion),

    /// Queried a pair number outside of `1..=pair_count`.
    #[error("pair {pair_no} is not part of a {pair_count} pair movement")]
    UnknownPair {
        /// The pair asked for.
        pair_no: u32,
        /// Pairs in the movement.
        pair_count: u32,
    },

    /// A generated movement broke one of its own invariants.
    #[error("inconsistent movement for {pair_count} pairs: {reason}")]
    Inconsistent {
        /// Pairs in the movement.
        pair_count: u32,
        /// First violated invariant.
        reason: String,
    },
}

impl MovementError {
    /// `true` when the inputs were invalid or unsupported. These requests should be rejected,
    /// never retried.
    pub fn is_configuration(&self) -> bool {
        !self.is_internal()
    }

    /// `true` when the generator produced a schedule that failed its own checks.
    pub fn is_internal(&self) -> bool {
        matches!(self, MovementError::Inconsistent { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MovementError>;
