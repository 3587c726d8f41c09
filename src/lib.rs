//! # Pair Movement
//!
//! Movement generation for duplicate pair card-game tournaments (bridge, tichu).
//!
//! Pairs sit at numbered tables for a sequence of rounds. At each table two pairs play a set of
//! hands, and every result is later compared with the results of all other pairs who played the
//! same hand. The *movement* is the schedule that makes this comparison valid: for each pair and
//! each round, its opponent, table, seat and hands.
//!
//! It provides:
//! - A circle-method round robin where every pair meets every other pair once
//!   ([`pairing`])
//! - Hand allocation that never shows a pair the same hand twice, plays every hand equally often
//!   and groups tables into relays when boards run short ([`allocator`])
//! - The assembled, self-checked [`Movement`](crate::movement::Movement) and its query surface
//!   ([`movement`])
//! - A completion check against the scores already entered ([`completion`])
//! - Version dispatch so stored tournaments always regenerate the movement they were created with
//!   ([`factory`])
//!
//! Generation is pure and deterministic. Nothing is persisted: the same inputs rebuild the same
//! movement on every request.
//!
//! # Usage Example
//!
//! ```
//! use pair_movement::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let factory = MovementFactory::new(Configuration::from_env());
//!
//!     // 9 pairs, 2 hands per round, 8 boards
//!     let request = MovementRequest::new(9, 8).with_hands_per_round(2);
//!     let movement = factory.create(&request)?;
//!
//!     for record in movement.get_movement(1)? {
//!         match &record.seating {
//!             Some(seating) => println!(
//!                 "round {}: {} vs pair {}, hands {:?}",
//!                 record.round_no,
//!                 seating.position(),
//!                 seating.opponent,
//!                 seating.hands
//!             ),
//!             None => println!("round {}: sit out", record.round_no),
//!         }
//!     }
//!
//!     // nothing has been scored yet
//!     assert!(!movement.is_fully_scored(&ScoredHands::new()));
//!     Ok(())
//! }
//! ```
//!
//! # Odd number of pairs
//!
//! With an odd number of pairs, one pair sits out each round and every pair sits out exactly
//! once. Its record for that round has no seating and no hands.
#![warn(missing_docs)]

pub use anyhow;
pub mod allocator;
pub mod completion;
pub mod configuration;
pub mod error;
pub mod factory;
mod logger;
pub mod movement;
pub mod pairing;

/// Commonly used types for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use pair_movement::prelude::*;
/// ```
///
/// Includes:
/// - [`Configuration`](crate::configuration::Configuration)
/// - [`MovementFactory`](crate::factory::MovementFactory) and its request and version types
/// - [`Movement`](crate::movement::Movement) and its records
/// - [`ScoredHands`](crate::completion::ScoredHands) for completion checks
pub mod prelude {
    pub use crate::completion::{MissingHand, ScoredHands};
    pub use crate::configuration::Configuration;
    pub use crate::error::MovementError;
    pub use crate::factory::{AlgorithmVersion, MovementFactory, MovementRequest};
    pub use crate::movement::{Movement, MovementBuilder, RoundRecord, Seat, Seating};
}
