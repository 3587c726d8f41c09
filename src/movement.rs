//! Per-pair schedules assembled from the pairing topology and the board allocation.
//!
//! A [`Movement`] is never stored: it is rebuilt from its inputs whenever it is needed, and the
//! same inputs always give the same schedule.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::{instrument, trace};

use crate::allocator::{BoardAllocation, BoardAllocator, BoardSupply};
use crate::error::{MovementError, Result};
use crate::pairing::PairingTopology;

/// Position of a pair at its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Seat {
    /// North, keeps the score for the table.
    North,
    /// East.
    East,
}

impl Seat {
    /// The seat across the table.
    pub fn other(self) -> Seat {
        match self {
            Seat::North => Seat::East,
            Seat::East => Seat::North,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::North => write!(f, "N"),
            Seat::East => write!(f, "E"),
        }
    }
}

/// Where and what a pair plays in a round.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Seating {
    /// Opposing pair.
    pub opponent: u32,
    /// Table number, starting at 1.
    pub table: u32,
    /// Seat at the table.
    pub seat: Seat,
    /// Hand numbers played this round.
    pub hands: Vec<u32>,
    /// Other tables play the same hands this round.
    pub is_relay: bool,
}

impl Seating {
    /// Table and seat, e.g. `"3N"`.
    pub fn position(&self) -> String {
        format!("{}{}", self.table, self.seat)
    }
}

/// One round of one pair's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoundRecord {
    /// Round number, starting at 1.
    pub round_no: u32,
    /// `None` when the pair sits out.
    pub seating: Option<Seating>,
}

impl RoundRecord {
    /// Opposing pair, if any.
    pub fn opponent(&self) -> Option<u32> {
        self.seating.as_ref().map(|s| s.opponent)
    }

    /// Table number, if the pair plays.
    pub fn table(&self) -> Option<u32> {
        self.seating.as_ref().map(|s| s.table)
    }

    /// Seat, if the pair plays.
    pub fn seat(&self) -> Option<Seat> {
        self.seating.as_ref().map(|s| s.seat)
    }

    /// Hands played, empty when sitting out.
    pub fn hands(&self) -> &[u32] {
        self.seating
            .as_ref()
            .map(|s| s.hands.as_slice())
            .unwrap_or_default()
    }

    /// Whether the pair sits North this round.
    pub fn is_north(&self) -> bool {
        self.seat() == Some(Seat::North)
    }

    /// Whether the hands are shared with other tables this round.
    pub fn is_relay(&self) -> bool {
        self.seating.as_ref().is_some_and(|s| s.is_relay)
    }

    /// Whether the pair has no opponent this round.
    pub fn is_sit_out(&self) -> bool {
        self.seating.is_none()
    }
}

/// Complete schedule of a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Movement {
    pair_count: u32,
    hands_per_round: u32,
    num_rounds: u32,
    schedules: Vec<Vec<RoundRecord>>,
}

impl Movement {
    /// Builds the movement for `pair_count` pairs playing `hands_per_round` hands per round with
    /// `board_count` physical boards.
    ///
    /// Shorthand for [`MovementBuilder`].
    pub fn build(pair_count: u32, hands_per_round: u32, board_count: u32) -> Result<Movement> {
        MovementBuilder::new(pair_count)
            .with_hands_per_round(hands_per_round)
            .with_board_count(board_count)
            .build()
    }

    /// Number of rounds.
    pub fn num_rounds(&self) -> u32 {
        self.num_rounds
    }

    /// Number of pairs.
    pub fn pair_count(&self) -> u32 {
        self.pair_count
    }

    /// Hands played at a table each round.
    pub fn hands_per_round(&self) -> u32 {
        self.hands_per_round
    }

    /// Number of distinct hands dealt for the event.
    pub fn total_hands(&self) -> u32 {
        self.num_rounds * self.hands_per_round
    }

    /// The rounds of `pair_no`, ordered by round number.
    ///
    /// # Errors
    /// [`MovementError::UnknownPair`] outside of `1..=pair_count`.
    pub fn get_movement(&self, pair_no: u32) -> Result<&[RoundRecord]> {
        pair_no
            .checked_sub(1)
            .and_then(|index| self.schedules.get(index as usize))
            .map(Vec::as_slice)
            .ok_or(MovementError::UnknownPair {
                pair_no,
                pair_count: self.pair_count,
            })
    }

    /// Every `(pair_no, record)` in pair then round order.
    pub fn records(&self) -> impl Iterator<Item = (u32, &RoundRecord)> + '_ {
        self.schedules
            .iter()
            .zip(1..)
            .flat_map(|(rounds, pair_no)| rounds.iter().map(move |record| (pair_no, record)))
    }

    /// Hands on the tables during round `round_no`, sorted.
    pub fn hands_in_round(&self, round_no: u32) -> Vec<u32> {
        let mut hands: Vec<u32> = self
            .records()
            .filter(|(_, record)| record.round_no == round_no)
            .flat_map(|(_, record)| record.hands().iter().copied())
            .collect();
        hands.sort_unstable();
        hands.dedup();
        hands
    }

    fn assemble(
        topology: &PairingTopology,
        allocation: &BoardAllocation,
        hands_per_round: u32,
    ) -> Movement {
        let pair_count = topology.pair_count();
        let num_rounds = topology.rounds();
        let mut schedules: Vec<Vec<RoundRecord>> = (0..pair_count)
            .map(|_| Vec::with_capacity(num_rounds as usize))
            .collect();

        for round in topology.all_rounds() {
            let round_no = round.round + 1;
            for table in &round.matchups {
                let hands = allocation.hands(round.round, table.circle_table);
                let is_relay = allocation.is_relay(table.circle_table);
                for (pair_no, opponent, seat) in [
                    (table.north, table.east, Seat::North),
                    (table.east, table.north, Seat::East),
                ] {
                    schedules[(pair_no - 1) as usize].push(RoundRecord {
                        round_no,
                        seating: Some(Seating {
                            opponent,
                            table: table.table_no,
                            seat,
                            hands: hands.clone(),
                            is_relay,
                        }),
                    });
                }
            }
            if let Some(pair_no) = round.bye {
                schedules[(pair_no - 1) as usize].push(RoundRecord {
                    round_no,
                    seating: None,
                });
            }
        }

        Movement {
            pair_count,
            hands_per_round,
            num_rounds,
            schedules,
        }
    }

    /// Checks every structural invariant of the schedule.
    ///
    /// # Errors
    /// [`MovementError::Inconsistent`] naming the first violation found.
    pub fn verify(&self) -> Result<()> {
        let fail = |reason: String| MovementError::Inconsistent {
            pair_count: self.pair_count,
            reason,
        };
        let max_table = self.pair_count.div_ceil(2);
        // (round, table) -> pairs seated there
        let mut occupancy: BTreeMap<(u32, u32), u32> = BTreeMap::new();
        // (round, hand) -> (relay plays, plain plays)
        let mut per_round: BTreeMap<(u32, u32), (u32, u32)> = BTreeMap::new();
        let mut totals: BTreeMap<u32, u32> = BTreeMap::new();

        for (index, rounds) in self.schedules.iter().enumerate() {
            let pair_no = index as u32 + 1;
            let mut opponents = HashSet::new();
            let mut hands_seen = HashSet::new();

            if rounds.len() as u32 != self.num_rounds {
                return Err(fail(format!(
                    "pair {pair_no} has {} rounds, expected {}",
                    rounds.len(),
                    self.num_rounds
                )));
            }

            for (record, round_no) in rounds.iter().zip(1..) {
                if record.round_no != round_no {
                    return Err(fail(format!(
                        "pair {pair_no} lists round {} in place of round {round_no}",
                        record.round_no
                    )));
                }
                let Some(seating) = &record.seating else {
                    continue;
                };

                if seating.opponent == pair_no || !opponents.insert(seating.opponent) {
                    return Err(fail(format!(
                        "pair {pair_no} meets pair {} more than once",
                        seating.opponent
                    )));
                }
                if seating.table == 0 || seating.table > max_table {
                    return Err(fail(format!(
                        "pair {pair_no} sits at table {} in round {round_no}",
                        seating.table
                    )));
                }
                if seating.hands.len() as u32 != self.hands_per_round {
                    return Err(fail(format!(
                        "pair {pair_no} plays {} hands in round {round_no}",
                        seating.hands.len()
                    )));
                }

                let opposite = self
                    .get_movement(seating.opponent)
                    .ok()
                    .and_then(|rounds| rounds.get(index_of(round_no)))
                    .and_then(|record| record.seating.as_ref());
                let consistent = opposite.is_some_and(|other| {
                    other.opponent == pair_no
                        && other.table == seating.table
                        && other.seat == seating.seat.other()
                        && other.hands == seating.hands
                        && other.is_relay == seating.is_relay
                });
                if !consistent {
                    return Err(fail(format!(
                        "pairs {pair_no} and {} disagree about round {round_no}",
                        seating.opponent
                    )));
                }

                *occupancy.entry((round_no, seating.table)).or_default() += 1;
                for &hand in &seating.hands {
                    if !hands_seen.insert(hand) {
                        return Err(fail(format!("pair {pair_no} plays hand {hand} twice")));
                    }
                    let plays = per_round.entry((round_no, hand)).or_default();
                    if seating.is_relay {
                        plays.0 += 1;
                    } else {
                        plays.1 += 1;
                    }
                    *totals.entry(hand).or_default() += 1;
                }
            }

            if opponents.len() as u32 != self.pair_count - 1 {
                return Err(fail(format!(
                    "pair {pair_no} meets {} of {} other pairs",
                    opponents.len(),
                    self.pair_count - 1
                )));
            }
        }

        let crowded = occupancy.iter().find(|(_, seated)| **seated != 2);
        if let Some(((round_no, table), seated)) = crowded {
            return Err(fail(format!(
                "table {table} hosts {seated} pairs in round {round_no}"
            )));
        }

        for (&(round_no, hand), &(relay, plain)) in &per_round {
            if relay > 0 && plain > 0 {
                return Err(fail(format!(
                    "hand {hand} is both relayed and played plainly in round {round_no}"
                )));
            }
            if relay > 0 && (relay <= 2 || relay % 2 != 0) {
                return Err(fail(format!(
                    "relay hand {hand} is played {relay} times in round {round_no}"
                )));
            }
            if plain > 0 && plain != 2 {
                return Err(fail(format!(
                    "hand {hand} is played {plain} times in round {round_no}"
                )));
            }
        }

        if totals.len() as u32 != self.total_hands() {
            return Err(fail(format!(
                "{} of {} hands are played",
                totals.len(),
                self.total_hands()
            )));
        }
        let mut counts = totals.iter();
        if let Some((_, &expected)) = counts.next() {
            if let Some((hand, played)) = counts.find(|(_, played)| **played != expected) {
                return Err(fail(format!(
                    "hand {hand} is played {played} times, hand 1 is played {expected} times"
                )));
            }
        }

        Ok(())
    }
}

fn index_of(round_no: u32) -> usize {
    (round_no - 1) as usize
}

/// Builder for a [`Movement`].
///
/// # Example
///
/// ```
/// use pair_movement::movement::MovementBuilder;
///
/// let movement = MovementBuilder::new(8)
///     .with_hands_per_round(3)
///     .with_board_count(12)
///     .build()
///     .unwrap();
/// assert_eq!(movement.num_rounds(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct MovementBuilder {
    pair_count: u32,
    hands_per_round: u32,
    supply: BoardSupply,
}

impl MovementBuilder {
    /// Starts a movement for `pair_count` pairs, one hand per round and as many boards as the
    /// tables need.
    #[must_use]
    pub fn new(pair_count: u32) -> Self {
        Self {
            pair_count,
            hands_per_round: 1,
            supply: BoardSupply::Unlimited,
        }
    }

    /// Hands played at each table every round.
    #[must_use]
    pub fn with_hands_per_round(mut self, hands_per_round: u32) -> Self {
        self.hands_per_round = hands_per_round;
        self
    }

    /// Number of physical boards available.
    #[must_use]
    pub fn with_board_count(mut self, board_count: u32) -> Self {
        self.supply = BoardSupply::Physical(board_count);
        self
    }

    /// Lifts the board limit: every table gets its own set whenever the schedule allows it.
    #[must_use]
    pub fn with_unlimited_boards(mut self) -> Self {
        self.supply = BoardSupply::Unlimited;
        self
    }

    /// Generates and checks the movement.
    ///
    /// # Errors
    /// A configuration error for invalid inputs, [`MovementError::Inconsistent`] if the generated
    /// schedule fails its own checks.
    #[instrument(skip_all, fields(pairs = self.pair_count, hands = self.hands_per_round))]
    pub fn build(self) -> Result<Movement> {
        let topology = PairingTopology::new(self.pair_count)?;
        if self.hands_per_round == 0 {
            return Err(MovementError::NoHandsPerRound);
        }
        if self.supply == BoardSupply::Physical(0) {
            return Err(MovementError::NoBoards);
        }

        let allocation =
            BoardAllocator::new(&topology, self.hands_per_round, self.supply).allocate()?;
        trace!(
            rounds = topology.rounds(),
            board_sets = allocation.board_sets_in_play(),
            supply = ?self.supply
        );

        let movement = Movement::assemble(&topology, &allocation, self.hands_per_round);
        movement.verify()?;
        Ok(movement)
    }
}

#[cfg(test)]
mod movement_tests {
    use super::*;

    #[test]
    fn test_seat_display() {
        assert_eq!(Seat::North.to_string(), "N");
        assert_eq!(Seat::East.other(), Seat::North);
    }

    #[test]
    fn test_unknown_pair() {
        let movement = Movement::build(4, 2, 8).unwrap();
        assert!(movement.get_movement(0).is_err());
        assert!(matches!(
            movement.get_movement(5),
            Err(MovementError::UnknownPair { pair_no: 5, pair_count: 4 })
        ));
    }

    #[test]
    fn test_verify_detects_tampering() {
        let mut movement = Movement::build(6, 2, 12).unwrap();
        let total_hands = movement.total_hands();
        if let Some(seating) = movement.schedules[0][0].seating.as_mut() {
            seating.hands[0] = seating.hands[0] % total_hands + 1;
        }
        let err = movement.verify().unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_sit_out_record() {
        let movement = Movement::build(5, 1, 5).unwrap();
        let rounds = movement.get_movement(3).unwrap();
        let sit_outs: Vec<_> = rounds.iter().filter(|r| r.is_sit_out()).collect();
        assert_eq!(sit_outs.len(), 1);
        assert!(sit_outs[0].hands().is_empty());
        assert_eq!(sit_outs[0].opponent(), None);
        assert!(!sit_outs[0].is_north());
    }

    #[test]
    fn test_position() {
        let movement = Movement::build(2, 1, 1).unwrap();
        let record = &movement.get_movement(1).unwrap()[0];
        assert_eq!(record.seating.as_ref().unwrap().position(), "1E");
    }
}
