//! Round-robin opponent schedule built with the circle method.
//!
//! The field is padded to an even size `M` (a phantom pair is added when the number of pairs is
//! odd). Positions `0..M-1` sit on a circle that rotates by one every round while position
//! `M-1`, the anchor, stays put. In round `r`:
//!
//! - circle table 0 seats the anchor against position `r`
//! - circle table `i` seats positions `r + i` and `r - i` (mod `M - 1`)
//!
//! Two positions `a` and `b` meet exactly once, in the round where `a + b = 2r (mod M - 1)`,
//! so `M - 1` rounds cover every matchup. When the anchor is the phantom, its opponent sits the
//! round out.

use crate::error::{MovementError, Result};
use crate::movement::Seat;

/// One table of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matchup {
    /// Index of the table on the circle (0 is the anchor table).
    pub circle_table: usize,
    /// Printed table number.
    pub table_no: u32,
    /// Pair seated North.
    pub north: u32,
    /// Pair seated East.
    pub east: u32,
}

impl Matchup {
    /// Opponent of `pair_no` at this table, with the seat `pair_no` occupies.
    pub fn seat_of(&self, pair_no: u32) -> Option<(u32, Seat)> {
        if self.north == pair_no {
            Some((self.east, Seat::North))
        } else if self.east == pair_no {
            Some((self.north, Seat::East))
        } else {
            None
        }
    }
}

/// All tables of one round, plus the pair sitting out if the field is odd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPairings {
    /// 0-based round index.
    pub round: u32,
    /// Tables in circle order.
    pub matchups: Vec<Matchup>,
    /// Pair without an opponent this round.
    pub bye: Option<u32>,
}

/// Opponent, table and seat schedule for a field of pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingTopology {
    pair_count: u32,
    circle_size: u32,
}

impl PairingTopology {
    /// Creates the topology for `pair_count` pairs.
    ///
    /// # Errors
    /// [`MovementError::TooFewPairs`] when fewer than two pairs are given.
    pub fn new(pair_count: u32) -> Result<Self> {
        if pair_count < 2 {
            return Err(MovementError::TooFewPairs(pair_count));
        }
        Ok(Self {
            pair_count,
            circle_size: pair_count + pair_count % 2,
        })
    }

    /// Number of real pairs.
    pub fn pair_count(&self) -> u32 {
        self.pair_count
    }

    /// Whether a phantom pair was added to even out the field.
    pub fn has_phantom(&self) -> bool {
        self.circle_size != self.pair_count
    }

    /// Number of rounds needed for every pair to meet every other pair.
    pub fn rounds(&self) -> u32 {
        self.circle_size - 1
    }

    /// Number of tables on the circle, including the phantom one.
    pub fn circle_tables(&self) -> usize {
        (self.circle_size / 2) as usize
    }

    /// Circle tables where two real pairs meet, in circle order.
    pub fn playing_tables(&self) -> Vec<usize> {
        let first = usize::from(self.has_phantom());
        (first..self.circle_tables()).collect()
    }

    /// Printed table number of a playing circle table.
    pub fn table_no(&self, circle_table: usize) -> u32 {
        if self.has_phantom() {
            circle_table as u32
        } else {
            circle_table as u32 + 1
        }
    }

    fn pair_at(&self, position: u32) -> Option<u32> {
        let pair_no = position + 1;
        (pair_no <= self.pair_count).then_some(pair_no)
    }

    /// Tables of round `round` (0-based).
    pub fn round(&self, round: u32) -> RoundPairings {
        let rounds = self.rounds();
        let anchor = rounds;
        let mut matchups = Vec::with_capacity(self.circle_tables());
        let mut bye = None;

        for circle_table in 0..self.circle_tables() {
            let i = circle_table as u32;
            let (north, east) = if i == 0 {
                if round % 2 == 0 {
                    (anchor, round)
                } else {
                    (round, anchor)
                }
            } else {
                let up = (round + i) % rounds;
                let down = (round + rounds - i) % rounds;
                if i % 2 == 1 {
                    (up, down)
                } else {
                    (down, up)
                }
            };

            match (self.pair_at(north), self.pair_at(east)) {
                (Some(north), Some(east)) => matchups.push(Matchup {
                    circle_table,
                    table_no: self.table_no(circle_table),
                    north,
                    east,
                }),
                (Some(alone), None) | (None, Some(alone)) => bye = Some(alone),
                (None, None) => {}
            }
        }

        RoundPairings {
            round,
            matchups,
            bye,
        }
    }

    /// Every round of the schedule, in order.
    pub fn all_rounds(&self) -> impl Iterator<Item = RoundPairings> + '_ {
        (0..self.rounds()).map(|round| self.round(round))
    }
}

#[cfg(test)]
mod pairing_tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_too_few_pairs() {
        assert_eq!(PairingTopology::new(1), Err(MovementError::TooFewPairs(1)));
        assert_eq!(PairingTopology::new(0), Err(MovementError::TooFewPairs(0)));
    }

    #[test]
    fn test_two_pairs() {
        let topology = PairingTopology::new(2).unwrap();
        assert_eq!(topology.rounds(), 1);
        let round = topology.round(0);
        assert_eq!(round.bye, None);
        assert_eq!(round.matchups.len(), 1);
        let table = round.matchups[0];
        assert_eq!(table.table_no, 1);
        assert_eq!(table.seat_of(1), Some((2, Seat::East)));
        assert_eq!(table.seat_of(2), Some((1, Seat::North)));
    }

    #[test]
    fn test_every_pair_meets_every_other_once() {
        for pair_count in 2..=16 {
            let topology = PairingTopology::new(pair_count).unwrap();
            let mut met = HashSet::new();
            for round in topology.all_rounds() {
                let mut seated = HashSet::new();
                for table in &round.matchups {
                    assert!(seated.insert(table.north));
                    assert!(seated.insert(table.east));
                    let key = (table.north.min(table.east), table.north.max(table.east));
                    assert!(met.insert(key), "{key:?} met twice with {pair_count} pairs");
                }
                if let Some(bye) = round.bye {
                    assert!(seated.insert(bye));
                }
                assert_eq!(seated.len() as u32, pair_count);
            }
            assert_eq!(met.len() as u32, pair_count * (pair_count - 1) / 2);
        }
    }

    #[test]
    fn test_odd_field_sits_out_once() {
        let topology = PairingTopology::new(7).unwrap();
        assert_eq!(topology.rounds(), 7);
        assert_eq!(topology.playing_tables(), vec![1, 2, 3]);
        let mut byes: Vec<u32> = topology.all_rounds().filter_map(|r| r.bye).collect();
        byes.sort_unstable();
        assert_eq!(byes, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_table_numbers_stay_in_range() {
        for pair_count in 2..=15 {
            let topology = PairingTopology::new(pair_count).unwrap();
            let max_table = pair_count.div_ceil(2);
            for round in topology.all_rounds() {
                for table in round.matchups {
                    assert!((1..=max_table).contains(&table.table_no));
                }
            }
        }
    }

    #[test]
    fn test_seats_are_roughly_balanced() {
        let topology = PairingTopology::new(10).unwrap();
        for pair_no in 1..=10 {
            let north = topology
                .all_rounds()
                .flat_map(|r| r.matchups)
                .filter(|t| t.north == pair_no)
                .count();
            assert!((3..=6).contains(&north), "pair {pair_no} is North {north} times");
        }
    }
}
