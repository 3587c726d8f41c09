//! Assignment of hand groups to tables.
//!
//! Hands are dealt in groups of `hands_per_round`: group `g` holds hands `g*h + 1 ..= g*h + h`,
//! and there is one group per round. Each playing circle table `t` gets an offset `o_t` and
//! plays group `(r + o_t) mod R` in round `r`, so over the whole event every table plays every
//! group exactly once and all hands are played equally often.
//!
//! Tables sharing an offset play the same group in the same round: they form a relay cluster.
//! The number of distinct offsets is the number of board sets that have to be on the tables at
//! once, and is capped by the physical supply.
//!
//! A pair at distance `d` from the rotating position of the round sits at circle table `|d|`,
//! which makes the groups it sees `p + o_0` (table 0) and `p + o_i -/+ i`. A pair never sees a
//! group twice iff all of `o_0, o_i - i, o_i + i` are distinct mod `R`; the search below picks
//! offsets under that constraint.
//!
//! The search runs in two passes. The first tries unused offsets before shared ones and accepts
//! any number of board sets up to the supply, which finds a good allocation within a few nodes.
//! The second looks for exactly one more set at a time, from the supply downwards, each attempt
//! on its own [`ATTEMPT_BUDGET`] and all of them within [`SEARCH_BUDGET`]. Node counts, not
//! time, bound the search, so the same inputs always give the same allocation.

use tracing::{debug, trace, warn};

use crate::error::{MovementError, Result};
use crate::pairing::PairingTopology;

/// Search nodes spent trying to improve on the first allocation, over all attempts.
///
/// Part of the algorithm: changing it changes generated movements.
pub const SEARCH_BUDGET: usize = 250_000;

/// Search nodes allowed for a single attempt at a number of board sets.
///
/// Part of the algorithm: changing it changes generated movements.
pub const ATTEMPT_BUDGET: usize = 25_000;

/// How many boards can be on the tables at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardSupply {
    /// Exactly this many physical boards exist.
    Physical(u32),
    /// As many boards as the tables need.
    Unlimited,
}

impl BoardSupply {
    /// Number of complete hand groups the supply can hold.
    fn groups(&self, hands_per_round: u32, tables: usize) -> usize {
        match self {
            BoardSupply::Physical(boards) => ((boards / hands_per_round) as usize).min(tables),
            BoardSupply::Unlimited => tables,
        }
    }
}

/// Which hands each table plays in each round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardAllocation {
    rounds: u32,
    hands_per_round: u32,
    offsets: Vec<Option<u32>>,
    cluster_sizes: Vec<usize>,
}

impl BoardAllocation {
    fn new(
        rounds: u32,
        hands_per_round: u32,
        circle_tables: usize,
        placed: &[(usize, u32)],
    ) -> Self {
        let mut offsets = vec![None; circle_tables];
        for &(table, offset) in placed {
            offsets[table] = Some(offset);
        }
        let cluster_sizes = offsets
            .iter()
            .map(|offset| match offset {
                Some(offset) => offsets.iter().filter(|o| **o == Some(*offset)).count(),
                None => 0,
            })
            .collect();
        Self {
            rounds,
            hands_per_round,
            offsets,
            cluster_sizes,
        }
    }

    /// Hand group played at `circle_table` in 0-based `round`, `None` for the phantom table.
    pub fn group(&self, round: u32, circle_table: usize) -> Option<u32> {
        let offset = (*self.offsets.get(circle_table)?)?;
        Some((round + offset) % self.rounds)
    }

    /// Hand numbers played at `circle_table` in 0-based `round`.
    pub fn hands(&self, round: u32, circle_table: usize) -> Vec<u32> {
        match self.group(round, circle_table) {
            Some(group) => {
                let first = group * self.hands_per_round + 1;
                (first..first + self.hands_per_round).collect()
            }
            None => vec![],
        }
    }

    /// Whether the table shares its hands with at least one other table every round.
    pub fn is_relay(&self, circle_table: usize) -> bool {
        self.cluster_sizes.get(circle_table).is_some_and(|size| *size > 1)
    }

    /// Number of tables playing the same hands as `circle_table`, itself included.
    pub fn cluster_size(&self, circle_table: usize) -> usize {
        self.cluster_sizes.get(circle_table).copied().unwrap_or(0)
    }

    /// Distinct board sets on the tables during any round.
    pub fn board_sets_in_play(&self) -> usize {
        let mut offsets: Vec<u32> = self.offsets.iter().flatten().copied().collect();
        offsets.sort_unstable();
        offsets.dedup();
        offsets.len()
    }

    /// Total number of distinct hands over the event.
    pub fn total_hands(&self) -> u32 {
        self.rounds * self.hands_per_round
    }
}

/// Chooses table offsets for a topology under a board supply.
#[derive(Debug)]
pub struct BoardAllocator<'a> {
    topology: &'a PairingTopology,
    hands_per_round: u32,
    supply: BoardSupply,
}

impl<'a> BoardAllocator<'a> {
    /// Creates an allocator for `topology` dealing `hands_per_round` hands to each table.
    pub fn new(topology: &'a PairingTopology, hands_per_round: u32, supply: BoardSupply) -> Self {
        Self {
            topology,
            hands_per_round,
            supply,
        }
    }

    /// Picks the offsets, preferring as many separate board sets as the supply allows.
    ///
    /// # Errors
    /// [`MovementError::NoHandsPerRound`] for zero hands, and
    /// [`MovementError::NoBalancedAllocation`] when the supply cannot hold a single group.
    pub fn allocate(&self) -> Result<BoardAllocation> {
        if self.hands_per_round == 0 {
            return Err(MovementError::NoHandsPerRound);
        }
        let tables = self.topology.playing_tables();
        let rounds = self.topology.rounds();
        let max_sets = self.supply.groups(self.hands_per_round, tables.len());
        if max_sets == 0 {
            let board_count = match self.supply {
                BoardSupply::Physical(boards) => boards,
                BoardSupply::Unlimited => 0,
            };
            return Err(MovementError::NoBalancedAllocation {
                pair_count: self.topology.pair_count(),
                hands_per_round: self.hands_per_round,
                board_count,
            });
        }

        let mut search = OffsetSearch::new(rounds, &tables);

        // fresh offsets first: quick, and never worse than a single shared set
        let mut placed = (1..=max_sets)
            .rev()
            .find_map(|limit| search.run(limit, Fit::AtMost, ATTEMPT_BUDGET))
            .unwrap_or_else(|| tables.iter().map(|&table| (table, 0)).collect());
        let mut board_sets = distinct_offsets(&placed);
        debug!(
            board_sets,
            max_sets,
            nodes = search.nodes,
            "first allocation for {} tables",
            tables.len()
        );

        let mut spent = 0;
        for sets in (board_sets + 1..=max_sets).rev() {
            let budget = ATTEMPT_BUDGET.min(SEARCH_BUDGET - spent);
            if budget == 0 {
                warn!(
                    board_sets,
                    max_sets,
                    "offset search budget exhausted for {} pairs",
                    self.topology.pair_count()
                );
                break;
            }
            let start = search.nodes;
            let found = search.run(sets, Fit::Exactly, budget);
            spent += search.nodes - start;
            if let Some(found) = found {
                placed = found;
                board_sets = sets;
                break;
            }
            trace!(sets, nodes = search.nodes - start, "no offsets found");
        }
        debug!(board_sets, nodes = search.nodes, "board sets allocated");

        Ok(BoardAllocation::new(
            rounds,
            self.hands_per_round,
            self.topology.circle_tables(),
            &placed,
        ))
    }
}

fn distinct_offsets(placed: &[(usize, u32)]) -> usize {
    let mut offsets: Vec<u32> = placed.iter().map(|&(_, offset)| offset).collect();
    offsets.sort_unstable();
    offsets.dedup();
    offsets.len()
}

/// How the number of distinct offsets must relate to the requested number of board sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    AtMost,
    Exactly,
}

/// Depth-first offset search, widest table first, trying unused offsets before shared ones.
struct OffsetSearch {
    rounds: u32,
    tables: Vec<usize>,
    sets: usize,
    fit: Fit,
    offsets: Vec<u32>,
    claimed: Vec<bool>,
    usage: Vec<usize>,
    distinct: usize,
    nodes: usize,
    limit: usize,
}

impl OffsetSearch {
    fn new(rounds: u32, tables: &[usize]) -> Self {
        let mut tables = tables.to_vec();
        tables.reverse();
        Self {
            rounds,
            offsets: Vec::with_capacity(tables.len()),
            tables,
            sets: 0,
            fit: Fit::AtMost,
            claimed: vec![false; rounds as usize],
            usage: vec![0; rounds as usize],
            distinct: 0,
            nodes: 0,
            limit: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.nodes >= self.limit
    }

    /// Looks for offsets using `sets` board sets, or at most that many, within `budget` nodes.
    fn run(&mut self, sets: usize, fit: Fit, budget: usize) -> Option<Vec<(usize, u32)>> {
        self.sets = sets;
        self.fit = fit;
        self.limit = self.nodes + budget;
        self.offsets.clear();
        self.claimed.iter_mut().for_each(|c| *c = false);
        self.usage.iter_mut().for_each(|u| *u = 0);
        self.distinct = 0;

        if self.place(0) {
            Some(self.tables.iter().copied().zip(self.offsets.iter().copied()).collect())
        } else {
            None
        }
    }

    /// Residues a pair sees through `circle_table` played at `offset`.
    fn claims(&self, circle_table: usize, offset: u32) -> [Option<usize>; 2] {
        let rounds = self.rounds;
        if circle_table == 0 {
            [Some(offset as usize), None]
        } else {
            let i = circle_table as u32 % rounds;
            [
                Some(((offset + rounds - i) % rounds) as usize),
                Some(((offset + i) % rounds) as usize),
            ]
        }
    }

    fn candidates(&self, index: usize) -> Vec<u32> {
        // shifting every offset by the same amount keeps a solution valid
        if index == 0 {
            return vec![0];
        }
        let (fresh, shared): (Vec<u32>, Vec<u32>) =
            (0..self.rounds).partition(|&offset| self.usage[offset as usize] == 0);
        fresh.into_iter().chain(shared).collect()
    }

    fn place(&mut self, index: usize) -> bool {
        if self.exhausted() {
            return false;
        }
        self.nodes += 1;
        if index == self.tables.len() {
            return self.fit == Fit::AtMost || self.distinct == self.sets;
        }

        let table = self.tables[index];
        let remaining = self.tables.len() - index - 1;

        for offset in self.candidates(index) {
            let fresh = self.usage[offset as usize] == 0;
            let distinct = self.distinct + usize::from(fresh);
            if distinct > self.sets {
                continue;
            }
            if self.fit == Fit::Exactly && distinct + remaining < self.sets {
                continue;
            }
            let claims = self.claims(table, offset);
            if claims.iter().flatten().any(|&c| self.claimed[c]) {
                continue;
            }

            for &c in claims.iter().flatten() {
                self.claimed[c] = true;
            }
            self.usage[offset as usize] += 1;
            self.distinct = distinct;
            self.offsets.push(offset);

            if self.place(index + 1) {
                return true;
            }

            self.offsets.pop();
            self.distinct -= usize::from(fresh);
            self.usage[offset as usize] -= 1;
            for &c in claims.iter().flatten() {
                self.claimed[c] = false;
            }
            if self.exhausted() {
                return false;
            }
        }
        false
    }
}

#[cfg(test)]
mod allocator_tests {
    use std::collections::HashSet;

    use super::*;

    fn allocate(pair_count: u32, hands_per_round: u32, supply: BoardSupply) -> BoardAllocation {
        let topology = PairingTopology::new(pair_count).unwrap();
        BoardAllocator::new(&topology, hands_per_round, supply)
            .allocate()
            .unwrap()
    }

    #[test]
    fn test_no_group_fits() {
        let topology = PairingTopology::new(6).unwrap();
        let err = BoardAllocator::new(&topology, 3, BoardSupply::Physical(2))
            .allocate()
            .unwrap_err();
        assert!(matches!(err, MovementError::NoBalancedAllocation { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_zero_hands() {
        let topology = PairingTopology::new(6).unwrap();
        let err = BoardAllocator::new(&topology, 0, BoardSupply::Unlimited)
            .allocate()
            .unwrap_err();
        assert_eq!(err, MovementError::NoHandsPerRound);
    }

    #[test]
    fn test_eight_pairs_without_relay() {
        let allocation = allocate(8, 2, BoardSupply::Unlimited);
        assert_eq!(allocation.board_sets_in_play(), 4);
        assert!((0..4).all(|table| !allocation.is_relay(table)));
    }

    #[test]
    fn test_four_pairs_need_relay() {
        // two tables can never play different groups without a pair repeating one
        let allocation = allocate(4, 3, BoardSupply::Unlimited);
        assert_eq!(allocation.board_sets_in_play(), 1);
        assert!(allocation.is_relay(0) && allocation.is_relay(1));
        assert_eq!(allocation.cluster_size(0), 2);
        assert_eq!(allocation.hands(0, 0), allocation.hands(0, 1));
    }

    #[test]
    fn test_supply_caps_board_sets() {
        let allocation = allocate(10, 3, BoardSupply::Physical(7));
        assert!(allocation.board_sets_in_play() <= 2);
        assert!((0..5).any(|table| allocation.is_relay(table)));
    }

    #[test]
    fn test_phantom_table_has_no_hands() {
        let allocation = allocate(9, 2, BoardSupply::Physical(8));
        assert_eq!(allocation.group(0, 0), None);
        assert!(allocation.hands(3, 0).is_empty());
        assert!(!allocation.is_relay(0));
        assert_eq!(allocation.hands(0, 1).len(), 2);
    }

    #[test]
    fn test_groups_are_claimed_once() {
        for pair_count in 2..=24 {
            let topology = PairingTopology::new(pair_count).unwrap();
            let rounds = topology.rounds();
            let allocation = BoardAllocator::new(&topology, 1, BoardSupply::Unlimited)
                .allocate()
                .unwrap();
            for pair_no in 1..=pair_count {
                let mut seen = HashSet::new();
                for round in topology.all_rounds() {
                    for table in &round.matchups {
                        if table.north == pair_no || table.east == pair_no {
                            let group = allocation.group(round.round, table.circle_table).unwrap();
                            assert!(group < rounds);
                            assert!(seen.insert(group), "pair {pair_no} repeats group {group}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_large_field_keeps_separate_sets() {
        let allocation = allocate(52, 2, BoardSupply::Physical(208));
        assert!(allocation.board_sets_in_play() > 13);

        let allocation = allocate(60, 2, BoardSupply::Physical(20));
        assert_eq!(allocation.board_sets_in_play(), 10);
    }

    #[test]
    fn test_exhausted_budget_keeps_first_allocation() {
        let allocation = allocate(100, 1, BoardSupply::Unlimited);
        assert!(allocation.board_sets_in_play() > 25);
        assert!((0..50).any(|table| !allocation.is_relay(table)));
    }

    #[test]
    fn test_allocation_is_deterministic() {
        assert_eq!(
            allocate(14, 2, BoardSupply::Physical(10)),
            allocate(14, 2, BoardSupply::Physical(10))
        );
    }
}
