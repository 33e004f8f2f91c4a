//! Iterative bit-parallel backtracking over the rows of one constellation

use crate::board::{Constellation, ForbiddenTable, Mask, MAX_BOARD};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// How the last row of the board is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SearchVariant {
    /// Place every queen, count on reaching row `n`
    #[default]
    Canonical,
    /// Count the free cells of row `n - 1` instead of descending into it
    LastRowLookahead,
}

/// Counters of one or more searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub solutions: u64,
    pub descents: u64,
    pub ascents: u64,
}

impl AddAssign for SearchStats {
    fn add_assign(&mut self, other: Self) {
        self.solutions += other.solutions;
        self.descents += other.descents;
        self.ascents += other.ascents;
    }
}

/// One step of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<M> {
    /// A queen was placed in `row`
    Descend { row: u32, queen: M },
    /// The queen of `row` was removed
    Ascend { row: u32 },
    /// The board was completed
    Solution,
    /// `count` completions were read off the last row without descending
    Lookahead { count: u32 },
}

/// Receives every transition of a search
pub trait Observer<M> {
    fn observe(&mut self, transition: Transition<M>);
}

impl<M> Observer<M> for () {
    #[inline(always)]
    fn observe(&mut self, _: Transition<M>) {}
}

#[derive(Debug, Clone, Copy, Default)]
struct Frame<M> {
    queen: M,
    rest: M,
    ld: M,
    rd: M,
}

/// Scratch state of one lane
///
/// The stack is reused across constellations; nothing in it survives from one search to the
/// next except stale frames above the current row, which are never read.
pub struct Lane<M: Mask> {
    n: u32,
    board: M,
    variant: SearchVariant,
    stack: [Frame<M>; MAX_BOARD],
}

impl<M: Mask> Lane<M> {
    pub fn new(n: u32, variant: SearchVariant) -> Self {
        assert!(n >= 1 && n <= M::BITS, "board size {n} outside 1..={}", M::BITS);
        Self {
            n,
            board: M::board(n),
            variant,
            stack: [Frame::default(); MAX_BOARD],
        }
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    /// Count the completions of a constellation
    pub fn solve(&mut self, constellation: &Constellation<M>, table: &ForbiddenTable<M>) -> SearchStats {
        self.solve_observed(constellation, table, &mut ())
    }

    pub fn solve_observed<O: Observer<M>>(
        &mut self,
        constellation: &Constellation<M>,
        table: &ForbiddenTable<M>,
        observer: &mut O,
    ) -> SearchStats {
        let mut stats = SearchStats::default();
        if constellation.is_sentinel() {
            return stats;
        }

        let n = self.n;
        let start = constellation.start;
        assert!(start < n, "start row {start} outside the {n}-board");
        debug_assert_eq!(table.n(), n);

        let lookahead = self.variant == SearchVariant::LastRowLookahead;
        let mut row = start;
        let mut ld = constellation.ld;
        let mut rd = constellation.rd;
        let mut col = constellation.col;
        let mut free = !(col | ld | rd | table.row(row)) & self.board;

        loop {
            if row == n {
                stats.solutions += 1;
                observer.observe(Transition::Solution);
            } else if lookahead && row == n - 1 {
                let count = free.count_ones();
                stats.solutions += u64::from(count);
                observer.observe(Transition::Lookahead { count });
            } else if !free.is_empty() {
                let queen = free.lowest_bit();
                self.stack[row as usize] = Frame { queen, rest: free ^ queen, ld, rd };
                col |= queen;
                ld = (ld | queen) << 1;
                rd = (rd | queen) >> 1;
                observer.observe(Transition::Descend { row, queen });
                row += 1;
                stats.descents += 1;

                free = if row < n {
                    !(col | ld | rd | table.row(row)) & self.board
                } else {
                    M::ZERO
                };
                continue;
            }

            if row == start {
                break;
            }
            row -= 1;
            let frame = self.stack[row as usize];
            col ^= frame.queen;
            ld = frame.ld;
            rd = frame.rd;
            free = frame.rest;
            stats.ascents += 1;
            observer.observe(Transition::Ascend { row });
        }

        debug_assert_eq!(col, constellation.col);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{enumerate, TableSet};
    use std::collections::HashSet;

    fn count_all<M: Mask>(n: u32, preset_rows: u32, variant: SearchVariant) -> u64 {
        let constellations = enumerate::<M>(n, preset_rows).unwrap();
        let tables = TableSet::build(n, &constellations);
        let mut lane = Lane::<M>::new(n, variant);
        constellations
            .iter()
            .map(|c| lane.solve(c, tables.get(c.jkl()).unwrap()).solutions)
            .sum()
    }

    /// Records every root-to-node path and fails on a repeat
    #[derive(Default)]
    struct PathRecorder {
        path: Vec<u64>,
        seen: HashSet<Vec<u64>>,
        solutions: u64,
    }

    impl Observer<u64> for PathRecorder {
        fn observe(&mut self, transition: Transition<u64>) {
            match transition {
                Transition::Descend { queen, .. } => {
                    self.path.push(queen);
                    assert!(self.seen.insert(self.path.clone()), "node {:?} entered twice", self.path);
                }
                Transition::Ascend { .. } => {
                    self.path.pop();
                }
                Transition::Solution => self.solutions += 1,
                Transition::Lookahead { count } => self.solutions += u64::from(count),
            }
        }
    }

    #[test]
    fn test_unrestricted_eight_queens() {
        let table = ForbiddenTable::<u32>::unrestricted(8);
        let mut lane = Lane::<u32>::new(8, SearchVariant::Canonical);
        let stats = lane.solve(&Constellation::empty(), &table);

        assert_eq!(stats.solutions, 92);
        // every descent is undone
        assert_eq!(stats.descents, stats.ascents);
    }

    #[test]
    fn test_sentinel_does_nothing() {
        let table = ForbiddenTable::<u64>::unrestricted(8);
        let mut lane = Lane::<u64>::new(8, SearchVariant::Canonical);
        let mut recorder = PathRecorder::default();
        let stats = lane.solve_observed(&Constellation::sentinel(), &table, &mut recorder);

        assert_eq!(stats, SearchStats::default());
        assert!(recorder.seen.is_empty());
    }

    #[test]
    fn test_unreduced_enumeration_sums() {
        assert_eq!(count_all::<u32>(6, 1, SearchVariant::Canonical), 4);
        assert_eq!(count_all::<u32>(8, 2, SearchVariant::Canonical), 92);
        assert_eq!(count_all::<u64>(8, 0, SearchVariant::Canonical), 92);
        assert_eq!(count_all::<u64>(10, 3, SearchVariant::Canonical), 724);
    }

    #[test]
    fn test_lookahead_matches_canonical() {
        for n in 4..=10 {
            assert_eq!(
                count_all::<u32>(n, 2, SearchVariant::LastRowLookahead),
                count_all::<u32>(n, 2, SearchVariant::Canonical),
                "n = {n}"
            );
        }

        let table = ForbiddenTable::<u64>::unrestricted(9);
        let canonical = Lane::<u64>::new(9, SearchVariant::Canonical).solve(&Constellation::empty(), &table);
        let lookahead =
            Lane::<u64>::new(9, SearchVariant::LastRowLookahead).solve(&Constellation::empty(), &table);
        assert_eq!(canonical.solutions, 352);
        assert_eq!(lookahead.solutions, 352);
        assert!(lookahead.descents < canonical.descents);
    }

    #[test]
    fn test_no_node_entered_twice() {
        let n = 8;
        let constellations = enumerate::<u64>(n, 2).unwrap();
        let tables = TableSet::build(n, &constellations);
        let mut lane = Lane::<u64>::new(n, SearchVariant::Canonical);

        for c in &constellations {
            let table = tables.get(c.jkl()).unwrap();
            let mut recorder = PathRecorder::default();
            let stats = lane.solve_observed(c, table, &mut recorder);

            assert_eq!(recorder.solutions, stats.solutions);
            assert_eq!(recorder.seen.len() as u64, stats.descents);
            assert!(stats.descents < 1 << n);
            assert!(recorder.path.is_empty());

            // a second run over the reused stack takes the same steps
            assert_eq!(lane.solve(c, table), stats);
        }
    }

    #[test]
    fn test_single_square_board() {
        let table = ForbiddenTable::<u32>::unrestricted(1);
        for variant in [SearchVariant::Canonical, SearchVariant::LastRowLookahead] {
            let stats = Lane::<u32>::new(1, variant).solve(&Constellation::empty(), &table);
            assert_eq!(stats.solutions, 1);
        }
    }

    #[test]
    fn test_full_width_masks() {
        // the left border bit of a 32-board is the top bit of the register
        let n = 32;
        let solution = explicit_solution(n);
        let table = ForbiddenTable::<u32>::unrestricted(n);
        let mut lane = Lane::<u32>::new(n, SearchVariant::Canonical);

        // keep 28 rows of a known solution and let the engine finish the last four
        let mut c = Constellation::<u32>::empty();
        for (row, column) in solution.iter().take(28).enumerate() {
            let queen = 1u32 << column;
            c.col |= queen;
            c.ld = (c.ld | queen) << 1;
            c.rd = (c.rd | queen) >> 1;
            c.start = row as u32 + 1;
        }
        let stats = lane.solve(&c, &table);
        assert_eq!(stats.descents, stats.ascents);
        assert!(stats.solutions >= 1);
    }

    /// Closed-form solution for boards with `n % 6 == 2`, zero-based columns
    fn explicit_solution(n: u32) -> Vec<u32> {
        assert_eq!(n % 6, 2);
        let mut columns: Vec<u32> = (2..=n).step_by(2).collect();
        columns.extend([3, 1]);
        columns.extend((7..n).step_by(2));
        columns.push(5);
        let columns: Vec<u32> = columns.into_iter().map(|c| c - 1).collect();

        for (a, &ca) in columns.iter().enumerate() {
            for (b, &cb) in columns.iter().enumerate().skip(a + 1) {
                assert_ne!(ca, cb);
                assert_ne!((b - a) as u32, ca.abs_diff(cb));
            }
        }
        columns
    }
}
