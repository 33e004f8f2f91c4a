//! Symmetry-unreduced constellation enumeration
//!
//! Every solution of the N-Queens problem has exactly one queen in the first row, the last
//! row, the left column and the right column, so it belongs to exactly one border
//! configuration `(i, j, k, l)`. Enumerating all consistent configurations, and splitting each
//! one further by the queens of a few extra prefix rows, yields a workload whose counts sum to
//! the plain solution count of the board.

use super::constellation::{BorderQueens, Constellation};
use super::forbidden::ForbiddenTable;
use super::mask::{bits, Mask};
use crate::error::LaunchError;
use itertools::iproduct;

/// Enumerate the constellations of an `n`-board with `preset_rows` rows placed below row 0
pub fn enumerate<M: Mask>(n: u32, preset_rows: u32) -> Result<Vec<Constellation<M>>, LaunchError> {
    if n == 0 {
        return Err(LaunchError::EmptyBoard(n));
    }
    if n > M::BITS {
        return Err(LaunchError::BoardTooWide { n, bits: M::BITS });
    }
    if n == 1 {
        return Ok(vec![Constellation::empty()]);
    }

    let last = n - 1;
    let start = (1 + preset_rows).min(last);
    let board = M::board(n);
    let left = M::left_border(n);

    let mut constellations = Vec::new();
    for (i, j, k, l) in iproduct!(0..n, 0..n, 0..n, 0..n) {
        if !is_consistent(n, i, j, k, l) {
            continue;
        }
        let border = BorderQueens::new(i, j, k, l);
        let table = ForbiddenTable::<M>::build(n, border.jkl());

        let queen = left >> i;
        if !(queen & table.row(0)).is_empty() {
            continue;
        }

        let mut prefix = Prefix {
            board,
            start,
            border,
            table: &table,
            out: &mut constellations,
        };
        prefix.place(1, queen << 1, queen >> 1, queen);
    }

    Ok(constellations)
}

/// Whether `(i, j, k, l)` can describe the border of a full solution
///
/// A corner queen is counted by both the row and the column it sits on, so the corner
/// conditions must agree.
pub fn is_consistent(n: u32, i: u32, j: u32, k: u32, l: u32) -> bool {
    let last = n - 1;
    (i == 0) == (k == 0)
        && (i == last) == (l == 0)
        && (j == 0) == (k == last)
        && (j == last) == (l == last)
        && i != j
        && k != l
}

struct Prefix<'a, M: Mask> {
    board: M,
    start: u32,
    border: BorderQueens,
    table: &'a ForbiddenTable<M>,
    out: &'a mut Vec<Constellation<M>>,
}

impl<M: Mask> Prefix<'_, M> {
    fn place(&mut self, row: u32, ld: M, rd: M, col: M) {
        if row == self.start {
            self.out.push(Constellation::new(ld, rd, col, row, self.border));
            return;
        }
        let free = !(ld | rd | col | self.table.row(row)) & self.board;
        for queen in bits(free) {
            self.place(row + 1, (ld | queen) << 1, (rd | queen) >> 1, col | queen);
        }
    }
}
