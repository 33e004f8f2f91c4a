//! Forbidden-cell tables derived from the border queens

use super::constellation::{Constellation, Jkl};
use super::mask::{Mask, MAX_BOARD};
use crate::error::LaunchError;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;

/// Per-row mask of cells that the border queens occupy or attack
///
/// Rows `k` and `l` admit only the left and right border cell, the last row only the cell in
/// column `j`. Every other row marks both border columns, column `j`, the two diagonals of the
/// last-row queen and the diagonals of the two border queens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenTable<M: Mask> {
    n: u32,
    rows: [M; MAX_BOARD],
}

impl<M: Mask> ForbiddenTable<M> {
    /// Table that forbids nothing, for constellations without border queens
    pub fn unrestricted(n: u32) -> Self {
        Self { n, rows: [M::ZERO; MAX_BOARD] }
    }

    /// Build the table for one `(j, k, l)` triple
    pub fn build(n: u32, jkl: Jkl) -> Self {
        debug_assert!(n >= 1 && n <= M::BITS);
        debug_assert!(jkl.j < n && jkl.k < n && jkl.l < n);

        let board = M::board(n);
        let left = M::left_border(n);
        let right = M::ONE;
        let queen_j = left >> jkl.j;
        let last = n - 1;

        let mut rows = [M::ZERO; MAX_BOARD];
        for (a, row) in rows.iter_mut().enumerate().take(n as usize) {
            let a = a as u32;
            let admitted = if a == jkl.k {
                Some(left)
            } else if a == jkl.l {
                Some(right)
            } else if a == last {
                Some(queen_j)
            } else {
                None
            };

            *row = match admitted {
                Some(cell) => !cell & board,
                None => {
                    let up = last - a;
                    let cells = left
                        | right
                        | queen_j
                        | (queen_j << up)
                        | (queen_j >> up)
                        | (left >> a.abs_diff(jkl.k))
                        | (right << a.abs_diff(jkl.l));
                    cells & board
                }
            };
        }

        Self { n, rows }
    }

    /// The table a constellation is searched against
    pub fn for_constellation(n: u32, constellation: &Constellation<M>) -> Self {
        match constellation.jkl() {
            Some(jkl) => Self::build(n, jkl),
            None => Self::unrestricted(n),
        }
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    #[inline]
    pub fn row(&self, row: u32) -> M {
        self.rows[row as usize]
    }

    pub fn rows(&self) -> &[M] {
        &self.rows[..self.n as usize]
    }
}

impl<M: Mask> fmt::Display for ForbiddenTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for col in (0..self.n).rev() {
                let cell = (*row >> col) & M::ONE;
                write!(f, "{}", if cell.is_empty() { '·' } else { '█' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Tables for every distinct triple of a workload, built before launch and shared read-only
#[derive(Debug, Clone)]
pub struct TableSet<M: Mask> {
    n: u32,
    tables: HashMap<Option<Jkl>, ForbiddenTable<M>>,
}

impl<M: Mask> TableSet<M> {
    pub fn build(n: u32, constellations: &[Constellation<M>]) -> Self {
        let tables = constellations
            .iter()
            .filter(|c| !c.is_sentinel())
            .map(|c| c.jkl())
            .unique()
            .map(|key| {
                let table = match key {
                    Some(jkl) => ForbiddenTable::build(n, jkl),
                    None => ForbiddenTable::unrestricted(n),
                };
                (key, table)
            })
            .collect();
        Self { n, tables }
    }

    /// Look up the table of a constellation
    pub fn get(&self, key: Option<Jkl>) -> Result<&ForbiddenTable<M>, LaunchError> {
        self.tables.get(&key).ok_or(match key {
            Some(Jkl { j, k, l }) => LaunchError::MissingTable { j, k, l },
            None => LaunchError::MissingTable { j: 0, k: 0, l: 0 },
        })
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BorderQueens;

    fn jkl(j: u32, k: u32, l: u32) -> Jkl {
        Jkl { j, k, l }
    }

    #[test]
    fn test_forced_rows() {
        let table = ForbiddenTable::<u32>::build(8, jkl(3, 2, 5));

        assert_eq!(!table.row(2) & 0xFF, 0b1000_0000); // row k: left border only
        assert_eq!(!table.row(5) & 0xFF, 0b0000_0001); // row l: right border only
        assert_eq!(!table.row(7) & 0xFF, 0b0001_0000); // last row: column j only
    }

    #[test]
    fn test_free_row_marks() {
        let n = 8;
        let table = ForbiddenTable::<u32>::build(n, jkl(3, 2, 5));
        let row = table.row(4);

        // border columns and column j
        assert_ne!(row & 0b1000_0000, 0);
        assert_ne!(row & 0b0000_0001, 0);
        assert_ne!(row & 0b0001_0000, 0);
        // queen j sits at (7, bit 4); three rows up its diagonals reach bits 7 and 1
        assert_ne!(row & (1 << 1), 0);
        // queen k at (2, bit 7) reaches bit 5 two rows down
        assert_ne!(row & (1 << 5), 0);
        // queen l at (5, bit 0) reaches bit 1 one row up
        assert_eq!(row, 0b1011_0011);
    }

    #[test]
    fn test_table_stays_on_board() {
        let table = ForbiddenTable::<u64>::build(6, jkl(0, 5, 2));
        for row in table.rows() {
            assert_eq!(*row & !0b11_1111u64, 0);
        }
        assert_eq!(table.rows().len(), 6);
    }

    #[test]
    fn test_independent_builds_are_identical() {
        let key = jkl(4, 1, 9);
        let a = std::thread::spawn(move || ForbiddenTable::<u32>::build(12, key));
        let b = std::thread::spawn(move || ForbiddenTable::<u32>::build(12, key));
        assert_eq!(a.join().unwrap(), b.join().unwrap());
    }

    #[test]
    fn test_unrestricted_forbids_nothing() {
        let table = ForbiddenTable::<u64>::unrestricted(10);
        assert!(table.rows().iter().all(|row| *row == 0));
    }

    #[test]
    fn test_table_set_deduplicates() {
        let border = BorderQueens::new(1, 2, 3, 4);
        let constellations = vec![
            Constellation::<u32>::new(0, 0, 0, 1, border),
            Constellation::<u32>::new(1, 0, 0, 1, border),
            Constellation::<u32>::new(0, 0, 0, 1, BorderQueens::new(2, 3, 1, 5)),
            Constellation::<u32>::sentinel(),
        ];
        let set = TableSet::build(8, &constellations);
        assert_eq!(set.len(), 2);
        assert!(set.get(Some(border.jkl())).is_ok());
        assert!(set.get(None).is_err());
    }

    #[test]
    fn test_display() {
        let table = ForbiddenTable::<u32>::build(4, jkl(1, 1, 2));
        let rendered = table.to_string();
        assert_eq!(rendered.lines().count(), 4);
        assert_eq!(rendered.lines().nth(1), Some("·███"));
    }
}
