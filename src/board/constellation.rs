//! Constellations: partial boards that form one unit of search work

use super::mask::Mask;
use crate::error::LaunchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Start row marking a pseudo-constellation that contributes nothing
pub const SENTINEL_START: u32 = 69;

const FIELD_BITS: u32 = 5;
const FIELD_MASK: u32 = (1 << FIELD_BITS) - 1;
const START_SHIFT: u32 = 20;
const I_SHIFT: u32 = 15;
const J_SHIFT: u32 = 10;
const K_SHIFT: u32 = 5;

/// Rows and columns of the four border queens
///
/// `i` is the column of the queen in row 0, `j` the column of the queen in the last row (both
/// counted from the left border), `k` the row of the queen on the left border and `l` the row
/// of the queen on the right border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BorderQueens {
    pub i: u32,
    pub j: u32,
    pub k: u32,
    pub l: u32,
}

/// The part of the border that determines a forbidden-cell table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Jkl {
    pub j: u32,
    pub k: u32,
    pub l: u32,
}

impl BorderQueens {
    pub fn new(i: u32, j: u32, k: u32, l: u32) -> Self {
        Self { i, j, k, l }
    }

    pub fn jkl(&self) -> Jkl {
        Jkl { j: self.j, k: self.k, l: self.l }
    }
}

impl fmt::Display for Jkl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "j={} k={} l={}", self.j, self.k, self.l)
    }
}

/// Wire layout of a constellation, as handed over by an external generator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct ConstellationRecord {
    pub ld: u32,
    pub rd: u32,
    pub col: u32,
    pub start_ijkl: u32,
}

impl ConstellationRecord {
    /// The start row, read from every bit above offset 20 so the sentinel survives
    pub fn start(&self) -> u32 {
        self.start_ijkl >> START_SHIFT
    }

    pub fn border(&self) -> BorderQueens {
        BorderQueens {
            i: (self.start_ijkl >> I_SHIFT) & FIELD_MASK,
            j: (self.start_ijkl >> J_SHIFT) & FIELD_MASK,
            k: (self.start_ijkl >> K_SHIFT) & FIELD_MASK,
            l: self.start_ijkl & FIELD_MASK,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.start() == SENTINEL_START
    }
}

/// An unpacked constellation
///
/// `ld`, `rd` and `col` are the occupancy masks at row `start` caused by the queens already
/// placed in the rows above it. The border queens in rows at or below `start` are not part
/// of these masks; the forbidden-cell table and the search take care of them.
///
/// A constellation without border queens constrains nothing beyond its masks and is searched
/// against the unrestricted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constellation<M: Mask> {
    pub ld: M,
    pub rd: M,
    pub col: M,
    pub start: u32,
    pub border: Option<BorderQueens>,
}

impl<M: Mask> Constellation<M> {
    pub fn new(ld: M, rd: M, col: M, start: u32, border: BorderQueens) -> Self {
        Self { ld, rd, col, start, border: Some(border) }
    }

    /// The empty board: nothing placed, no border queens, search starts in row 0
    pub fn empty() -> Self {
        Self { ld: M::ZERO, rd: M::ZERO, col: M::ZERO, start: 0, border: None }
    }

    /// Pseudo-constellation used to pad batches
    pub fn sentinel() -> Self {
        Self { start: SENTINEL_START, ..Self::empty() }
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.start == SENTINEL_START
    }

    /// Key of the forbidden-cell table this constellation is searched against
    pub fn jkl(&self) -> Option<Jkl> {
        self.border.map(|b| b.jkl())
    }

    pub fn from_record(record: &ConstellationRecord) -> Self {
        let border = if record.is_sentinel() { None } else { Some(record.border()) };
        Self {
            ld: M::from_u32(record.ld),
            rd: M::from_u32(record.rd),
            col: M::from_u32(record.col),
            start: record.start(),
            border,
        }
    }

    /// Pack into the wire layout; only boards of up to 32 rows can be described
    pub fn to_record(&self, n: u32) -> Result<ConstellationRecord, LaunchError> {
        if n > 32 {
            return Err(LaunchError::NotPackable(n));
        }
        let BorderQueens { i, j, k, l } = match (self.border, self.is_sentinel()) {
            (Some(border), _) => border,
            (None, true) => BorderQueens::default(),
            (None, false) => return Err(LaunchError::MissingBorder),
        };
        Ok(ConstellationRecord {
            ld: self.ld.to_u32(),
            rd: self.rd.to_u32(),
            col: self.col.to_u32(),
            start_ijkl: self.start << START_SHIFT
                | (i & FIELD_MASK) << I_SHIFT
                | (j & FIELD_MASK) << J_SHIFT
                | (k & FIELD_MASK) << K_SHIFT
                | (l & FIELD_MASK),
        })
    }

    /// Check that every row and column named by the constellation lies on an `n`-board
    pub fn validate(&self, n: u32, index: usize) -> Result<(), LaunchError> {
        if self.is_sentinel() {
            return Ok(());
        }
        let malformed = |reason: String| LaunchError::MalformedConstellation { index, reason };

        if self.start >= n {
            return Err(malformed(format!("start row {} is outside the {n}-board", self.start)));
        }
        let Some(BorderQueens { i, j, k, l }) = self.border else {
            return Ok(());
        };
        for (name, value) in [("i", i), ("j", j), ("k", k), ("l", l)] {
            if value >= n {
                return Err(malformed(format!("{name} = {value} is outside the {n}-board")));
            }
        }
        if k == l && n > 1 {
            return Err(malformed(format!("k and l both name row {k}")));
        }
        Ok(())
    }
}

impl<M: Mask> Default for Constellation<M> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<M: Mask> fmt::Display for Constellation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            return write!(f, "<sentinel>");
        }
        write!(f, "start={}", self.start)?;
        if let Some(BorderQueens { i, j, k, l }) = self.border {
            write!(f, " i={i} j={j} k={k} l={l}")?;
        }
        write!(f, " ld={:b} rd={:b} col={:b}", self.ld, self.rd, self.col)
    }
}
