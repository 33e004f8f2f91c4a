//! Occupancy mask abstraction over the supported register widths

use std::fmt::{Binary, Debug};
use std::hash::Hash;
use std::ops::{BitAnd, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr};

/// Largest board any mask type supports; lane stacks are sized for it
pub const MAX_BOARD: usize = 64;

/// A bit-set wide enough to hold one board row
///
/// Bit `n - 1` is the left border column, bit `0` the right border column.
pub trait Mask:
    Copy
    + Eq
    + Hash
    + Default
    + Debug
    + Binary
    + Send
    + Sync
    + 'static
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
    + BitOrAssign
    + BitXorAssign
{
    const BITS: u32;
    const ZERO: Self;
    const ONE: Self;

    /// Isolate the lowest set bit (two's-complement `x & -x`)
    fn lowest_bit(self) -> Self;

    fn count_ones(self) -> u32;

    fn trailing_zeros(self) -> u32;

    fn from_u32(value: u32) -> Self;

    /// Truncate to the low 32 bits, for packed records
    fn to_u32(self) -> u32;

    #[inline]
    fn is_empty(self) -> bool {
        self == Self::ZERO
    }

    /// Mask with the low `n` bits set
    fn board(n: u32) -> Self;

    /// Left border column for a board of size `n`
    #[inline]
    fn left_border(n: u32) -> Self {
        Self::ONE << (n - 1)
    }
}

macro_rules! impl_mask {
    ($t:ty) => {
        impl Mask for $t {
            const BITS: u32 = <$t>::BITS;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline]
            fn lowest_bit(self) -> Self {
                self & self.wrapping_neg()
            }

            #[inline]
            fn count_ones(self) -> u32 {
                <$t>::count_ones(self)
            }

            #[inline]
            fn trailing_zeros(self) -> u32 {
                <$t>::trailing_zeros(self)
            }

            #[inline]
            fn from_u32(value: u32) -> Self {
                value as $t
            }

            #[inline]
            fn to_u32(self) -> u32 {
                self as u32
            }

            #[inline]
            fn board(n: u32) -> Self {
                debug_assert!(n <= Self::BITS);
                if n == Self::BITS {
                    <$t>::MAX
                } else {
                    (1 << n) - 1
                }
            }
        }
    };
}

impl_mask!(u32);
impl_mask!(u64);

/// Iterate over the set bits of a mask, lowest first
pub fn bits<M: Mask>(mut mask: M) -> impl Iterator<Item = M> {
    std::iter::from_fn(move || {
        if mask.is_empty() {
            None
        } else {
            let bit = mask.lowest_bit();
            mask ^= bit;
            Some(bit)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_bit_matches_trailing_zeros() {
        // every 16-bit pattern, checked against the hardware bit-count instructions
        for value in 1u32..=0xFFFF {
            let bit = value.lowest_bit();
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(Mask::trailing_zeros(bit), value.trailing_zeros());
            assert_eq!(value & bit, bit);
        }
        assert_eq!(0u32.lowest_bit(), 0);
    }

    #[test]
    fn test_lowest_bit_high_bits() {
        assert_eq!((1u32 << 31).lowest_bit(), 1u32 << 31);
        assert_eq!(u32::MAX.lowest_bit(), 1);
        assert_eq!((1u64 << 63).lowest_bit(), 1u64 << 63);
        assert_eq!(0xF0F0_0000_0000_0000u64.lowest_bit(), 1u64 << 52);
    }

    #[test]
    fn test_board_masks() {
        assert_eq!(<u32 as Mask>::board(8), 0xFF);
        assert_eq!(<u32 as Mask>::board(32), u32::MAX);
        assert_eq!(<u64 as Mask>::board(1), 1);
        assert_eq!(<u64 as Mask>::board(64), u64::MAX);
        assert_eq!(<u32 as Mask>::left_border(8), 0x80);
    }

    #[test]
    fn test_bit_iteration() {
        let collected: Vec<u32> = bits(0b1011_0000u32).collect();
        assert_eq!(collected, vec![0b1_0000, 0b10_0000, 0b1000_0000]);
        assert_eq!(bits(0u64).count(), 0);
    }
}
