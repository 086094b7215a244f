//! Fixed-width coalition bitmasks

use std::fmt;

/// Most players a [`Coalition`] can hold
pub const MAX_PLAYERS: usize = 63;

/// A set of players, bit `i` set when player `i` is a member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coalition(u64);

impl Coalition {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Every one of `n` players
    pub fn grand(n: usize) -> Self {
        debug_assert!(n <= MAX_PLAYERS);
        if n == 0 { Self(0) } else { Self(u64::MAX >> (64 - n)) }
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn contains(self, player: usize) -> bool {
        self.0 & (1 << player) != 0
    }

    #[must_use]
    pub const fn with(self, player: usize) -> Self {
        Self(self.0 | (1 << player))
    }

    #[must_use]
    pub const fn without(self, player: usize) -> Self {
        Self(self.0 & !(1 << player))
    }

    /// Any member in common with the mask
    pub const fn intersects(self, mask: u64) -> bool {
        self.0 & mask != 0
    }

    pub const fn is_subset_of(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Member indices, ascending
    pub fn members(self) -> impl Iterator<Item = usize> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let i = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(i)
        })
    }
}

impl fmt::Display for Coalition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (n, i) in self.members().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, "{i}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grand_coalition() {
        assert_eq!(Coalition::grand(0), Coalition::EMPTY);
        assert_eq!(Coalition::grand(3).bits(), 0b111);
        assert_eq!(Coalition::grand(63).len(), 63);
    }

    #[test]
    fn test_membership() {
        let c = Coalition::EMPTY.with(0).with(4);
        assert!(c.contains(4));
        assert!(!c.contains(1));
        assert_eq!(c.without(4), Coalition::EMPTY.with(0));
        assert_eq!(c.members().collect::<Vec<_>>(), vec![0, 4]);
        assert!(c.intersects(0b10000));
        assert!(!c.intersects(0b00110));
        assert_eq!(c.to_string(), "{0,4}");
    }

    #[test]
    fn test_subset() {
        let small = Coalition::from_bits(0b001);
        let big = Coalition::from_bits(0b011);
        assert!(small.is_subset_of(big));
        assert!(!big.is_subset_of(small));
        assert!(Coalition::EMPTY.is_subset_of(small));
    }
}
