//! Packed, growable vectors of four-valued logic.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A vector of [`Logic`] values packed 2 bits per value, 32 values per `u64`.
///
/// Index 0 is the least significant bit when the vector represents a number,
/// and the oldest cycle when it represents a value history.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    data: Vec<u64>,
}

const VALUES_PER_WORD: u32 = 32;

impl LogicVec {
    /// Creates a vector of the given width, initialized to all `Zero`.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Creates a vector of the given width with every value set to `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let mut v = Self::new(width);
        if value != Logic::Zero {
            for i in 0..width {
                v.set(i, value);
            }
        }
        v
    }

    /// Builds a vector from values listed least significant first.
    pub fn from_bits(bits: &[Logic]) -> Self {
        let mut v = Self::new(0);
        for &bit in bits {
            v.push(bit);
        }
        v
    }

    /// Returns the number of logic values in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns `true` if the vector holds no values.
    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// Gets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        match (self.data[word_idx] >> bit_offset) & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }

    /// Sets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        let mask = !(0b11u64 << bit_offset);
        self.data[word_idx] = (self.data[word_idx] & mask) | ((value as u64) << bit_offset);
    }

    /// Appends a value, growing the vector by one.
    pub fn push(&mut self, value: Logic) {
        if self.width % VALUES_PER_WORD == 0 {
            self.data.push(0);
        }
        self.width += 1;
        self.set(self.width - 1, value);
    }

    /// Returns the most recently pushed (highest index) value.
    pub fn last(&self) -> Option<Logic> {
        self.width.checked_sub(1).map(|i| self.get(i))
    }

    /// Iterates values from index 0 upwards.
    pub fn iter(&self) -> impl Iterator<Item = Logic> + '_ {
        (0..self.width).map(move |i| self.get(i))
    }

    /// Returns `true` if any value is `X` or `Z`.
    pub fn has_unknown(&self) -> bool {
        self.iter().any(|v| !v.is_known())
    }

    /// Creates a vector from a `u64` value with the given width.
    ///
    /// Bits beyond the given width are ignored.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Converts to a `u64` if every value is known and the width is at most 64.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut result = 0u64;
        for i in 0..self.width {
            match self.get(i) {
                Logic::Zero => {}
                Logic::One => result |= 1 << i,
                Logic::X | Logic::Z => return None,
            }
        }
        Some(result)
    }

    /// Parses a binary string like `"10XZ"`, leftmost character most significant.
    ///
    /// Returns `None` if the string contains invalid characters.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let width = s.chars().count() as u32;
        let mut v = Self::new(width);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Parses a hex string, 4 bits per digit, leftmost digit most significant.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let width = (s.chars().count() as u32) * 4;
        let mut v = Self::new(width);
        for (hex_idx, c) in s.chars().rev().enumerate() {
            let nibble = c.to_digit(16)?;
            for bit in 0..4 {
                if nibble & (1 << bit) != 0 {
                    v.set((hex_idx as u32) * 4 + bit, Logic::One);
                }
            }
        }
        Some(v)
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({self})")
    }
}

fn word_count(width: u32) -> usize {
    width.div_ceil(VALUES_PER_WORD) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_grows_across_words() {
        let mut v = LogicVec::new(0);
        for i in 0..70u32 {
            v.push(if i % 3 == 0 { Logic::X } else { Logic::One });
        }
        assert_eq!(v.width(), 70);
        assert_eq!(v.get(0), Logic::X);
        assert_eq!(v.get(32), Logic::One);
        assert_eq!(v.get(69), Logic::X);
        assert_eq!(v.last(), Some(Logic::X));
    }

    #[test]
    fn last_of_empty_is_none() {
        assert_eq!(LogicVec::new(0).last(), None);
        assert!(LogicVec::default().is_empty());
    }

    #[test]
    fn filled_and_unknown_detection() {
        let v = LogicVec::filled(5, Logic::X);
        assert!(v.has_unknown());
        assert_eq!(format!("{v}"), "XXXXX");
        assert!(!LogicVec::filled(5, Logic::One).has_unknown());
    }

    #[test]
    fn from_bits_is_lsb_first() {
        let v = LogicVec::from_bits(&[Logic::One, Logic::Zero, Logic::Zero]);
        assert_eq!(v.to_u64(), Some(1));
        assert_eq!(format!("{v}"), "001");
    }

    #[test]
    fn binary_str_msb_first() {
        let v = LogicVec::from_binary_str("10XZ").unwrap();
        assert_eq!(v.get(3), Logic::One);
        assert_eq!(v.get(0), Logic::Z);
        assert!(LogicVec::from_binary_str("10A1").is_none());
    }

    #[test]
    fn hex_str() {
        let v = LogicVec::from_hex_str("A5").unwrap();
        assert_eq!(format!("{v}"), "10100101");
        assert!(LogicVec::from_hex_str("GG").is_none());
    }

    #[test]
    fn u64_conversions() {
        let v = LogicVec::from_u64(0b1011, 4);
        assert_eq!(v.to_u64(), Some(11));
        let mut w = v.clone();
        w.set(2, Logic::X);
        assert_eq!(w.to_u64(), None);
    }

    #[test]
    fn serde_preserves_history() {
        let v = LogicVec::from_binary_str("10XZ1010").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
