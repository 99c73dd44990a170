//! Four-valued logic with dominance-aware gate operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single simulated bit.
///
/// - `Zero` / `One`: driven low / high
/// - `X`: unknown, uninitialized, or the result of an unresolvable input
/// - `Z`: high-impedance; gates treat it like `X`, output vectors print it as `0`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Logic low (0).
    Zero = 0,
    /// Logic high (1).
    One = 1,
    /// Unknown.
    #[default]
    X = 2,
    /// High-impedance.
    Z = 3,
}

impl Logic {
    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts '0', '1', 'x'/'X', and 'z'/'Z'.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Converts a test-vector character: anything other than `0`/`1` reads as `X`.
    pub fn from_vector_char(c: char) -> Self {
        match c {
            '0' => Logic::Zero,
            '1' => Logic::One,
            _ => Logic::X,
        }
    }

    /// Character written into output vector files.
    pub fn to_vector_char(self) -> char {
        match self {
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Zero | Logic::Z => '0',
        }
    }

    /// Maps a boolean onto `One`/`Zero`.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_known(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    /// Returns the boolean value of a known bit.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::X | Logic::Z => None,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Zero => write!(f, "0"),
            Logic::One => write!(f, "1"),
            Logic::X => write!(f, "X"),
            Logic::Z => write!(f, "Z"),
        }
    }
}

/// Zero dominates; otherwise any unknown operand yields `X`.
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

/// One dominates; otherwise any unknown operand yields `X`.
impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => X,
        }
    }
}

/// No dominating value: any unknown operand yields `X`.
impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, Zero) | (One, One) => Zero,
            (Zero, One) | (One, Zero) => One,
            _ => X,
        }
    }
}

impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        use Logic::*;
        match self {
            Zero => One,
            One => Zero,
            X | Z => X,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Logic;
    use super::Logic::*;

    #[test]
    fn and_zero_dominates_unknown() {
        assert_eq!(Zero & X, Zero);
        assert_eq!(Z & Zero, Zero);
        assert_eq!(One & One, One);
        assert_eq!(One & X, X);
        assert_eq!(One & Z, X);
    }

    #[test]
    fn or_one_dominates_unknown() {
        assert_eq!(One | X, One);
        assert_eq!(Z | One, One);
        assert_eq!(Zero | Zero, Zero);
        assert_eq!(Zero | X, X);
        assert_eq!(Z | Z, X);
    }

    #[test]
    fn xor_never_masks_unknown() {
        assert_eq!(Zero ^ One, One);
        assert_eq!(One ^ One, Zero);
        assert_eq!(One ^ X, X);
        assert_eq!(Z ^ Zero, X);
    }

    #[test]
    fn not_of_high_impedance_is_unknown() {
        assert_eq!(!Zero, One);
        assert_eq!(!One, Zero);
        assert_eq!(!Z, X);
    }

    #[test]
    fn vector_characters() {
        assert_eq!(Logic::from_vector_char('1'), One);
        assert_eq!(Logic::from_vector_char('0'), Zero);
        assert_eq!(Logic::from_vector_char('x'), X);
        assert_eq!(Logic::from_vector_char('?'), X);
        assert_eq!(Z.to_vector_char(), '0');
        assert_eq!(X.to_vector_char(), 'x');
    }

    #[test]
    fn from_char_is_strict() {
        assert_eq!(Logic::from_char('z'), Some(Z));
        assert_eq!(Logic::from_char('2'), None);
    }

    #[test]
    fn known_values() {
        assert!(One.is_known());
        assert!(!Z.is_known());
        assert_eq!(Zero.to_bool(), Some(false));
        assert_eq!(X.to_bool(), None);
        assert_eq!(Logic::default(), X);
    }
}
