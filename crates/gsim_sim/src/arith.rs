//! Bit-level arithmetic over operands listed least significant bit first.
//!
//! Add and subtract propagate unknowns bit by bit like a ripple-carry chain.
//! Every other operation is all-or-nothing: one unknown operand bit makes
//! the whole result unknown.

use gsim_common::Logic;
use num_bigint::BigUint;

/// Ripple-carry sum of `a + b + carry_in`.
///
/// The result is one bit wider than the wider operand; the last element is
/// the carry out. An unknown operand or carry makes that sum bit and every
/// later carry unknown.
pub fn ripple_add(a: &[Logic], b: &[Logic], carry_in: Logic) -> Vec<Logic> {
    let width = a.len().max(b.len());
    let mut result = Vec::with_capacity(width + 1);
    let mut carry = carry_in;
    for i in 0..width {
        let x = a.get(i).copied().unwrap_or(Logic::Zero);
        let y = b.get(i).copied().unwrap_or(Logic::Zero);
        if x.is_known() && y.is_known() && carry.is_known() {
            result.push(x ^ y ^ carry);
            carry = (x & y) | (x & carry) | (y & carry);
        } else {
            result.push(Logic::X);
            carry = Logic::X;
        }
    }
    result.push(carry);
    result
}

/// Two's complement of `a`, one bit wider than `a`; `None` if any bit is unknown.
pub fn negate(a: &[Logic]) -> Option<Vec<Logic>> {
    if a.iter().any(|bit| !bit.is_known()) {
        return None;
    }
    let inverted: Vec<Logic> = a.iter().map(|&bit| !bit).collect();
    Some(ripple_add(&inverted, &[], Logic::One))
}

/// Shift-add product, `a.len() + b.len()` bits wide; `None` if any bit is unknown.
pub fn multiply(a: &[Logic], b: &[Logic]) -> Option<Vec<Logic>> {
    let a = to_bools(a)?;
    let b = to_bools(b)?;
    let mut result = vec![false; a.len() + b.len()];
    for (i, &bit) in a.iter().enumerate() {
        if !bit {
            continue;
        }
        let mut carry = false;
        for (j, &y) in b.iter().enumerate() {
            let sum = u8::from(result[i + j]) + u8::from(y) + u8::from(carry);
            result[i + j] = sum & 1 == 1;
            carry = sum > 1;
        }
        let mut k = i + b.len();
        while carry && k < result.len() {
            carry = result[k];
            result[k] = !result[k];
            k += 1;
        }
    }
    Some(result.into_iter().map(Logic::from_bool).collect())
}

/// Operations evaluated on arbitrary-width unsigned integers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WideOp {
    /// `a / b`.
    Divide,
    /// `a % b`.
    Modulo,
    /// `a ** b`.
    Power,
    /// `a << b`.
    ShiftLeft,
    /// `a >> b`, filling with zeros.
    ShiftRight,
    /// `a >> b`, filling with the sign bit of `a`.
    ArithmeticShiftRight,
}

/// Applies `op` to `a` and `b` and truncates the result to `width` bits.
///
/// Any unknown operand bit or a zero divisor makes every result bit unknown.
/// Shift amounts at or past the operand width shift every bit out.
pub fn wide(op: WideOp, a: &[Logic], b: &[Logic], width: usize) -> Vec<Logic> {
    match wide_value(op, a, b, width) {
        Some(value) => from_biguint(&value, width),
        None => vec![Logic::X; width],
    }
}

fn wide_value(op: WideOp, a: &[Logic], b: &[Logic], width: usize) -> Option<BigUint> {
    let x = to_biguint(a)?;
    let y = to_biguint(b)?;
    let zero = BigUint::from(0u32);
    match op {
        WideOp::Divide => (y != zero).then(|| x / y),
        WideOp::Modulo => (y != zero).then(|| x % y),
        WideOp::Power => {
            // Only the low `width` bits survive, so reduce modulo 2^width.
            let modulus = BigUint::from(1u32) << width;
            Some(x.modpow(&y, &modulus))
        }
        WideOp::ShiftLeft => {
            let amount = shift_amount(&y, width);
            Some(x << amount)
        }
        WideOp::ShiftRight => {
            let amount = shift_amount(&y, a.len());
            Some(x >> amount)
        }
        WideOp::ArithmeticShiftRight => {
            let amount = shift_amount(&y, a.len());
            let negative = a.last() == Some(&Logic::One);
            let mut shifted = x >> amount;
            if negative {
                // Fill every vacated bit up to the output width with ones.
                let kept = a.len().saturating_sub(amount);
                for bit in kept..width.max(a.len()) {
                    shifted.set_bit(bit as u64, true);
                }
            }
            Some(shifted)
        }
    }
}

/// Clamps a shift amount so that anything at or past `limit` shifts everything out.
fn shift_amount(amount: &BigUint, limit: usize) -> usize {
    let limit = limit as u64;
    u64::try_from(amount).map_or(limit, |value| value.min(limit)) as usize
}

fn to_bools(bits: &[Logic]) -> Option<Vec<bool>> {
    bits.iter().map(|bit| bit.to_bool()).collect()
}

fn to_biguint(bits: &[Logic]) -> Option<BigUint> {
    let mut value = BigUint::from(0u32);
    for (i, bit) in bits.iter().enumerate() {
        if bit.to_bool()? {
            value.set_bit(i as u64, true);
        }
    }
    Some(value)
}

fn from_biguint(value: &BigUint, width: usize) -> Vec<Logic> {
    (0..width)
        .map(|i| Logic::from_bool(value.bit(i as u64)))
        .collect()
}
