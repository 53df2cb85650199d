// Copyright (c) 2017-2020 Fabian Schuiki

//! Integer values
//!
//! This module implements fixed-width integer values of arbitrary bit width,
//! together with the signed and unsigned comparisons defined on them.

use crate::ty::{int_ty, Type};
use num::{bigint::ToBigInt, traits::*, BigInt, BigUint};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// An integer value.
///
/// The value is stored as the two's complement bit pattern of the number,
/// which may be reinterpreted as signed or unsigned on demand.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntValue {
    /// The width of the value in bits.
    pub width: usize,
    /// The value itself.
    pub value: BigUint,
}

impl IntValue {
    /// Create the zero value.
    pub fn zero(width: usize) -> Self {
        Self {
            width,
            value: BigUint::zero(),
        }
    }

    /// Create the all-ones value, which is the unsigned maximum.
    pub fn all_ones(width: usize) -> Self {
        Self {
            width,
            value: (BigUint::one() << width) - BigUint::one(),
        }
    }

    /// Create the signed minimum value, `100...0`.
    pub fn smin(width: usize) -> Self {
        Self {
            width,
            value: BigUint::one() << (width - 1),
        }
    }

    /// Create the signed maximum value, `011...1`.
    pub fn smax(width: usize) -> Self {
        Self {
            width,
            value: (BigUint::one() << (width - 1)) - BigUint::one(),
        }
    }

    /// Create a new integer value from a `usize`.
    pub fn from_usize(width: usize, value: usize) -> Self {
        Self {
            width,
            value: value.into(),
        }
    }

    /// Create a new integer value from an `isize`, wrapping it into the
    /// two's complement representation.
    pub fn from_isize(width: usize, value: isize) -> Self {
        Self::from_signed(width, value.into())
    }

    /// Create a new integer value from a signed `BigInt` value.
    pub fn from_signed(width: usize, value: BigInt) -> Self {
        let modulus = BigInt::one() << width;
        let mut v = value % &modulus;
        if v.is_negative() {
            v += modulus;
        }
        assert!(!v.is_negative());
        Self::from_unsigned(width, v.to_biguint().unwrap())
    }

    /// Create a new integer value from an unsigned `BigUint` value.
    pub fn from_unsigned(width: usize, value: BigUint) -> Self {
        let value = value % (BigUint::one() << width);
        Self { width, value }
    }

    /// Convert the value to a signed `BigInt`.
    pub fn to_signed(&self) -> BigInt {
        let sign_mask = BigUint::one() << (self.width - 1);
        if (&self.value & &sign_mask).is_zero() {
            self.value.to_bigint().unwrap()
        } else {
            self.value.to_bigint().unwrap() - (BigInt::one() << self.width)
        }
    }

    /// Convert the value to an unsigned `BigUint`.
    pub fn to_unsigned(&self) -> BigUint {
        self.value.clone()
    }

    /// Convert the value to a usize.
    pub fn to_usize(&self) -> usize {
        self.value.to_usize().unwrap()
    }

    /// Check if the value is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Check if the value is one.
    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    /// Get the type of the value.
    pub fn ty(&self) -> Type {
        int_ty(self.width)
    }
}

impl Display for IntValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "i{} {}", self.width, self.value)
    }
}

impl Debug for IntValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl From<(usize, usize)> for IntValue {
    fn from(v: (usize, usize)) -> Self {
        IntValue::from_usize(v.0, v.1)
    }
}

impl From<(usize, BigInt)> for IntValue {
    fn from(v: (usize, BigInt)) -> Self {
        IntValue::from_signed(v.0, v.1)
    }
}

impl From<(usize, BigUint)> for IntValue {
    fn from(v: (usize, BigUint)) -> Self {
        IntValue::from_unsigned(v.0, v.1)
    }
}

/// Comparisons.
impl IntValue {
    /// Compute `==`.
    pub fn eq(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.value == other.value
    }

    /// Compute `!=`.
    pub fn neq(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.value != other.value
    }

    /// Compute unsigned `<`.
    pub fn ult(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.value < other.value
    }

    /// Compute unsigned `>`.
    pub fn ugt(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.value > other.value
    }

    /// Compute unsigned `<=`.
    pub fn ule(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.value <= other.value
    }

    /// Compute unsigned `>=`.
    pub fn uge(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.value >= other.value
    }

    /// Compute signed `<`.
    pub fn slt(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.to_signed() < other.to_signed()
    }

    /// Compute signed `>`.
    pub fn sgt(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.to_signed() > other.to_signed()
    }

    /// Compute signed `<=`.
    pub fn sle(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.to_signed() <= other.to_signed()
    }

    /// Compute signed `>=`.
    pub fn sge(&self, other: &Self) -> bool {
        assert_eq!(self.width, other.width);
        self.to_signed() >= other.to_signed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_conversion() {
        assert_eq!(IntValue::from_isize(8, -1).to_signed(), (-1).into());
        assert_eq!(IntValue::from_isize(8, -128).to_signed(), (-128).into());
        assert_eq!(IntValue::from_isize(8, 127).to_signed(), 127.into());
        assert_eq!(IntValue::from_isize(8, -1).to_unsigned(), 255u32.into());
        assert_eq!(IntValue::smin(8).to_signed(), (-128).into());
        assert_eq!(IntValue::smax(8).to_signed(), 127.into());
        assert_eq!(IntValue::all_ones(8).to_unsigned(), 255u32.into());
    }

    #[test]
    fn signed_order() {
        let a = IntValue::from_isize(16, -5);
        let b = IntValue::from_usize(16, 3);
        assert!(a.slt(&b));
        assert!(b.sgt(&a));
        assert!(a.sle(&a));
        assert!(a.sge(&a));
        // The same bit patterns flip their order under the unsigned view.
        assert!(a.ugt(&b));
        assert!(b.ult(&a));
    }

    #[test]
    fn unsigned_order() {
        let a = IntValue::from_usize(16, 7);
        let b = IntValue::from_usize(16, 1000);
        assert!(a.ult(&b));
        assert!(b.ugt(&a));
        assert!(a.ule(&b));
        assert!(b.uge(&a));
        assert!(a.slt(&b));
    }
}
