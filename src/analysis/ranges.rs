// Copyright (c) 2017-2020 Fabian Schuiki

//! Value range tables.
//!
//! This module implements the table of integer intervals a previously run
//! range analysis has computed for the values of a function. Passes consume
//! these ranges; nothing in this crate computes them.

use crate::{
    ir::{Function, Value},
    value::IntValue,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An inclusive interval `[lower, upper]` of integer values.
///
/// The bounds are fixed-width bit patterns which may be interpreted as signed
/// or unsigned, depending on which relation is queried. The full range of a
/// width represents "no information"; no relation holds on it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// The inclusive lower bound.
    pub lower: IntValue,
    /// The inclusive upper bound.
    pub upper: IntValue,
}

impl Range {
    /// Create a new range from two bounds.
    ///
    /// Panics if the bounds differ in width.
    pub fn new(lower: IntValue, upper: IntValue) -> Self {
        assert_eq!(
            lower.width, upper.width,
            "range bounds must be of equal width"
        );
        Self { lower, upper }
    }

    /// Create the full range of a width, from signed minimum to signed
    /// maximum.
    pub fn full(width: usize) -> Self {
        Self {
            lower: IntValue::smin(width),
            upper: IntValue::smax(width),
        }
    }

    /// Create the singleton range `[value, value]`.
    pub fn constant(value: IntValue) -> Self {
        Self {
            lower: value.clone(),
            upper: value,
        }
    }

    /// Get the width of the range in bits.
    pub fn width(&self) -> usize {
        self.lower.width
    }

    /// Check whether this range spans the full domain of its width.
    pub fn is_full(&self) -> bool {
        self.lower == IntValue::smin(self.width()) && self.upper == IntValue::smax(self.width())
    }

    /// Check whether either range carries no information.
    fn unknown(&self, other: &Self) -> bool {
        self.is_full() || other.is_full()
    }

    /// Check whether this range lies entirely below `other`, signed.
    pub fn slt(&self, other: &Self) -> bool {
        !self.unknown(other) && self.upper.slt(&other.lower)
    }

    /// Check whether this range lies entirely below `other`, unsigned.
    pub fn ult(&self, other: &Self) -> bool {
        !self.unknown(other) && self.upper.ult(&other.lower)
    }

    /// Check whether this range lies entirely at or below `other`, signed.
    pub fn sle(&self, other: &Self) -> bool {
        !self.unknown(other) && self.upper.sle(&other.lower)
    }

    /// Check whether this range lies entirely at or below `other`, unsigned.
    pub fn ule(&self, other: &Self) -> bool {
        !self.unknown(other) && self.upper.ule(&other.lower)
    }

    /// Check whether this range lies entirely above `other`, signed.
    pub fn sgt(&self, other: &Self) -> bool {
        !self.unknown(other) && self.lower.sgt(&other.upper)
    }

    /// Check whether this range lies entirely above `other`, unsigned.
    pub fn ugt(&self, other: &Self) -> bool {
        !self.unknown(other) && self.lower.ugt(&other.upper)
    }

    /// Check whether this range lies entirely at or above `other`, signed.
    pub fn sge(&self, other: &Self) -> bool {
        !self.unknown(other) && self.lower.sge(&other.upper)
    }

    /// Check whether this range lies entirely at or above `other`, unsigned.
    pub fn uge(&self, other: &Self) -> bool {
        !self.unknown(other) && self.lower.uge(&other.upper)
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "i{} [{}, {}]",
            self.width(),
            self.lower.value,
            self.upper.value
        )
    }
}

impl std::fmt::Debug for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// A table of value ranges, as computed by a range analysis over one
/// function.
///
/// The table is seeded through `set` by whoever ran the analysis, and read
/// by passes through `get`. Lookups for values the analysis did not cover
/// are answered defensively: constants yield their exact singleton range,
/// everything else yields the full range of its width.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ValueRanges {
    ranges: HashMap<Value, Range>,
}

impl ValueRanges {
    /// Create an empty range table.
    pub fn new() -> Self {
        Default::default()
    }

    /// Associate a range with a value.
    pub fn set(&mut self, value: Value, range: Range) {
        self.ranges.insert(value, range);
    }

    /// Look up the range of a value.
    pub fn get(&self, func: &Function, value: Value) -> Range {
        if let Some(range) = self.ranges.get(&value) {
            return range.clone();
        }
        if let Some(imm) = func.dfg.get_const_int(value) {
            return Range::constant(imm.clone());
        }
        Range::full(func.dfg.value_type(value).unwrap_int())
    }
}
