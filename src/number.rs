// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;
use core::fmt::{Debug, Formatter};
use core::hash::{Hash, Hasher};

use serde::ser::Serializer;
use serde::Serialize;

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63

/// Numeric literal or variable value.
///
/// Integers and floats compare numerically, so `3` equals `3.0`. The
/// comparison is exact: an `i64` is never rounded through `f64`, and NaN
/// equals itself and sorts after every other number.
#[derive(Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Integral floats within the `i64` range are treated as integers.
    fn as_exact_int(self) -> Option<i64> {
        match self {
            Number::Int(v) => Some(v),
            Number::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) => {
                Some(f as i64)
            }
            Number::Float(_) => None,
        }
    }

    fn canonical(self) -> Number {
        match self.as_exact_int() {
            Some(v) => Number::Int(v),
            None => self,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_exact_int()
    }

    pub fn format_decimal(&self) -> String {
        match self.canonical() {
            Number::Int(v) => v.to_string(),
            Number::Float(f) => f.to_string(),
        }
    }
}

impl Debug for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format_decimal())
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.canonical() {
            Number::Int(v) => serializer.serialize_i64(v),
            Number::Float(f) => serializer.serialize_f64(f),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(i64::from(value))
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Number::Int(v),
            Err(_) => Number::Float(value as f64),
        }
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::from(value as u64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

// `f` is not an integer within the `i64` range.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= I64_BOUND {
        Ordering::Less
    } else if f < -I64_BOUND {
        Ordering::Greater
    } else {
        // |f| < 2^52 here, so rounding `i` cannot cross or reach `f`.
        (i as f64).partial_cmp(&f).unwrap_or(Ordering::Less)
    }
}

fn cmp_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.canonical(), other.canonical()) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (Number::Int(a), Number::Float(b)) => cmp_int_float(a, b),
            (Number::Float(a), Number::Int(b)) => cmp_int_float(b, a).reverse(),
            (Number::Float(a), Number::Float(b)) => cmp_floats(a, b),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.canonical() {
            Number::Int(v) => v.hash(state),
            Number::Float(f) if f.is_nan() => f64::NAN.to_bits().hash(state),
            Number::Float(f) => f.to_bits().hash(state),
        }
    }
}
