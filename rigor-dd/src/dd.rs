//! The double-double value type
//!
//! A `DoubleDouble` stores a real number as the unevaluated sum of two
//! `f64` components `hi + lo`, normalized so that `hi == hi + lo` in
//! `f64` arithmetic. That yields ~106 bits of significand while keeping
//! every operation in plain hardware floating point.
//!
//! Values are small `Copy` structs returned by value; hot loops reuse
//! stack slots and never allocate. All operations return normalized
//! results and mirror IEEE scalar semantics at the edges: overflow is
//! infinity, underflow is a signed zero, NaN propagates - none of these
//! are errors.

use crate::eft::{fast_two_sum, two_diff, two_prod, two_sum};
use crate::DdError;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Extended-precision number held as a normalized pair of `f64`s.
///
/// The high part alone is always a valid `f64` approximation of the
/// value; the low part refines it by another ~53 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DoubleDouble {
    hi: f64,
    lo: f64,
}

impl DoubleDouble {
    pub const ZERO: Self = Self { hi: 0.0, lo: 0.0 };
    pub const ONE: Self = Self { hi: 1.0, lo: 0.0 };

    // ========== Construction ==========

    /// Create from parts the caller guarantees are normalized.
    ///
    /// Checked by a debug assertion only; a non-normalized pair in release
    /// builds is a programmer error with undefined accuracy, not a
    /// recoverable condition.
    #[inline]
    pub fn new(hi: f64, lo: f64) -> Self {
        debug_assert!(
            is_normalized(hi, lo),
            "not normalized: hi={hi:e}, lo={lo:e}"
        );
        Self { hi, lo }
    }

    /// Create from parts, validating the normalization invariant.
    pub fn checked_new(hi: f64, lo: f64) -> Result<Self, DdError> {
        if is_normalized(hi, lo) {
            Ok(Self { hi, lo })
        } else {
            Err(DdError::NotNormalized)
        }
    }

    /// Create from a single `f64` (always normalized: the low part is zero).
    #[inline]
    pub fn from_f64(x: f64) -> Self {
        Self { hi: x, lo: 0.0 }
    }

    /// The exact sum `a + b` as a double-double.
    #[inline]
    pub fn from_sum(a: f64, b: f64) -> Self {
        let (hi, lo) = two_sum(a, b);
        Self { hi, lo }
    }

    /// The exact difference `a - b` as a double-double.
    #[inline]
    pub fn from_diff(a: f64, b: f64) -> Self {
        let (hi, lo) = two_diff(a, b);
        Self { hi, lo }
    }

    /// The exact product `a * b` as a double-double.
    #[inline]
    pub fn from_product(a: f64, b: f64) -> Self {
        let (hi, lo) = two_prod(a, b);
        Self { hi, lo }
    }

    /// Internal: build from parts known normalized by construction.
    #[inline]
    pub(crate) fn from_parts(hi: f64, lo: f64) -> Self {
        Self { hi, lo }
    }

    // ========== Accessors ==========

    /// High part: the closest `f64` to the value.
    #[inline]
    pub fn hi(self) -> f64 {
        self.hi
    }

    /// Low part: the round-off the high part could not hold.
    #[inline]
    pub fn lo(self) -> f64 {
        self.lo
    }

    /// The value rounded to a single `f64`.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.hi
    }

    // ========== Predicates ==========

    #[inline]
    pub fn is_zero(self) -> bool {
        self.hi == 0.0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.hi < 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.hi.is_finite()
    }

    #[inline]
    pub fn is_nan(self) -> bool {
        self.hi.is_nan()
    }

    #[inline]
    pub fn abs(self) -> Self {
        if self.hi < 0.0 {
            -self
        } else {
            self
        }
    }

    // ========== Addition ==========

    /// Full compensated addition.
    ///
    /// Sums the four components into an expansion and renormalizes: the
    /// high part is within 1 ULP of the true sum and the low part within
    /// 1 ULP of the remainder, even under heavy cancellation or when the
    /// addends' low parts are far apart in magnitude.
    #[inline]
    pub fn add(self, y: Self) -> Self {
        let (s, e1) = two_sum(self.hi, y.hi);
        let (t, e2) = two_sum(self.lo, y.lo);
        let (s, e) = fast_two_sum(s, e1 + t);
        let (hi, lo) = fast_two_sum(s, e + e2);
        Self { hi, lo }
    }

    /// Cheap addition: one two-sum plus scalar corrections.
    ///
    /// Reaches ~2-4 eps^2 relative error when the addends neither cancel
    /// catastrophically nor sit in wildly disjoint binades; it does not
    /// carry [`DoubleDouble::add`]'s stronger low-part guarantee.
    #[inline]
    pub fn fast_add(self, y: Self) -> Self {
        let (s, e) = two_sum(self.hi, y.hi);
        let (hi, lo) = fast_two_sum(s, e + (self.lo + y.lo));
        Self { hi, lo }
    }

    /// Shorthand for adding a plain `f64`: `add` with a zero low part.
    #[inline]
    pub fn add_f64(self, y: f64) -> Self {
        self.add(Self::from_f64(y))
    }

    /// Shorthand for [`DoubleDouble::fast_add`] with a zero low part.
    #[inline]
    pub fn fast_add_f64(self, y: f64) -> Self {
        self.fast_add(Self::from_f64(y))
    }

    // ========== Multiplication ==========

    /// Compensated product, <= 4 eps^2 relative error.
    ///
    /// Keeps zero and non-finite results scalar-correct: the sign of a
    /// zero product and the propagation of infinity/NaN match `hi * hi`
    /// exactly.
    #[inline]
    pub fn mul(self, y: Self) -> Self {
        let p = self.hi * y.hi;
        if p == 0.0 || !p.is_finite() {
            // The scalar product decides the sign of zero / the non-finite
            // result; no low part survives either way.
            return Self::from_f64(p);
        }
        self.unchecked_mul(y)
    }

    /// Branch-free product for callers that do not care about the sign of
    /// a zero result or non-finite propagation.
    #[inline]
    pub fn unchecked_mul(self, y: Self) -> Self {
        let (p, e) = two_prod(self.hi, y.hi);
        let e = e + (self.hi * y.lo + self.lo * y.hi);
        let (hi, lo) = fast_two_sum(p, e);
        Self { hi, lo }
    }

    /// Product with a plain `f64`.
    #[inline]
    pub fn mul_f64(self, y: f64) -> Self {
        let p = self.hi * y;
        if p == 0.0 || !p.is_finite() {
            return Self::from_f64(p);
        }
        let (p, e) = two_prod(self.hi, y);
        let (hi, lo) = fast_two_sum(p, e + self.lo * y);
        Self { hi, lo }
    }

    // ========== Division ==========

    /// Compensated quotient, <= 4 eps^2 relative error, with scalar-correct
    /// zero/non-finite handling.
    #[inline]
    pub fn div(self, y: Self) -> Self {
        let c = self.hi / y.hi;
        if c == 0.0 || !c.is_finite() {
            return Self::from_f64(c);
        }
        self.unchecked_div(y)
    }

    /// Branch-free quotient; the long-division correction only.
    #[inline]
    pub fn unchecked_div(self, y: Self) -> Self {
        let c = self.hi / y.hi;
        let (u, uu) = two_prod(c, y.hi);
        let cc = (self.hi - u - uu + self.lo - c * y.lo) / y.hi;
        let (hi, lo) = fast_two_sum(c, cc);
        Self { hi, lo }
    }

    /// Reciprocal, <= 2 eps^2 relative error.
    ///
    /// `div` specialized to a numerator of exactly one: the numerator's
    /// low-part term drops out of the correction.
    #[inline]
    pub fn recip(self) -> Self {
        let c = 1.0 / self.hi;
        if c == 0.0 || !c.is_finite() {
            return Self::from_f64(c);
        }
        let (u, uu) = two_prod(c, self.hi);
        let cc = (1.0 - u - uu - c * self.lo) / self.hi;
        let (hi, lo) = fast_two_sum(c, cc);
        Self { hi, lo }
    }

    /// Internal invariant check used by debug assertions.
    #[inline]
    pub(crate) fn is_normalized(self) -> bool {
        is_normalized(self.hi, self.lo)
    }
}

/// `hi` absorbs `lo` entirely when the pair is normalized. NaN pairs pass:
/// NaN propagation is a legitimate value, not an invariant violation.
#[inline]
fn is_normalized(hi: f64, lo: f64) -> bool {
    hi.is_nan() || lo.is_nan() || hi == hi + lo
}

// ========== Operators ==========

impl Neg for DoubleDouble {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            hi: -self.hi,
            lo: -self.lo,
        }
    }
}

impl Add for DoubleDouble {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        DoubleDouble::add(self, rhs)
    }
}

impl Sub for DoubleDouble {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        DoubleDouble::add(self, -rhs)
    }
}

impl Mul for DoubleDouble {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        DoubleDouble::mul(self, rhs)
    }
}

impl Mul<f64> for DoubleDouble {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        self.mul_f64(rhs)
    }
}

impl Div for DoubleDouble {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        DoubleDouble::div(self, rhs)
    }
}

impl From<f64> for DoubleDouble {
    #[inline]
    fn from(x: f64) -> Self {
        Self::from_f64(x)
    }
}

// ========== Comparison ==========

impl PartialOrd for DoubleDouble {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.hi.partial_cmp(&other.hi) {
            Some(Ordering::Equal) => self.lo.partial_cmp(&other.lo),
            ord => ord,
        }
    }
}

// ========== Numeric traits ==========

impl Zero for DoubleDouble {
    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn is_zero(&self) -> bool {
        DoubleDouble::is_zero(*self)
    }
}

impl One for DoubleDouble {
    #[inline]
    fn one() -> Self {
        Self::ONE
    }
}

// ========== Display ==========

impl fmt::Display for DoubleDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:e} + {:e})", self.hi, self.lo)
    }
}
