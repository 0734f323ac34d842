//! Binary exponent extraction and restoration
//!
//! `frexp` factors a double-double into a fraction with high part in
//! `[0.5, 1)` and a power-of-two exponent; `ldexp` undoes it. Both scale
//! each component independently and exactly, which is what lets the
//! scaled power algorithms carry magnitudes far outside the `f64`
//! exponent range as `(fraction, i64 exponent)` pairs.

use crate::dd::DoubleDouble;
use crate::eft::fast_two_sum;

/// Exponent bias of IEEE-754 binary64.
const EXP_BIAS: i32 = 1023;

/// Largest scale applicable in one exact multiply, `2^1023`.
const EXP_MAX: i32 = 1023;

/// Smallest normal exponent.
const EXP_MIN: i32 = -1022;

/// Subnormal pre-scale: multiplying by `2^200` lifts every subnormal into
/// the normal range so its exponent field can be read directly.
const SUBNORMAL_PRESCALE: f64 = pow2(200);
const SUBNORMAL_EXP_OFFSET: i32 = 200;

/// `2^n` for `n` in `[-1022, 1023]`, built from the bit pattern.
#[inline]
pub(crate) const fn pow2(n: i32) -> f64 {
    f64::from_bits(((n + EXP_BIAS) as u64) << 52)
}

/// Unbiased binary exponent of a finite nonzero `x`.
///
/// Subnormals are pre-scaled rather than having their (zero) exponent
/// field read; the offset is subtracted from the result.
#[inline]
pub(crate) fn exponent(x: f64) -> i32 {
    let e = ((x.to_bits() >> 52) & 0x7ff) as i32;
    if e == 0 {
        let e = (((x * SUBNORMAL_PRESCALE).to_bits() >> 52) & 0x7ff) as i32;
        return e - EXP_BIAS - SUBNORMAL_EXP_OFFSET;
    }
    e - EXP_BIAS
}

/// `x * 2^n` in at most three exact multiplies (musl's scalbn scheme).
///
/// Exact whenever the result neither overflows nor underflows; otherwise
/// saturates to the correctly signed infinity or zero. Total for any
/// `i32`, including `i32::MIN` and `i32::MAX`.
pub(crate) fn scalb(x: f64, n: i32) -> f64 {
    let mut x = x;
    let mut n = n;
    if n > EXP_MAX {
        x *= pow2(EXP_MAX);
        n -= EXP_MAX;
        if n > EXP_MAX {
            x *= pow2(EXP_MAX);
            n -= EXP_MAX;
            if n > EXP_MAX {
                n = EXP_MAX;
            }
        }
    } else if n < EXP_MIN {
        // Chunk by 2^-969 = 2^(-1022+53) so no intermediate goes subnormal
        // and double rounding cannot occur.
        let mul = pow2(EXP_MIN + 53);
        x *= mul;
        n -= EXP_MIN + 53;
        if n < EXP_MIN {
            x *= mul;
            n -= EXP_MIN + 53;
            if n < EXP_MIN {
                n = EXP_MIN;
            }
        }
    }
    x * pow2(n)
}

impl DoubleDouble {
    /// Decompose into `(fraction, e)` with `self = fraction * 2^e`
    /// bit-for-bit per component and `0.5 <= |fraction.hi| < 1`.
    ///
    /// Zero returns itself (keeping the sign of the zero) with exponent 0,
    /// as do NaN and infinity, which have no fractional representation.
    pub fn frexp(self) -> (Self, i32) {
        if self.hi() == 0.0 || !self.hi().is_finite() {
            return (self, 0);
        }
        let mut e = exponent(self.hi()) + 1;
        let scaled = self.ldexp(-e);
        // Renormalize. A strictly normalized input passes through
        // untouched; an almost-normalized one can round its high part up
        // to the binade boundary, leaving |hi| exactly 1 with a low part
        // of the opposite sign. Halve back into range and carry the bit
        // into the exponent.
        let (mut hi, mut lo) = fast_two_sum(scaled.hi(), scaled.lo());
        if hi.abs() == 1.0 {
            e += 1;
            hi *= 0.5;
            lo *= 0.5;
        }
        (Self::from_parts(hi, lo), e)
    }

    /// Scale by `2^n`, applied directly to each component.
    pub fn ldexp(self, n: i32) -> Self {
        Self::from_parts(scalb(self.hi(), n), scalb(self.lo(), n))
    }
}
