//! Scaled integer powers
//!
//! Raising a double-double to a 32-bit integer power is where the
//! downstream survival-function code lives or dies: the terms it sums
//! look like `(k/n + x)^(j-1) * ((n-k)/n - x)^(n-j)` and overflow or
//! underflow `f64` long before the final probability does. The functions
//! here either keep the result in `f64` range (`simple_pow`) or carry it
//! as a `(fraction, exponent)` pair whose exponent lives in exact `i64`
//! arithmetic (`simple_pow_scaled`, `fast_pow_scaled`, `pow_scaled`).
//!
//! The three scaled variants trade cost for accuracy and agree on every
//! documented edge case; callers pick per call site.

use crate::dd::DoubleDouble;
use crate::eft::{fast_two_sum, two_prod, two_sum};
use crate::scale::pow2;

/// Above this power the two-term Taylor correction in [`simple_pow`]
/// loses accuracy to its neglected cubic term; switch to log1p/expm1.
///
/// [`simple_pow`]: DoubleDouble::simple_pow
const LARGE_POW_N: f64 = 1e8;

/// Largest m with `base^m` safely inside the `f64` range for a frexp
/// fraction base, `|base| in [0.5, 1)`. The worst case `0.5^958 = 2^-958`
/// leaves the low part (another ~53 bits down, at `2^-1011`) about 11
/// bits above the subnormal threshold.
const SAFE_EXPONENT_F: u64 = 958;

/// Largest m for a doubled fraction base, `|base| in [1, 2)`: `2^1013`
/// keeps ~11 bits of headroom below the overflow boundary `2^1024`.
const SAFE_EXPONENT_2F: u64 = 1013;

/// sqrt(0.5): the representation-selection threshold. Biased toward the
/// plain fraction so a single safe-exponent constant covers each branch.
const ROOT_HALF: f64 = 0.707_106_781_186_547_6;

/// Magnitudes outside `[2^-500, 2^500]` get the inversion rescue scaling.
const RECIP_SMALL: f64 = pow2(-500);
const RECIP_LARGE: f64 = pow2(500);

impl DoubleDouble {
    /// `self^n` for a signed 32-bit power, staying in `f64` range.
    ///
    /// One scalar power plus a Taylor (or log1p/expm1) correction for the
    /// low part: ~1.06 ULP for typical inputs. Matches the scalar `powf`
    /// contract at every edge: `n == 0` is exactly one for any base
    /// (NaN and infinity included), a zero or non-finite base delegates
    /// to the scalar power, and negative powers of values near the
    /// exponent limits saturate to a correctly signed zero or infinity,
    /// never NaN.
    ///
    /// Requires a normalized input (debug-checked).
    pub fn simple_pow(self, n: i32) -> Self {
        debug_assert!(self.is_normalized(), "simple_pow: input not normalized");
        if n == 0 {
            return Self::ONE;
        }
        if self.hi() == 0.0 || !self.hi().is_finite() {
            return Self::from_f64(self.hi().powf(f64::from(n)));
        }
        let r = simple_pow_pos(self, u64::from(n.unsigned_abs()));
        if n < 0 {
            return safe_recip(r);
        }
        r
    }

    /// `self^n` as `(fraction, exponent)` with `|fraction.hi| in [0.5, 1)`,
    /// supporting powers whose magnitude is far outside `f64` range.
    ///
    /// Same accuracy class as [`simple_pow`], degrading gracefully as the
    /// quotient count of the safe-exponent decomposition grows.
    ///
    /// `n == 0` returns the fractional form of one, `(0.5, 1)`. A zero or
    /// non-finite base has no fractional representation: the scalar power
    /// result is returned with exponent 0.
    ///
    /// [`simple_pow`]: DoubleDouble::simple_pow
    pub fn simple_pow_scaled(self, n: i32) -> (Self, i64) {
        debug_assert!(
            self.is_normalized(),
            "simple_pow_scaled: input not normalized"
        );
        if n == 0 {
            return (Self::from_parts(0.5, 0.0), 1);
        }
        if self.hi() == 0.0 || !self.hi().is_finite() {
            return (Self::from_f64(self.hi().powf(f64::from(n))), 0);
        }
        let (r, re) = simple_pow_scaled_pos(self, u64::from(n.unsigned_abs()));
        if n < 0 {
            // A fraction's magnitude is in [0.5, 1): inverting it is always
            // safe. Re-extract the exponent to restore canonical form.
            let (f, fe) = r.recip().frexp();
            return (f, -re + i64::from(fe));
        }
        (r, re)
    }

    /// `self^n` as `(fraction, exponent)` via a square-and-multiply chain
    /// over frexp-normalized fractions.
    ///
    /// Costs one squaring-chain pass of double-double multiplies; the
    /// compensated products put it well inside `simple_pow_scaled`'s
    /// accuracy at large `n`. Edge cases are identical to
    /// [`simple_pow_scaled`].
    ///
    /// [`simple_pow_scaled`]: DoubleDouble::simple_pow_scaled
    pub fn fast_pow_scaled(self, n: i32) -> (Self, i64) {
        debug_assert!(
            self.is_normalized(),
            "fast_pow_scaled: input not normalized"
        );
        if n == 0 {
            return (Self::from_parts(0.5, 0.0), 1);
        }
        if self.hi() == 0.0 || !self.hi().is_finite() {
            return (Self::from_f64(self.hi().powf(f64::from(n))), 0);
        }
        let (r, re) = pow_chain(self, u64::from(n.unsigned_abs()), Self::unchecked_mul);
        if n < 0 {
            let (f, fe) = r.recip().frexp();
            return (f, -re + i64::from(fe));
        }
        (r, re)
    }

    /// `self^n` as `(fraction, exponent)` at near the full ~106-bit
    /// precision of the representation.
    ///
    /// The same chain as [`fast_pow_scaled`] but with an extended product
    /// that gathers every partial error-free before rounding back to
    /// double-double; the final rounding of that three-term intermediate
    /// is the known accuracy floor. Edge cases are identical to the other
    /// scaled variants.
    ///
    /// [`fast_pow_scaled`]: DoubleDouble::fast_pow_scaled
    pub fn pow_scaled(self, n: i32) -> (Self, i64) {
        debug_assert!(self.is_normalized(), "pow_scaled: input not normalized");
        if n == 0 {
            return (Self::from_parts(0.5, 0.0), 1);
        }
        if self.hi() == 0.0 || !self.hi().is_finite() {
            return (Self::from_f64(self.hi().powf(f64::from(n))), 0);
        }
        let (r, re) = pow_chain(self, u64::from(n.unsigned_abs()), mul_ext);
        if n < 0 {
            let (f, fe) = r.recip().frexp();
            return (f, -re + i64::from(fe));
        }
        (r, re)
    }
}

/// `x^n` for `n >= 1`, finite nonzero normalized `x`.
///
/// `y = hi^n` carries the bulk; the low part enters through
/// `w = (1 + lo/hi)^n - 1`, applied as `y + y*w` renormalized. The
/// fast-two-sum keeps the round-off sign for bases of magnitude one.
fn simple_pow_pos(x: DoubleDouble, n: u64) -> DoubleDouble {
    let nf = n as f64;
    let y = x.hi().powf(nf);
    if y == 0.0 || !y.is_finite() {
        // The scalar power already saturated; no correction survives.
        return DoubleDouble::from_f64(y);
    }
    let z = x.lo() / x.hi();
    let w = if nf > LARGE_POW_N {
        (nf * z.ln_1p()).exp_m1()
    } else {
        // Two-term Taylor expansion of (1+z)^n - 1; |z| ~ eps makes the
        // cubic term negligible below the threshold.
        nf * z * (1.0 + 0.5 * (nf - 1.0) * z)
    };
    let (hi, lo) = fast_two_sum(y, y * w);
    DoubleDouble::from_parts(hi, lo)
}

/// Reciprocal with rescue scaling near the `f64` exponent limits.
fn safe_recip(r: DoubleDouble) -> DoubleDouble {
    let a = r.hi().abs();
    if a < RECIP_SMALL {
        // Inverting a near-subnormal magnitude divides by a subnormal and
        // shreds the low part; lift by 2^500 on both sides instead.
        let z = r.ldexp(500).recip().ldexp(500);
        if !z.hi().is_finite() {
            // Overflowed to infinity: force the low part to a signed zero
            // rather than the NaN the scaled arithmetic would leave.
            return DoubleDouble::from_parts(z.hi(), 0.0 * r.hi());
        }
        return z;
    }
    if a > RECIP_LARGE {
        // A huge magnitude inverts to one whose low part would land in the
        // subnormal range; shrink by 2^500 on both sides.
        return r.ldexp(-500).recip().ldexp(-500);
    }
    r.recip()
}

/// Positive scaled power: pick the base representation, then decompose.
fn simple_pow_scaled_pos(x: DoubleDouble, n: u64) -> (DoubleDouble, i64) {
    let (f, fe) = x.frexp();
    let b = i64::from(fe);
    if f.hi().abs() < ROOT_HALF {
        simple_pow_scaled_base(f, b, n, SAFE_EXPONENT_F)
    } else {
        // Doubling the fraction is exact; x = (2f) * 2^(b-1) with
        // |2f| in [sqrt(2), 2).
        let f2 = DoubleDouble::from_parts(2.0 * f.hi(), 2.0 * f.lo());
        simple_pow_scaled_base(f2, b - 1, n, SAFE_EXPONENT_2F)
    }
}

/// `base^n * 2^(b*n)` as `(fraction, exponent)`.
///
/// `base^m` is inside the safe range for every `m <= safe`, so powers up
/// to `safe` go straight through `simple_pow_pos`. Larger `n` splits as
/// `n = q*safe + r` into `(base^safe)^q * base^r`, recursing on the
/// quotient; every binary-exponent contribution
/// (`b*n`, `q` frexp corrections, the remainder's, the product's) is
/// accumulated in exact `i64` arithmetic, so nothing wraps even for `n`
/// near `2^31`.
fn simple_pow_scaled_base(
    base: DoubleDouble,
    b: i64,
    n: u64,
    safe: u64,
) -> (DoubleDouble, i64) {
    if n <= safe {
        let (rf, re) = simple_pow_pos(base, n).frexp();
        return (rf, b * n as i64 + i64::from(re));
    }
    let q = n / safe;
    let r = n % safe;
    let (fm, em) = simple_pow_pos(base, safe).frexp();
    let (fq, eq) = if q > 1 {
        simple_pow_scaled_pos(fm, q)
    } else {
        (fm, 0)
    };
    let exp = b * n as i64 + i64::from(em) * q as i64 + eq;
    if r == 0 {
        return (fq, exp);
    }
    let (fr, er) = simple_pow_pos(base, r).frexp();
    let (fp, ep) = fq.mul(fr).frexp();
    (fp, exp + i64::from(er) + i64::from(ep))
}

/// Square-and-multiply over frexp-normalized fractions.
///
/// Both the running base and the accumulator are renormalized after every
/// product, so all magnitudes stay in `(0.25, 1)` and the exponents
/// accumulate exactly as integers. `mul` is the product kernel the
/// variant supplies.
fn pow_chain<M>(x: DoubleDouble, n: u64, mul: M) -> (DoubleDouble, i64)
where
    M: Fn(DoubleDouble, DoubleDouble) -> DoubleDouble,
{
    let (mut bf, be0) = x.frexp();
    let mut be = i64::from(be0);
    // The accumulator starts at one, held as 0.5 * 2^1.
    let mut af = DoubleDouble::from_parts(0.5, 0.0);
    let mut ae: i64 = 1;
    let mut k = n;
    loop {
        if k & 1 == 1 {
            let (f, e) = mul(af, bf).frexp();
            af = f;
            ae += be + i64::from(e);
        }
        k >>= 1;
        if k == 0 {
            break;
        }
        let (f, e) = mul(bf, bf).frexp();
        bf = f;
        be = 2 * be + i64::from(e);
    }
    (af, ae)
}

/// Extended product for the high-accuracy path.
///
/// Every partial product is captured error-free and summed compensated
/// into a three-term intermediate, then rounded back to double-double.
/// That final rounding discards information a full triple-double carry
/// would keep; downstream tolerances are calibrated to it.
fn mul_ext(x: DoubleDouble, y: DoubleDouble) -> DoubleDouble {
    let (p0, e0) = two_prod(x.hi(), y.hi());
    let (p1, e1) = two_prod(x.hi(), y.lo());
    let (p2, e2) = two_prod(x.lo(), y.hi());
    let p3 = x.lo() * y.lo();
    let (s1, t1) = two_sum(p1, p2);
    let (s2, t2) = two_sum(s1, e0);
    let tail = ((p3 + e1) + e2) + (t1 + t2);
    let (h, l) = fast_two_sum(p0, s2);
    let (hi, lo) = fast_two_sum(h, l + tail);
    DoubleDouble::from_parts(hi, lo)
}
