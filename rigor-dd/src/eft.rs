//! Error-free transformations
//!
//! Each function decomposes a single rounded `f64` operation into the
//! rounded result and its exact rounding error, using only `f64`
//! arithmetic: `s + e` recovers the mathematical sum or product exactly.
//! These are the building blocks every compensated algorithm in the crate
//! rests on.
//!
//! References: Knuth TAOCP vol. 2 (two-sum), Dekker's 1971 splitting for
//! the product form.

/// Dekker splitting constant, `2^27 + 1`.
///
/// Multiplying by this and subtracting splits a 53-bit significand into
/// a 26-bit and a 27-bit half whose pairwise products are exact.
const MULTIPLIER: f64 = 134_217_729.0;

/// Largest magnitude whose Dekker split cannot overflow, `2^996`.
const SAFE_UPPER: f64 = f64::from_bits((996 + 1023) << 52);

/// Exact scale factors used to bring an oversized operand into split
/// range. `2^-54` and `2^54`; applied in opposite directions to the two
/// operands so the product itself is unchanged.
const DOWN_54: f64 = 1.0 / 18_014_398_509_481_984.0;
const UP_54: f64 = 18_014_398_509_481_984.0;

/// Error-free addition of two `f64` values, valid for any magnitudes.
///
/// Returns `(s, e)` with `s = fl(a + b)` and `s + e = a + b` exactly.
#[inline]
pub fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let b1 = s - a;
    let a1 = s - b1;
    let e = (a - a1) + (b - b1);
    (s, e)
}

/// Error-free addition requiring `|a| >= |b|` (or `a == 0`).
///
/// One subtraction cheaper than [`two_sum`]. The error term keeps the
/// sign of `b` when the exact error is a zero, so `fast_two_sum(1.0, -0.0)`
/// yields a negative low part; the scaled power code relies on this to
/// propagate round-off signs for bases of magnitude one.
#[inline]
pub fn fast_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let e = b - (s - a);
    (s, e)
}

/// Error-free subtraction, valid for any magnitudes.
///
/// Written as a direct difference rather than `two_sum(a, -b)` so a zero
/// result carries the IEEE sign of `a - b` (the comparison ordering), not
/// the sign a negation would smuggle in.
#[inline]
pub fn two_diff(a: f64, b: f64) -> (f64, f64) {
    let s = a - b;
    let b1 = s - a;
    let a1 = s - b1;
    let e = (a - a1) - (b + b1);
    (s, e)
}

/// Error-free subtraction requiring `|a| >= |b|`.
#[inline]
pub fn fast_two_diff(a: f64, b: f64) -> (f64, f64) {
    let s = a - b;
    let e = (a - s) - b;
    (s, e)
}

/// Error-free multiplication.
///
/// Returns `(p, e)` with `p = fl(a * b)` and `p + e = a * b` exactly for
/// finite operands whose product is a normal number. A product that
/// overflows or is NaN yields a NaN error term; one that underflows to
/// zero or subnormal has no representable low part and yields zero.
#[inline]
pub fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    (p, product_low(a, b, p))
}

/// Exact low part of `a * b` given the rounded product `p`.
fn product_low(a: f64, b: f64, p: f64) -> f64 {
    if !p.is_normal() {
        // Overflow or NaN -> NaN; zero or subnormal -> zero.
        return p - p;
    }
    // The split multiplies by 2^27 + 1 and would overflow for magnitudes at
    // 2^996 and above. At most one operand can be that large when the
    // product is finite; move 2^54 from it to the other operand. Both
    // scalings are exact and the product is unchanged, so the low part
    // needs no rescaling afterwards.
    if a.abs() >= SAFE_UPPER {
        return product_low_split(a * DOWN_54, b * UP_54, p);
    }
    if b.abs() >= SAFE_UPPER {
        return product_low_split(a * UP_54, b * DOWN_54, p);
    }
    product_low_split(a, b, p)
}

/// Dekker's algorithm on operands already inside the splittable range.
#[inline]
fn product_low_split(a: f64, b: f64, p: f64) -> f64 {
    let (ah, al) = split(a);
    let (bh, bl) = split(b);
    (((ah * bh - p) + ah * bl) + al * bh) + al * bl
}

/// Split `a` into high and low halves that sum to `a` exactly.
#[inline]
fn split(a: f64) -> (f64, f64) {
    let t = MULTIPLIER * a;
    let hi = t - (t - a);
    (hi, a - hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashu_float::FBig;

    /// Exact binary big-float image of an `f64`.
    fn fb(x: f64) -> FBig {
        FBig::try_from(x).unwrap().with_precision(3000).value()
    }

    /// xorshift64* - deterministic pseudo-random stream for sweeps.
    fn next(state: &mut u64) -> u64 {
        let mut x = *state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        *state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Random finite f64 with significand in [1, 2) and exponent in
    /// [-100, 100], randomly signed.
    fn rand_f64(state: &mut u64) -> f64 {
        let bits = next(state);
        let mantissa = bits >> 12;
        let m = 1.0 + mantissa as f64 / (1u64 << 52) as f64;
        let e = (next(state) % 201) as i32 - 100;
        let sign = if next(state) & 1 == 0 { 1.0 } else { -1.0 };
        sign * m * (e as f64).exp2()
    }

    #[test]
    fn test_two_sum_exact_random_pairs() {
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        for _ in 0..200 {
            let a = rand_f64(&mut state);
            let b = rand_f64(&mut state);
            let (s, e) = two_sum(a, b);
            assert_eq!(s, a + b, "high part must be the rounded sum");
            assert_eq!(
                fb(s) + fb(e),
                fb(a) + fb(b),
                "s + e must equal a + b exactly for a={a:e}, b={b:e}"
            );
        }
    }

    #[test]
    fn test_two_sum_exact_boundary_scales() {
        // Widely separated magnitudes: the error term carries everything
        // the rounded sum lost.
        for ea in [-100i32, -53, -1, 0, 1, 53, 100] {
            for eb in [-100i32, -53, -1, 0, 1, 53, 100] {
                let a = 1.5 * (ea as f64).exp2();
                let b = -1.25 * (eb as f64).exp2();
                let (s, e) = two_sum(a, b);
                assert_eq!(fb(s) + fb(e), fb(a) + fb(b), "ea={ea}, eb={eb}");
            }
        }
    }

    #[test]
    fn test_two_prod_exact_random_pairs() {
        let mut state = 0xD1B5_4A32_D192_ED03u64;
        for _ in 0..200 {
            let a = rand_f64(&mut state);
            let b = rand_f64(&mut state);
            let (p, e) = two_prod(a, b);
            assert_eq!(p, a * b, "high part must be the rounded product");
            assert_eq!(
                fb(p) + fb(e),
                fb(a) * fb(b),
                "p + e must equal a * b exactly for a={a:e}, b={b:e}"
            );
        }
    }

    #[test]
    fn test_two_prod_matches_fma_reference() {
        let mut state = 0x853C_49E6_748F_EA9Bu64;
        for _ in 0..200 {
            let a = rand_f64(&mut state);
            let b = rand_f64(&mut state);
            let (p, e) = two_prod(a, b);
            assert_eq!(e, a.mul_add(b, -p), "a={a:e}, b={b:e}");
        }
    }

    #[test]
    fn test_two_prod_oversized_operand() {
        // One operand beyond the naive split range: pre-scaling keeps the
        // low part exact.
        let a = 1.9 * 1000f64.exp2();
        let b = 1.3 * (-20f64).exp2();
        let (p, e) = two_prod(a, b);
        assert!(p.is_finite());
        assert_eq!(fb(p) + fb(e), fb(a) * fb(b));

        let (p, e) = two_prod(b, a);
        assert_eq!(fb(p) + fb(e), fb(b) * fb(a));
    }

    #[test]
    fn test_two_prod_overflow_and_nan() {
        let (p, e) = two_prod(1e300, 1e300);
        assert!(p.is_infinite());
        assert!(e.is_nan());

        let (p, e) = two_prod(f64::NAN, 2.0);
        assert!(p.is_nan());
        assert!(e.is_nan());

        let (p, e) = two_prod(f64::INFINITY, 2.0);
        assert!(p.is_infinite());
        assert!(e.is_nan());
    }

    #[test]
    fn test_two_prod_underflow_has_no_low_part() {
        let (p, e) = two_prod(1e-200, 1e-200);
        assert_eq!(p, 0.0);
        assert_eq!(e, 0.0);
    }

    #[test]
    fn test_two_prod_exact_product_zero_error() {
        let (p, e) = two_prod(3.0, 0.5);
        assert_eq!(p, 1.5);
        assert_eq!(e.to_bits(), 0.0f64.to_bits(), "exact product: error is +0");
    }

    #[test]
    fn test_fast_two_sum_sign_of_zero_low_part() {
        // (1.0, -0.0): the low part must stay negative so a power of a
        // magnitude-one base keeps its round-off sign.
        let (s, e) = fast_two_sum(1.0, -0.0);
        assert_eq!(s, 1.0);
        assert_eq!(e.to_bits(), (-0.0f64).to_bits());

        let (s, e) = fast_two_sum(-1.0, 0.0);
        assert_eq!(s, -1.0);
        assert_eq!(e.to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_fast_two_sum_agrees_with_two_sum_in_range() {
        let mut state = 0xDA3E_39CB_94B9_5BDBu64;
        for _ in 0..100 {
            let a = rand_f64(&mut state);
            let b = rand_f64(&mut state) * 1e-5;
            let (big, small) = if a.abs() >= b.abs() { (a, b) } else { (b, a) };
            let (s1, e1) = two_sum(big, small);
            let (s2, e2) = fast_two_sum(big, small);
            assert_eq!(s1, s2);
            assert_eq!(e1, e2);
        }
    }

    #[test]
    fn test_two_diff_exact() {
        let mut state = 0xC2B2_AE3D_27D4_EB4Fu64;
        for _ in 0..100 {
            let a = rand_f64(&mut state);
            let b = rand_f64(&mut state);
            let (s, e) = two_diff(a, b);
            assert_eq!(s, a - b);
            assert_eq!(fb(s) + fb(e), fb(a) - fb(b), "a={a:e}, b={b:e}");
        }
    }

    #[test]
    fn test_two_diff_zero_sign_tracks_comparison() {
        // x - x is +0 under IEEE ordering semantics, even for negative x.
        let (s, _) = two_diff(-1.5, -1.5);
        assert_eq!(s.to_bits(), 0.0f64.to_bits());
        let (s, _) = fast_two_diff(-1.5, -1.5);
        assert_eq!(s.to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_fast_two_diff_exact() {
        let (s, e) = fast_two_diff(1.0, 1e-20);
        assert_eq!(fb(s) + fb(e), fb(1.0) - fb(1e-20));
    }
}
