//! Rigor DD - extended-precision arithmetic kernel
//!
//! This crate provides the numeric core the Rigor statistics library
//! builds its distribution code on:
//! - `DoubleDouble`: a ~106-bit value held as two `f64`s
//! - error-free transforms (`two_sum`, `two_prod`, ...)
//! - binary scaling (`frexp`/`ldexp`) and the scaled integer-power family
//!
//! Survival-function terms and exact p-values need more precision than a
//! `f64` mantissa and more exponent range than a `f64` exponent; the
//! kernel supplies both without run-time arbitrary precision. Everything
//! is plain `Copy` value code: no allocation, no shared state, IEEE edge
//! semantics throughout.

mod dd;
mod eft;
mod error;
mod pow;
mod scale;

pub use dd::DoubleDouble;
pub use eft::{fast_two_diff, fast_two_sum, two_diff, two_prod, two_sum};
pub use error::DdError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{DdError, DoubleDouble};
}
