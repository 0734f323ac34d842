//! Errors for the checked construction surface
//!
//! The arithmetic kernel itself never returns errors: numeric edge
//! conditions (overflow, underflow, NaN) are correctly computed IEEE
//! results, and precondition violations are programmer errors checked by
//! debug assertions. `DdError` exists only where a caller hands us raw
//! parts and asks for validation.

use thiserror::Error;

/// Error type for checked double-double construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DdError {
    /// The pair `(hi, lo)` is not normalized: `hi + lo` rounds away from `hi`
    #[error("not a normalized double-double: hi + lo rounds away from hi")]
    NotNormalized,
}
