//! Invariant checking for request-scoped navigation state.
//!
//! The frontier check walks every leaf, so it only runs after edits in debug
//! builds or with the `check-invariants` feature. Release builds keep the
//! constant-time budget check.

use crate::nav_error::NavError;

/// Whether full invariant validation runs after each edit.
pub const INVARIANTS_ENABLED: bool = cfg!(any(
    debug_assertions,
    feature = "strict-invariants",
    feature = "check-invariants"
));

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first violation found.
    fn validate_invariants(&self) -> Result<(), NavError>;
}

/// Run a fallible check and panic with context on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        if $crate::debug_invariants::INVARIANTS_ENABLED {
            if let Err(e) = $expr {
                panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
            }
        }
    };
}
