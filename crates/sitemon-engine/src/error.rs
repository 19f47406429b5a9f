//! Planning error types.

use thiserror::Error;

/// Result type alias for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors raised while building the phase plan. Always fatal; nothing
/// is probed once planning fails.
#[derive(Debug, Error)]
pub enum PlanError {
    /// No remaining service has all its prerequisites placed — the
    /// `after` graph is cyclic, or references an undeclared service.
    #[error(
        "cannot resolve service order, check your dependencies; remaining: '{}'",
        .0.join("', '")
    )]
    Unresolvable(Vec<String>),
}
