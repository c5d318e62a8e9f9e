use thiserror::Error;

/// Fatal failures, returned immediately to the caller.
#[derive(Error, Debug)]
pub enum TaylorError {
    #[error("Lyapunov AD path requires V == D, got V = {v}, D = {d}")]
    VariablesStateMismatch { v: usize, d: usize },
    #[error("max_splits must be positive, got {max_splits}")]
    NonPositiveMaxSplits { max_splits: i64 },
    #[error("time grid is not monotonic (consistent with the integration direction)")]
    NonMonotonicGrid,
    #[error("right-hand side raised: {0}")]
    Rhs(String),
    #[error("Lyapunov AD path requires a Jacobian or an MPoly-valued state")]
    NoJacobianAvailable,
    #[error("box axis {axis} has hi <= lo")]
    InvalidBox { axis: usize },
}

/// Non-fatal conditions the run degrades gracefully from. Collected onto the
/// run's output rather than logged, since the core has no logging
/// collaborator of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum TaylorWarning {
    /// Step counter exceeded `max_steps`; the run returned a truncated
    /// trajectory.
    StepLimitReached { steps: usize },
    /// The parsed (specialized) coefficient routine failed at least once;
    /// the generic recursion was substituted for the remainder of the run.
    ParsedFallback { at_step: usize },
    /// ADS hit `max_splits`; some leaves that would otherwise have split
    /// kept integrating with their current (possibly stale) polynomial
    /// representation.
    SplitLimitReached { live_leaves: usize },
}

pub type Result<T> = std::result::Result<T, TaylorError>;
