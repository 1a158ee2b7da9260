//! Errors raised while building a target descriptor.

use thiserror::Error;

/// Error type for target configuration operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// Target triple is not in the supported list.
    #[error("unsupported target '{triple}'. Supported targets: {}", supported.join(", "))]
    UnsupportedTarget {
        triple: String,
        supported: Vec<&'static str>,
    },
    /// Invalid target triple format.
    #[error("invalid target triple '{triple}': {reason}")]
    InvalidTripleFormat { triple: String, reason: String },
    /// The architecture component names no known architecture.
    #[error("unknown architecture '{0}'")]
    UnknownArch(String),
    /// The data layout string derived from the descriptor disagrees with the
    /// one the native backend reports for the same triple.
    #[error("data layout mismatch for '{triple}':\n  expected: {expected}\n  actual:   {actual}")]
    LayoutMismatch {
        triple: String,
        expected: String,
        actual: String,
    },
}
