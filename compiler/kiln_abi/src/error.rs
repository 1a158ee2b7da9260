//! Errors surfaced by the lowering engine.
//!
//! Invariant violations on well-formed input are bugs and are caught by
//! debug assertions; only these conditions reach the caller.

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    /// An allocation made while lowering failed: table and cache growth,
    /// copied field lists and struct names. Classifier scratch lists are
    /// inline and do not allocate in practice.
    #[error("out of memory while lowering types: {0}")]
    OutOfMemory(#[from] TryReserveError),
    /// The request names a feature the engine does not lower.
    #[error("lowering of {what} is not implemented")]
    Unimplemented { what: &'static str },
}

impl LowerError {
    pub(crate) fn unimplemented(what: &'static str) -> Self {
        tracing::debug!(what, "unimplemented lowering request");
        Self::Unimplemented { what }
    }
}
