//! Weft reference resolver.
//!
//! Dereferences path expressions inside a JSON subtree against snapshotted
//! root/local scopes. Resolution runs in passes (keys, then values, then an
//! optional functions pass) and can be iterated to a fixpoint for chained
//! references. Resolving a non-reference value is the identity; a dangling
//! path leaves the original reference string unchanged. Only structural
//! failures raise [`PopulateError`], and those always propagate.

mod resolver;

pub use resolver::{
    resolve, resolve_to_fixpoint, BoundFn, Request, Resolved, ScopeOp, MAX_PASSES,
};

use thiserror::Error;

/// Which resolution pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Rewriting reference-valued keys.
    Keys,
    /// Depth-first rewriting of values.
    Values,
    /// Collecting builtin-call bindings.
    Functions,
}

/// Resolution failure, tagged with the pass that raised it.
#[derive(Debug, Clone, Error)]
#[error("populate failed in {phase:?} pass: {message}")]
pub struct PopulateError {
    pub phase: Phase,
    pub message: String,
}

impl PopulateError {
    pub(crate) fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

/// Result alias for resolver operations.
pub type ResolveResult<T> = Result<T, PopulateError>;
