//! Weft action scheduler.
//!
//! An [`Action`] wraps one classified command with a timeout/abort lifecycle;
//! an [`ActionChain`] runs an ordered queue of actions strictly in sequence
//! under shared abort, watchdog, and observer machinery. Scheduling is
//! single-threaded cooperative: every suspension point is an await, and
//! cancellation is cooperative — an executor that ignores it still runs to
//! completion, but its result is discarded in favour of the recorded
//! [`AbortError`].

mod action;
mod chain;
mod hooks;

pub use action::{
    Action, ActionExecutor, ActionSnapshot, ActionStatus, ExecOutcome, DEFAULT_ACTION_TIMEOUT,
};
pub use chain::{
    ActionChain, ActionLoader, ChainResult, ChainSnapshot, ChainStatus, ClearKey, DefaultLoader,
    DEFAULT_STEP_TIMEOUT,
};
pub use hooks::ChainHooks;

use serde::Serialize;
use thiserror::Error;
use weft_types::Value;

/// A deliberate stop: abort(), a timeout, or an injected interrupt.
///
/// Never thrown past the chain boundary — it is attached as the affected
/// action's *result*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortError {
    pub reason: String,
}

impl AbortError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The result value recorded for an aborted action.
    pub fn to_value(&self) -> Value {
        serde_json::json!({ "abortError": { "reason": self.reason } })
    }

    /// Does this value carry an abort-error marker?
    pub fn is_abort_value(value: &Value) -> bool {
        value.get("abortError").is_some()
    }
}

/// Errors raised by executors and chain plumbing.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// The bound executor failed.
    #[error("executor failed: {0}")]
    Executor(String),
    /// An executor's abort handler failed; recorded, never fatal to a drain.
    #[error("abort handler failed: {0}")]
    AbortHandler(String),
}

/// Result alias for scheduler operations.
pub type ExecResult<T> = Result<T, ChainError>;
