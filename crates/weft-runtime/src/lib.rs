//! Weft runtime facade.
//!
//! Wires the document tree, resolver, interpreter, and action scheduler
//! together behind two operations: [`Runtime::submit`], which turns a
//! triggered command list into an [`ActionChain`] whose actions run through
//! the interpreter, and [`Runtime::dispatch`], the sole inbound write/eval
//! path. No UI, no persistence: collaborators subscribe to document changes
//! and register builtins.

mod executor;
mod runtime;

pub use executor::InterpExecutor;
pub use runtime::{Runtime, RuntimeEvent};

// Re-export the surface collaborators actually use.
pub use weft_chain::{
    ActionChain, ActionLoader, ActionSnapshot, ActionStatus, ChainHooks, ChainResult, ChainStatus,
    DefaultLoader,
};
pub use weft_doc::{DocChange, DocEvent, DocTree, SharedTree};
pub use weft_interp::{Builtin, BuiltinRegistry, Interpreter, GOTO_BUILTIN};
pub use weft_resolve::{Request, Resolved, ScopeOp};
pub use weft_types::{Command, CommandKind, RefExpr, Scope, Value};

use thiserror::Error;

/// Errors surfaced by the runtime facade.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Interp(#[from] weft_interp::InterpError),
    #[error(transparent)]
    Populate(#[from] weft_resolve::PopulateError),
    #[error(transparent)]
    Doc(#[from] weft_doc::DocError),
    /// The event payload did not parse (bad target reference).
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
