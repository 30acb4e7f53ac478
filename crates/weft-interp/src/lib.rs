//! Weft command interpreter.
//!
//! Evaluates classified commands against the shared document tree:
//! assignments, conditionals, gotos, builtin calls, and composite lists.
//! Builtin functions are named callables registered externally and invoked
//! by reference; all tree writes go through the document's single dispatch
//! point, never by direct mutation.

mod builtin;
mod interp;

pub use builtin::{Builtin, BuiltinRegistry, BuiltinResult, FnBuiltin, GOTO_BUILTIN};
pub use interp::{Interpreter, Outcome};

use thiserror::Error;

/// Interpreter errors.
#[derive(Debug, Error)]
pub enum InterpError {
    /// No builtin registered under the dereferenced name.
    #[error("no builtin registered as `{0}`")]
    UnknownBuiltin(String),
    /// A resolved callable failed during composite/eval execution. Wraps
    /// the builtin's own error.
    #[error("unable to execute fn `{name}`: {source}")]
    UnableToExecuteFn {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A tree write was rejected.
    #[error(transparent)]
    Doc(#[from] weft_doc::DocError),
    /// Reference resolution failed while preparing a command.
    #[error(transparent)]
    Populate(#[from] weft_resolve::PopulateError),
}

/// Result alias for interpreter operations.
pub type InterpResult<T> = Result<T, InterpError>;
