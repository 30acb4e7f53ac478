//! Shared types for the Weft runtime.
//!
//! This crate defines the reference-expression grammar, the command AST
//! produced by classifying raw document values, and the boolean coercion
//! rules shared by the resolver and interpreter.

mod command;
mod reference;

pub use command::{to_boolean, Command, CommandKind};
pub use reference::{is_reference, RefExpr, Scope};

/// Document values are plain JSON trees throughout the runtime.
pub type Value = serde_json::Value;
