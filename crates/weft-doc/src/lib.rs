//! Weft document tree.
//!
//! The document is one shared mutable JSON object: the root scope. Each page
//! is a subtree under its name; the page currently being processed is the
//! local scope. All mutation funnels through [`DocTree::dispatch`], which
//! applies exactly one [`DocEvent`] and broadcasts the change to subscribers.

mod event;
mod path;
mod tree;

pub use event::{DocChange, DocEvent, Subscriber};
pub use path::{get_path, set_path};
pub use tree::{DocTree, ScopeView, SharedTree};

use thiserror::Error;

/// Errors raised by document-tree dispatch.
#[derive(Debug, Error)]
pub enum DocError {
    /// A local-scope write was dispatched without a page name.
    #[error("local-scope write requires a page name")]
    MissingPage,
    /// The event names a scope that cannot be written (base-url).
    #[error("scope {0:?} is not a writable target")]
    NotWritable(weft_types::Scope),
    /// A path segment walked through a non-object value.
    #[error("path `{0}` does not traverse objects")]
    BadPath(String),
}

/// Result alias for document-tree operations.
pub type DocResult<T> = Result<T, DocError>;
