//! Document mutation events.
//!
//! Every write into the tree is one of these events, applied by
//! [`crate::DocTree::dispatch`] and broadcast to subscribers afterwards.

use serde::Serialize;
use weft_types::{Scope, Value};

/// A mutation to apply to the document tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocEvent {
    /// The assignment primitive: merge when both sides are objects,
    /// replace otherwise.
    SetValue {
        scope: Scope,
        /// Page name; required for local-scope writes.
        page: Option<String>,
        path: Vec<String>,
        value: Value,
    },
    /// Replace the value at `path` outright (no merge).
    UpdateData {
        scope: Scope,
        page: Option<String>,
        path: Vec<String>,
        value: Value,
    },
    /// Merge a map of properties into the root scope.
    SetRootProperties { properties: Value },
    /// Remove a page subtree from the root.
    DeletePage { name: String },
}

/// A change notification delivered to subscribers after a successful
/// dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct DocChange {
    /// The event that was applied.
    pub event: DocEvent,
}

/// Subscriber callback invoked for every applied change.
pub type Subscriber = Box<dyn Fn(&DocChange) + Send + Sync>;
