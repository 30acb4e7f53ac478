//! Reference-expression grammar.
//!
//! A reference expression is a string token whose prefix designates a scope
//! and whose remainder is a dot-path into the document tree:
//!
//! - `.path.to.key`  — root (whole document) scope
//! - `..path.to.key` — local (current page) scope
//! - `=.path` / `=..path` — eval reference: names a callable at the path
//! - `~/suffix`      — resolved against the configured base url
//! - leading `@`     — the resolved value is awaited (`@.path`)
//! - trailing `@` on an object key — assignment destination (`.path@`)
//!
//! Plain strings that do not match the grammar are never an error; parsing
//! returns `None` and the caller passes the string through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which scope a reference dereferences against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Root scope: the whole shared document.
    Root,
    /// Local scope: the subtree for the page currently processed.
    Local,
    /// Base-url scope: the remainder is joined onto a configured base string.
    BaseUrl,
}

/// A parsed reference expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefExpr {
    /// Scope the dot-path is resolved against.
    pub scope: Scope,
    /// Dot-path segments (slash segments for base-url references).
    pub path: Vec<String>,
    /// `=` prefix: the referenced value is a callable, not a plain value.
    pub eval: bool,
    /// Leading `@`: the resolved value is awaited.
    pub awaited: bool,
    /// Trailing `@` (key position): the reference is an assignment destination.
    pub assign: bool,
    /// The original token, kept so an unresolvable reference can be
    /// substituted back unchanged.
    pub raw: String,
}

impl RefExpr {
    /// Parse a string token as a reference expression.
    ///
    /// Returns `None` when the token does not match the grammar — the token
    /// is then an ordinary string value.
    pub fn parse(token: &str) -> Option<RefExpr> {
        let raw = token.to_string();
        let mut rest = token;

        let awaited = rest.starts_with('@');
        if awaited {
            rest = &rest[1..];
        }

        let eval = rest.starts_with('=');
        if eval {
            rest = &rest[1..];
        }

        let assign = rest.ends_with('@');
        if assign {
            rest = &rest[..rest.len() - 1];
        }

        if let Some(suffix) = rest.strip_prefix("~/") {
            if suffix.is_empty() {
                return None;
            }
            return Some(RefExpr {
                scope: Scope::BaseUrl,
                path: suffix.split('/').map(str::to_string).collect(),
                eval,
                awaited,
                assign,
                raw,
            });
        }

        let (scope, body) = if let Some(body) = rest.strip_prefix("..") {
            (Scope::Local, body)
        } else if let Some(body) = rest.strip_prefix('.') {
            (Scope::Root, body)
        } else {
            return None;
        };

        // The path must start with an identifier character; "1.5" or "..."
        // are not references.
        if !body
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        {
            return None;
        }

        Some(RefExpr {
            scope,
            path: body.split('.').map(str::to_string).collect(),
            eval,
            awaited,
            assign,
            raw,
        })
    }

    /// The dot-path as a single string (no scope prefix).
    pub fn path_str(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for RefExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Cheap predicate: does this token look like a reference expression?
pub fn is_reference(token: &str) -> bool {
    RefExpr::parse(token).is_some()
}
