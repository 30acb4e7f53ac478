//! The document tree proper.

use crate::event::{DocChange, DocEvent, Subscriber};
use crate::path::{get_path, set_path};
use crate::{DocError, DocResult};
use std::sync::{Arc, RwLock};
use weft_types::{RefExpr, Scope, Value};

/// Shared handle to a document tree.
///
/// The lock is `std::sync::RwLock`: guards are held only across synchronous
/// tree operations, never across awaits.
pub type SharedTree = Arc<RwLock<DocTree>>;

/// The shared mutable document.
///
/// Holds the root object (global scope) and broadcast subscribers. The local
/// scope is not stored separately: it is the subtree under the current page
/// name, snapshotted by [`DocTree::scope`].
pub struct DocTree {
    root: Value,
    base_url: Option<String>,
    subscribers: Vec<Subscriber>,
}

/// An immutable snapshot of the root and local scopes, taken once per
/// resolution/interpretation call so every lookup within the call sees one
/// consistent view.
#[derive(Debug, Clone)]
pub struct ScopeView {
    /// Snapshot of the whole document.
    pub root: Value,
    /// Snapshot of the current page's subtree (`Null` when absent).
    pub local: Value,
    /// The page the local scope was taken from.
    pub page: Option<String>,
    /// Configured base url for `~/` references.
    pub base_url: Option<String>,
}

impl DocTree {
    /// Create a tree from an initial document object.
    pub fn new(root: Value) -> Self {
        Self {
            root,
            base_url: None,
            subscribers: Vec::new(),
        }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }

    /// Wrap into the shared handle used across the runtime.
    pub fn into_shared(self) -> SharedTree {
        Arc::new(RwLock::new(self))
    }

    /// Set the base url used for `~/` references.
    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.base_url = Some(url.into());
    }

    /// Read-only access to the root value.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a dot-path in the root scope.
    pub fn get(&self, path: &[String]) -> Option<&Value> {
        get_path(&self.root, path)
    }

    /// Snapshot the root and local scopes for `page`.
    pub fn scope(&self, page: Option<&str>) -> ScopeView {
        let local = page
            .and_then(|p| self.root.get(p))
            .cloned()
            .unwrap_or(Value::Null);
        ScopeView {
            root: self.root.clone(),
            local,
            page: page.map(str::to_string),
            base_url: self.base_url.clone(),
        }
    }

    /// Register a change subscriber. Subscribers are invoked synchronously,
    /// in registration order, after each successful dispatch.
    pub fn subscribe(&mut self, sub: Subscriber) {
        self.subscribers.push(sub);
    }

    /// Apply one mutation event — the sole write path into the tree.
    pub fn dispatch(&mut self, event: DocEvent) -> DocResult<()> {
        tracing::debug!(?event, "doc dispatch");
        match &event {
            DocEvent::SetValue {
                scope,
                page,
                path,
                value,
            } => self.write(*scope, page.as_deref(), path, value.clone(), true)?,
            DocEvent::UpdateData {
                scope,
                page,
                path,
                value,
            } => self.write(*scope, page.as_deref(), path, value.clone(), false)?,
            DocEvent::SetRootProperties { properties } => {
                if let (Value::Object(root), Value::Object(props)) = (&mut self.root, properties) {
                    for (k, v) in props {
                        root.insert(k.clone(), v.clone());
                    }
                }
            }
            DocEvent::DeletePage { name } => {
                if let Value::Object(root) = &mut self.root {
                    root.remove(name);
                }
            }
        }

        let change = DocChange { event };
        for sub in &self.subscribers {
            sub(&change);
        }
        Ok(())
    }

    fn write(
        &mut self,
        scope: Scope,
        page: Option<&str>,
        path: &[String],
        value: Value,
        merge: bool,
    ) -> DocResult<()> {
        match scope {
            Scope::Root => {
                set_path(&mut self.root, path, value, merge);
                Ok(())
            }
            Scope::Local => {
                let page = page.ok_or(DocError::MissingPage)?;
                let mut full = Vec::with_capacity(path.len() + 1);
                full.push(page.to_string());
                full.extend_from_slice(path);
                set_path(&mut self.root, &full, value, merge);
                Ok(())
            }
            Scope::BaseUrl => Err(DocError::NotWritable(scope)),
        }
    }
}

impl ScopeView {
    /// Dereference a parsed reference against this snapshot.
    ///
    /// Returns `None` when the path dangles — callers substitute the
    /// original token back unchanged rather than failing.
    pub fn lookup(&self, r: &RefExpr) -> Option<Value> {
        match r.scope {
            Scope::Root => get_path(&self.root, &r.path).cloned(),
            Scope::Local => get_path(&self.local, &r.path).cloned(),
            Scope::BaseUrl => self
                .base_url
                .as_ref()
                .map(|base| Value::String(format!("{}/{}", base.trim_end_matches('/'), r.path.join("/")))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn scope_snapshots_root_and_local() {
        let tree = DocTree::new(json!({"A": {"b": 5}, "Page1": {"a": {"b": 7}}}));
        let view = tree.scope(Some("Page1"));
        assert_eq!(view.root["A"]["b"], json!(5));
        assert_eq!(view.local["a"]["b"], json!(7));
    }

    #[test]
    fn set_value_merges_then_replaces() {
        let mut tree = DocTree::new(json!({"path": {"x": 1}}));
        tree.dispatch(DocEvent::SetValue {
            scope: Scope::Root,
            page: None,
            path: vec!["path".into()],
            value: json!({"y": 2}),
        })
        .unwrap();
        assert_eq!(tree.root()["path"], json!({"x": 1, "y": 2}));

        tree.dispatch(DocEvent::SetValue {
            scope: Scope::Root,
            page: None,
            path: vec!["path".into()],
            value: json!(6),
        })
        .unwrap();
        assert_eq!(tree.root()["path"], json!(6));
    }

    #[test]
    fn local_write_lands_under_page() {
        let mut tree = DocTree::new(json!({"Page1": {}}));
        tree.dispatch(DocEvent::SetValue {
            scope: Scope::Local,
            page: Some("Page1".into()),
            path: vec!["form".into(), "name".into()],
            value: json!("ada"),
        })
        .unwrap();
        assert_eq!(tree.root()["Page1"]["form"]["name"], json!("ada"));
    }

    #[test]
    fn local_write_without_page_is_rejected() {
        let mut tree = DocTree::empty();
        let err = tree
            .dispatch(DocEvent::SetValue {
                scope: Scope::Local,
                page: None,
                path: vec!["x".into()],
                value: json!(1),
            })
            .unwrap_err();
        assert!(matches!(err, DocError::MissingPage));
    }

    #[test]
    fn subscribers_see_each_dispatch() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut tree = DocTree::empty();
        tree.subscribe(Box::new(|_change| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        }));
        tree.dispatch(DocEvent::SetRootProperties {
            properties: json!({"k": 1}),
        })
        .unwrap();
        tree.dispatch(DocEvent::DeletePage { name: "P".into() })
            .unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn base_url_lookup_joins() {
        let mut tree = DocTree::empty();
        tree.set_base_url("https://cdn.example.com/");
        let view = tree.scope(None);
        let r = RefExpr::parse("~/assets/logo.png").unwrap();
        assert_eq!(
            view.lookup(&r),
            Some(json!("https://cdn.example.com/assets/logo.png"))
        );
    }
}
