//! The three-pass resolution algorithm.

use crate::{Phase, PopulateError, ResolveResult};
use weft_doc::ScopeView;
use weft_types::{Command, CommandKind, RefExpr, Scope, Value};

/// Maximum fixpoint iterations for chained/indirect references.
pub const MAX_PASSES: usize = 8;

/// Nesting depth guard for the recursive walks.
const MAX_DEPTH: usize = 64;

/// Which reference operators a resolution pass rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeOp {
    /// `.path` — root scope.
    Root,
    /// `..path` — local scope.
    Local,
    /// `=.path` — eval references (callables).
    Eval,
    /// `~/path` — base-url references.
    BaseUrl,
    /// `@.path` — awaited references.
    Await,
}

impl ScopeOp {
    /// Does this operator select the given parsed reference?
    fn matches(self, r: &RefExpr) -> bool {
        match self {
            ScopeOp::Eval => r.eval,
            ScopeOp::Await => r.awaited,
            ScopeOp::Root => !r.eval && r.scope == Scope::Root,
            ScopeOp::Local => !r.eval && r.scope == Scope::Local,
            ScopeOp::BaseUrl => !r.eval && r.scope == Scope::BaseUrl,
        }
    }
}

/// A resolution request.
#[derive(Debug, Clone)]
pub struct Request {
    /// The subtree to resolve.
    pub source: Value,
    /// Which reference operators to rewrite, in order.
    pub operators: Vec<ScopeOp>,
    /// Keys never dereferenced or descended into (guards recursive blow-up).
    pub skip: Vec<String>,
    /// Page name providing the local scope.
    pub page: Option<String>,
    /// Run the functions pass, collecting builtin-call bindings.
    pub with_fns: bool,
}

impl Request {
    /// A request with the default operator set (root, local, base-url).
    pub fn new(source: Value) -> Self {
        Self {
            source,
            operators: vec![ScopeOp::Root, ScopeOp::Local, ScopeOp::BaseUrl],
            skip: Vec::new(),
            page: None,
            with_fns: false,
        }
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn with_operators(mut self, operators: Vec<ScopeOp>) -> Self {
        self.operators = operators;
        self
    }

    pub fn with_skip(mut self, skip: Vec<String>) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_fns(mut self) -> Self {
        self.with_fns = true;
        self
    }
}

/// A builtin-call leaf found during the functions pass, bound lazily by the
/// caller against its registry.
#[derive(Debug, Clone)]
pub struct BoundFn {
    /// JSON-pointer location of the leaf within the resolved tree.
    pub pointer: String,
    /// The classified builtin-call command at that location.
    pub call: Command,
}

/// Output of [`resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The rewritten tree.
    pub value: Value,
    /// Builtin-call bindings (empty unless `with_fns` was requested).
    pub fns: Vec<BoundFn>,
}

/// Run the key, value, and (optional) function passes once over `source`.
pub fn resolve(request: Request, view: &ScopeView) -> ResolveResult<Resolved> {
    let Request {
        source,
        operators,
        skip,
        with_fns,
        ..
    } = request;

    let mut value = source;
    rewrite_keys(&mut value, &operators, &skip, view, 0)?;
    rewrite_values(&mut value, &operators, &skip, view, 0)?;

    let mut fns = Vec::new();
    if with_fns {
        collect_fns(&value, String::new(), &mut fns, 0)?;
    }

    Ok(Resolved { value, fns })
}

/// Iterate [`resolve`] until the tree stops changing, bounded by
/// [`MAX_PASSES`]. Handles chained references (reference → reference →
/// value) without relying on a fixed pass count.
pub fn resolve_to_fixpoint(request: Request, view: &ScopeView) -> ResolveResult<Resolved> {
    let mut current = request;
    let mut passes = 0;
    loop {
        let prev = current.source.clone();
        let resolved = resolve(current.clone(), view)?;
        passes += 1;
        if resolved.value == prev || passes >= MAX_PASSES {
            tracing::debug!(passes, "resolution converged");
            return Ok(resolved);
        }
        current.source = resolved.value;
    }
}

// ── Pass 1: keys ──────────────────────────────────────────────────────

fn rewrite_keys(
    value: &mut Value,
    ops: &[ScopeOp],
    skip: &[String],
    view: &ScopeView,
    depth: usize,
) -> ResolveResult<()> {
    if depth > MAX_DEPTH {
        return Err(PopulateError::new(Phase::Keys, "max nesting depth exceeded"));
    }
    match value {
        Value::Object(map) => {
            let mut renames = Vec::new();
            for key in map.keys() {
                if skip.iter().any(|s| s == key) {
                    continue;
                }
                let Some(r) = RefExpr::parse(key) else {
                    continue;
                };
                // Assignment destinations and eval keys are command syntax,
                // not data references; the interpreter owns those.
                if r.assign || r.eval {
                    continue;
                }
                if !ops.iter().any(|op| op.matches(&r)) {
                    continue;
                }
                match view.lookup(&r) {
                    Some(Value::String(new_key)) => renames.push((key.clone(), new_key)),
                    Some(other) => {
                        return Err(PopulateError::new(
                            Phase::Keys,
                            format!("key `{key}` resolved to non-string {other}"),
                        ));
                    }
                    None => {}
                }
            }
            for (old, new) in renames {
                if let Some(v) = map.remove(&old) {
                    map.insert(new, v);
                }
            }
            for (key, child) in map.iter_mut() {
                if skip.iter().any(|s| s == key) {
                    continue;
                }
                rewrite_keys(child, ops, skip, view, depth + 1)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_keys(item, ops, skip, view, depth + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}

// ── Pass 2: values ────────────────────────────────────────────────────

fn rewrite_values(
    value: &mut Value,
    ops: &[ScopeOp],
    skip: &[String],
    view: &ScopeView,
    depth: usize,
) -> ResolveResult<()> {
    if depth > MAX_DEPTH {
        return Err(PopulateError::new(
            Phase::Values,
            "max nesting depth exceeded",
        ));
    }
    match value {
        Value::String(s) => {
            let Some(r) = RefExpr::parse(s) else {
                return Ok(());
            };
            // Eval references name callables; substitution is the
            // interpreter's job.
            if r.eval {
                return Ok(());
            }
            if !ops.iter().any(|op| op.matches(&r)) {
                return Ok(());
            }
            // A dangling path keeps the original token.
            if let Some(resolved) = view.lookup(&r) {
                *value = resolved;
            }
        }
        Value::Object(map) => {
            // Builtin-call expressions are left intact for the interpreter.
            if is_builtin_call(map) {
                return Ok(());
            }
            for (key, child) in map.iter_mut() {
                if skip.iter().any(|s| s == key) {
                    continue;
                }
                rewrite_values(child, ops, skip, view, depth + 1)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_values(item, ops, skip, view, depth + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn is_builtin_call(map: &serde_json::Map<String, Value>) -> bool {
    map.len() == 1
        && map
            .keys()
            .next()
            .and_then(|k| RefExpr::parse(k))
            .is_some_and(|r| r.eval)
}

// ── Pass 3: functions ─────────────────────────────────────────────────

fn collect_fns(
    value: &Value,
    pointer: String,
    out: &mut Vec<BoundFn>,
    depth: usize,
) -> ResolveResult<()> {
    if depth > MAX_DEPTH {
        return Err(PopulateError::new(
            Phase::Functions,
            "max nesting depth exceeded",
        ));
    }
    match value {
        Value::Object(map) => {
            if is_builtin_call(map) {
                let call = Command::classify(value.clone());
                debug_assert!(matches!(call.kind, CommandKind::BuiltinCall { .. }));
                out.push(BoundFn { pointer, call });
                return Ok(());
            }
            for (key, child) in map {
                collect_fns(child, format!("{pointer}/{key}"), out, depth + 1)?;
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_fns(item, format!("{pointer}/{i}"), out, depth + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_doc::DocTree;

    fn view(root: Value, page: Option<&str>) -> ScopeView {
        DocTree::new(root).scope(page)
    }

    #[test]
    fn identity_on_reference_free_tree() {
        let source = json!({"title": "home", "count": 3, "tags": ["a", "b"]});
        let v = view(json!({}), None);
        let out = resolve(Request::new(source.clone()), &v).unwrap();
        assert_eq!(out.value, source);
    }

    #[test]
    fn resolves_root_and_local_scopes() {
        let v = view(json!({"A": {"b": 5}, "P": {"a": {"b": 7}}}), Some("P"));
        let out = resolve(
            Request::new(json!({"x": "..a.b", "y": ".A.b"})).with_page("P"),
            &v,
        )
        .unwrap();
        assert_eq!(out.value, json!({"x": 7, "y": 5}));
    }

    #[test]
    fn dangling_reference_is_kept_verbatim() {
        let v = view(json!({"A": {"b": 5}}), None);
        let out = resolve(Request::new(json!({"z": ".A.z"})), &v).unwrap();
        assert_eq!(out.value, json!({"z": ".A.z"}));
    }

    #[test]
    fn reference_valued_keys_are_rewritten() {
        let v = view(json!({"Global": {"titleKey": "title"}}), None);
        let out = resolve(Request::new(json!({".Global.titleKey": "home"})), &v).unwrap();
        assert_eq!(out.value, json!({"title": "home"}));
    }

    #[test]
    fn key_resolving_to_non_string_is_a_keys_phase_error() {
        let v = view(json!({"Global": {"titleKey": {"not": "a string"}}}), None);
        let err = resolve(Request::new(json!({".Global.titleKey": 1})), &v).unwrap_err();
        assert_eq!(err.phase, Phase::Keys);
    }

    #[test]
    fn skip_list_guards_subtrees() {
        let v = view(json!({"A": {"b": 5}}), None);
        let out = resolve(
            Request::new(json!({"style": {"c": ".A.b"}, "d": ".A.b"}))
                .with_skip(vec!["style".into()]),
            &v,
        )
        .unwrap();
        assert_eq!(out.value, json!({"style": {"c": ".A.b"}, "d": 5}));
    }

    #[test]
    fn builtin_call_leaves_are_left_for_the_interpreter() {
        let v = view(json!({"A": {"b": 5}}), None);
        let source = json!({"onClick": {"=.builtin.goto": {"dataIn": "Next"}}});
        let out = resolve(Request::new(source.clone()), &v).unwrap();
        assert_eq!(out.value, source);
    }

    #[test]
    fn functions_pass_collects_bindings() {
        let v = view(json!({}), None);
        let source = json!({"onClick": {"=.builtin.goto": {"dataIn": "Next"}}});
        let out = resolve(Request::new(source).with_fns(), &v).unwrap();
        assert_eq!(out.fns.len(), 1);
        assert_eq!(out.fns[0].pointer, "/onClick");
    }

    #[test]
    fn fixpoint_resolves_chained_references() {
        // .a points at .b which holds the value.
        let v = view(json!({"a": ".b", "b": 42}), None);
        let out = resolve_to_fixpoint(Request::new(json!({"x": ".a"})), &v).unwrap();
        assert_eq!(out.value, json!({"x": 42}));
    }

    #[test]
    fn operator_list_limits_rewrites() {
        let v = view(json!({"A": {"b": 5}, "P": {"c": 9}}), Some("P"));
        let out = resolve(
            Request::new(json!({"x": ".A.b", "y": "..c"}))
                .with_operators(vec![ScopeOp::Local])
                .with_page("P"),
            &v,
        )
        .unwrap();
        assert_eq!(out.value, json!({"x": ".A.b", "y": 9}));
    }
}
