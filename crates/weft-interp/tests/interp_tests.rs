//! Integration tests for the command interpreter.
//!
//! Covers conditional coercion and branch handling, merge-vs-replace
//! assignment, goto's chain-abort signal, builtin dataIn/dataOut plumbing,
//! and composite ordering with live-tree visibility.

use serde_json::json;
use std::sync::Arc;
use weft_doc::{DocTree, SharedTree};
use weft_interp::{BuiltinRegistry, InterpError, Interpreter, GOTO_BUILTIN};
use weft_types::{Command, Value};

fn setup(root: Value) -> (Interpreter, SharedTree) {
    let tree = DocTree::new(root).into_shared();
    let registry = Arc::new(BuiltinRegistry::new());
    (Interpreter::new(Arc::clone(&tree), registry), tree)
}

fn root_of(tree: &SharedTree) -> Value {
    tree.read().unwrap().root().clone()
}

async fn eval(interp: &Interpreter, raw: Value) -> weft_interp::Outcome {
    interp
        .eval(&Command::classify(raw), None)
        .await
        .expect("eval failed")
}

// ── Conditionals ─────────────────────────────────────────────────────────

#[tokio::test]
async fn conditional_selects_by_boolean() {
    let (interp, _) = setup(json!({}));
    assert_eq!(eval(&interp, json!({"if": [true, "X", "Y"]})).await.value, json!("X"));
    assert_eq!(eval(&interp, json!({"if": [false, "X", "Y"]})).await.value, json!("Y"));
}

#[tokio::test]
async fn conditional_coerces_boolean_like_strings() {
    let (interp, _) = setup(json!({}));
    assert_eq!(
        eval(&interp, json!({"if": ["false", "X", "Y"]})).await.value,
        json!("Y")
    );
    assert_eq!(
        eval(&interp, json!({"if": ["true", "X", "Y"]})).await.value,
        json!("X")
    );
}

#[tokio::test]
async fn conditional_resolves_reference_condition() {
    let (interp, _) = setup(json!({"flags": {"on": true, "off": false}}));
    assert_eq!(
        eval(&interp, json!({"if": [".flags.on", "X", "Y"]})).await.value,
        json!("X")
    );
    assert_eq!(
        eval(&interp, json!({"if": [".flags.off", "X", "Y"]})).await.value,
        json!("Y")
    );
    // Dangling reference condition is false.
    assert_eq!(
        eval(&interp, json!({"if": [".flags.gone", "X", "Y"]})).await.value,
        json!("Y")
    );
}

#[tokio::test]
async fn conditional_branch_can_be_an_assignment() {
    let (interp, tree) = setup(json!({"mode": 0}));
    eval(&interp, json!({"if": [true, {".mode@": 1}, {".mode@": 2}]})).await;
    assert_eq!(root_of(&tree)["mode"], json!(1));
}

#[tokio::test]
async fn conditional_branch_reference_resolves() {
    let (interp, _) = setup(json!({"labels": {"yes": "confirmed"}}));
    assert_eq!(
        eval(&interp, json!({"if": [true, ".labels.yes", "Y"]})).await.value,
        json!("confirmed")
    );
}

#[tokio::test]
async fn conditional_goto_branch_signals_abort() {
    let (interp, _) = setup(json!({}));
    interp
        .registry()
        .register_fn(GOTO_BUILTIN, |dest| Ok(dest));
    let out = eval(&interp, json!({"if": [true, {"goto": "Next"}, "Y"]})).await;
    assert!(out.abort);
    assert_eq!(out.value, json!("Next"));
}

#[tokio::test]
async fn conditional_plain_branch_returns_verbatim() {
    let (interp, _) = setup(json!({}));
    let branch = json!({"component": "Popup", "props": {"open": true}});
    let out = eval(&interp, json!({"if": [true, branch.clone(), "Y"]})).await;
    assert_eq!(out.value, branch);
    assert!(!out.abort);
}

#[tokio::test]
async fn conditional_eval_object_condition_dispatches() {
    let (interp, _) = setup(json!({}));
    interp.registry().register_fn("check.loggedIn", |_| Ok(json!(true)));
    let out = eval(
        &interp,
        json!({"if": [{"=.check.loggedIn": {}}, "X", "Y"]}),
    )
    .await;
    assert_eq!(out.value, json!("X"));
}

// ── Assignment ───────────────────────────────────────────────────────────

#[tokio::test]
async fn assignment_replaces_scalars() {
    let (interp, tree) = setup(json!({"path": 4}));
    eval(&interp, json!({".path@": 6})).await;
    assert_eq!(root_of(&tree)["path"], json!(6));
}

#[tokio::test]
async fn assignment_merges_objects() {
    let (interp, tree) = setup(json!({"path": {"x": 1}}));
    eval(&interp, json!({".path@": {"y": 2}})).await;
    assert_eq!(root_of(&tree)["path"], json!({"x": 1, "y": 2}));
}

#[tokio::test]
async fn assignment_to_local_scope_lands_under_page() {
    let tree = DocTree::new(json!({"P": {"form": {}}})).into_shared();
    let interp = Interpreter::new(Arc::clone(&tree), Arc::new(BuiltinRegistry::new()));
    interp
        .eval(&Command::classify(json!({"..form.name@": "ada"})), Some("P"))
        .await
        .unwrap();
    assert_eq!(root_of(&tree)["P"]["form"]["name"], json!("ada"));
}

#[tokio::test]
async fn assignment_value_references_are_resolved() {
    let (interp, tree) = setup(json!({"src": 7, "dst": 0}));
    eval(&interp, json!({".dst@": ".src"})).await;
    assert_eq!(root_of(&tree)["dst"], json!(7));
}

// ── Goto ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn goto_dispatches_builtin_and_aborts() {
    let (interp, _) = setup(json!({}));
    interp.registry().register_fn(GOTO_BUILTIN, |dest| Ok(dest));
    let out = eval(&interp, json!({"goto": "SignIn"})).await;
    assert!(out.abort);
    assert_eq!(out.value, json!("SignIn"));
}

#[tokio::test]
async fn goto_without_registered_builtin_errors() {
    let (interp, _) = setup(json!({}));
    let err = interp
        .eval(&Command::classify(json!({"goto": "SignIn"})), None)
        .await
        .unwrap_err();
    assert!(matches!(err, InterpError::UnknownBuiltin(_)));
}

// ── Builtin calls ────────────────────────────────────────────────────────

#[tokio::test]
async fn builtin_call_receives_resolved_data_in() {
    let (interp, _) = setup(json!({"user": {"name": "ada"}}));
    interp.registry().register_fn("fmt.greet", |data_in| {
        Ok(json!(format!("hello {}", data_in["who"].as_str().unwrap())))
    });
    let out = eval(
        &interp,
        json!({"=.fmt.greet": {"dataIn": {"who": ".user.name"}}}),
    )
    .await;
    assert_eq!(out.value, json!("hello ada"));
}

#[tokio::test]
async fn builtin_call_stores_data_out() {
    let (interp, tree) = setup(json!({}));
    interp.registry().register_fn("gen.id", |_| Ok(json!("id-1")));
    eval(
        &interp,
        json!({"=.gen.id": {"dataIn": {}, "dataOut": ".session.id"}}),
    )
    .await;
    assert_eq!(root_of(&tree)["session"]["id"], json!("id-1"));
}

#[tokio::test]
async fn builtin_failure_wraps_as_unable_to_execute_fn() {
    let (interp, _) = setup(json!({}));
    interp
        .registry()
        .register_fn("bad.fn", |_| Err("backing store offline".into()));
    let err = interp
        .eval(&Command::classify(json!({"=.bad.fn": {}})), None)
        .await
        .unwrap_err();
    match err {
        InterpError::UnableToExecuteFn { name, .. } => assert_eq!(name, "bad.fn"),
        other => panic!("expected UnableToExecuteFn, got {other}"),
    }
}

#[tokio::test]
async fn unregistered_builtin_errors() {
    let (interp, _) = setup(json!({}));
    let err = interp
        .eval(&Command::classify(json!({"=.no.such.fn": {}})), None)
        .await
        .unwrap_err();
    assert!(matches!(err, InterpError::UnknownBuiltin(_)));
}

#[tokio::test]
async fn builtin_name_indirection_through_document() {
    // The document holds a string at the path naming the real builtin.
    let (interp, _) = setup(json!({"fns": {"save": "store.save"}}));
    interp.registry().register_fn("store.save", |_| Ok(json!("saved")));
    let out = eval(&interp, json!({"=.fns.save": {}})).await;
    assert_eq!(out.value, json!("saved"));
}

// ── Composites ───────────────────────────────────────────────────────────

#[tokio::test]
async fn composite_runs_in_order_and_sees_prior_writes() {
    let (interp, tree) = setup(json!({"count": 1}));
    // The second command reads what the first wrote.
    let out = eval(
        &interp,
        json!([
            {".count@": 5},
            {".copy@": ".count"},
        ]),
    )
    .await;
    assert!(!out.abort);
    assert_eq!(root_of(&tree)["copy"], json!(5));
}

#[tokio::test]
async fn composite_short_circuits_on_goto() {
    let (interp, tree) = setup(json!({"after": 0}));
    interp.registry().register_fn(GOTO_BUILTIN, |dest| Ok(dest));
    let out = eval(
        &interp,
        json!([
            {"goto": "Away"},
            {".after@": 1},
        ]),
    )
    .await;
    assert!(out.abort);
    // The trailing assignment never ran.
    assert_eq!(root_of(&tree)["after"], json!(0));
    assert_eq!(out.value, json!(["Away"]));
}

#[tokio::test]
async fn verbatim_commands_pass_through() {
    let (interp, _) = setup(json!({}));
    let raw = json!({"style": {"color": "red"}});
    let out = eval(&interp, raw.clone()).await;
    assert_eq!(out.value, raw);
    assert!(!out.abort);
}
