//! Observer hook table for [`crate::ActionChain`].
//!
//! Every hook is optional. Hooks fire synchronously at the points named in
//! the chain's execute/abort/inject protocols; a chain with no hooks pays
//! only an `Option` check.

use crate::{ActionSnapshot, ChainError};
use weft_types::Value;

type ChainFn = Box<dyn Fn() + Send + Sync>;
type ActionFn = Box<dyn Fn(&ActionSnapshot) + Send + Sync>;
type ResultFn = Box<dyn Fn(&ActionSnapshot, &Value) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&ChainError) + Send + Sync>;

/// Named observer callbacks.
#[derive(Default)]
pub struct ChainHooks {
    pub on_execute_start: Option<ChainFn>,
    pub on_execute_end: Option<ChainFn>,
    pub on_execute_error: Option<ErrorFn>,
    pub on_execute_result: Option<ResultFn>,
    pub on_before_action_execute: Option<ActionFn>,
    pub on_abort_start: Option<ChainFn>,
    pub on_abort_end: Option<ChainFn>,
    pub on_abort_error: Option<ErrorFn>,
    pub on_before_abort_action: Option<ActionFn>,
    pub on_after_abort_action: Option<ActionFn>,
    pub on_before_inject: Option<ActionFn>,
    pub on_after_inject: Option<ActionFn>,
    pub on_refresh: Option<ChainFn>,
}

impl ChainHooks {
    pub(crate) fn chain(hook: &Option<ChainFn>) {
        if let Some(h) = hook {
            h();
        }
    }

    pub(crate) fn action(hook: &Option<ActionFn>, snapshot: &ActionSnapshot) {
        if let Some(h) = hook {
            h(snapshot);
        }
    }

    pub(crate) fn result(hook: &Option<ResultFn>, snapshot: &ActionSnapshot, value: &Value) {
        if let Some(h) = hook {
            h(snapshot, value);
        }
    }

    pub(crate) fn error(hook: &Option<ErrorFn>, err: &ChainError) {
        if let Some(h) = hook {
            h(err);
        }
    }
}

impl std::fmt::Debug for ChainHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChainHooks { .. }")
    }
}
