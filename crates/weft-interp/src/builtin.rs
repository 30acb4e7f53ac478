//! Builtin function registry.
//!
//! The external layer registers named callables; eval-objects invoke them by
//! reference. The registry is read-mostly and may be extended additively at
//! runtime without invalidating in-flight chains.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use weft_types::Value;

/// Registry name the goto command dispatches through.
pub const GOTO_BUILTIN: &str = "builtin.goto";

/// What a builtin returns. Errors are wrapped into
/// [`crate::InterpError::UnableToExecuteFn`] by the interpreter.
pub type BuiltinResult = Result<Value, Box<dyn std::error::Error + Send + Sync>>;

/// A named callable invocable by reference from eval-objects.
#[async_trait]
pub trait Builtin: Send + Sync {
    /// Invoke with the resolved `dataIn` payload (`Null` when absent).
    async fn call(&self, data_in: Value) -> BuiltinResult;
}

/// Adapter turning a plain closure into a [`Builtin`].
pub struct FnBuiltin<F>(pub F);

#[async_trait]
impl<F> Builtin for FnBuiltin<F>
where
    F: Fn(Value) -> BuiltinResult + Send + Sync,
{
    async fn call(&self, data_in: Value) -> BuiltinResult {
        (self.0)(data_in)
    }
}

/// Name → callable table.
#[derive(Default)]
pub struct BuiltinRegistry {
    fns: RwLock<HashMap<String, Arc<dyn Builtin>>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a builtin under `name`.
    pub fn register(&self, name: impl Into<String>, builtin: Arc<dyn Builtin>) {
        self.fns.write().unwrap().insert(name.into(), builtin);
    }

    /// Convenience: register a synchronous closure.
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Value) -> BuiltinResult + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnBuiltin(f)));
    }

    /// Look up a builtin by its dereferenced name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.fns.read().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.read().unwrap().contains_key(name)
    }
}
