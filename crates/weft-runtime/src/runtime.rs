//! The runtime proper.

use crate::executor::InterpExecutor;
use crate::{RuntimeError, RuntimeResult};
use std::sync::{Arc, RwLock};
use weft_chain::{ActionChain, ActionLoader, DefaultLoader};
use weft_doc::{DocEvent, DocTree, SharedTree, Subscriber};
use weft_interp::{BuiltinRegistry, Interpreter, Outcome, GOTO_BUILTIN};
use weft_resolve::{resolve_to_fixpoint, Request, Resolved};
use weft_types::{Command, RefExpr, Value};

/// Inbound events — the sole write/eval path into the core.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run a command object through the interpreter.
    EvalObject { object: Value },
    /// Run the resolver over an object (to fixpoint).
    PopulateObject { object: Value },
    /// Replace the value at a reference destination outright.
    UpdateData { dest: String, value: Value },
    /// Merge properties into the root scope.
    SetRootProperties { properties: Value },
}

/// Owns the shared tree, the builtin registry, and the interpreter; hands
/// out action chains for triggered command lists.
pub struct Runtime {
    tree: SharedTree,
    registry: Arc<BuiltinRegistry>,
    interpreter: Arc<Interpreter>,
    current_page: Arc<RwLock<Option<String>>>,
}

impl Runtime {
    /// Create a runtime around an initial document. Registers the default
    /// goto builtin, which records the destination as the current page.
    pub fn new(initial: Value) -> Self {
        let tree = DocTree::new(initial).into_shared();
        let registry = Arc::new(BuiltinRegistry::new());
        let interpreter = Arc::new(Interpreter::new(
            Arc::clone(&tree),
            Arc::clone(&registry),
        ));
        let current_page = Arc::new(RwLock::new(None));

        let page = Arc::clone(&current_page);
        registry.register_fn(GOTO_BUILTIN, move |dest| {
            if let Some(name) = dest.as_str() {
                *page.write().unwrap() = Some(name.to_string());
            }
            Ok(dest)
        });

        Self {
            tree,
            registry,
            interpreter,
            current_page,
        }
    }

    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }

    pub fn registry(&self) -> &Arc<BuiltinRegistry> {
        &self.registry
    }

    pub fn interpreter(&self) -> &Arc<Interpreter> {
        &self.interpreter
    }

    /// The page providing the local scope for subsequent evaluation.
    pub fn current_page(&self) -> Option<String> {
        self.current_page.read().unwrap().clone()
    }

    pub fn set_page(&self, page: impl Into<String>) {
        *self.current_page.write().unwrap() = Some(page.into());
    }

    pub fn set_base_url(&self, url: impl Into<String>) {
        self.tree.write().unwrap().set_base_url(url);
    }

    /// Subscribe to document mutations (e.g. a renderer re-rendering
    /// affected nodes).
    pub fn subscribe(&self, sub: Subscriber) {
        self.tree.write().unwrap().subscribe(sub);
    }

    /// Build an action chain for a triggered command list. Every action is
    /// bound to the interpreter-backed executor.
    pub fn submit(&self, trigger: impl Into<String>, commands: Vec<Value>) -> ActionChain {
        let executor = Arc::new(InterpExecutor::new(
            Arc::clone(&self.interpreter),
            Arc::clone(&self.current_page),
        ));
        let loader = Arc::new(DefaultLoader::new(Some(executor)));
        self.submit_with_loader(trigger, commands, loader)
    }

    /// Build a chain with a caller-supplied loader (specialized actions).
    pub fn submit_with_loader(
        &self,
        trigger: impl Into<String>,
        commands: Vec<Value>,
        loader: Arc<dyn ActionLoader>,
    ) -> ActionChain {
        let trigger = trigger.into();
        tracing::debug!(%trigger, count = commands.len(), "submit");
        ActionChain::new(trigger, commands, loader)
    }

    /// Apply one inbound event. Returns the evaluated/resolved value, or
    /// `Null` for plain writes.
    pub async fn dispatch(&self, event: RuntimeEvent) -> RuntimeResult<Value> {
        let page = self.current_page();
        match event {
            RuntimeEvent::EvalObject { object } => {
                let command = Command::classify(object);
                let Outcome { value, .. } =
                    self.interpreter.eval(&command, page.as_deref()).await?;
                Ok(value)
            }
            RuntimeEvent::PopulateObject { object } => {
                let view = self.tree.read().unwrap().scope(page.as_deref());
                let mut request = Request::new(object);
                request.page = page;
                let Resolved { value, .. } = resolve_to_fixpoint(request, &view)?;
                Ok(value)
            }
            RuntimeEvent::UpdateData { dest, value } => {
                let r = RefExpr::parse(&dest).ok_or_else(|| {
                    RuntimeError::InvalidPayload(format!("`{dest}` is not a reference"))
                })?;
                self.tree.write().unwrap().dispatch(DocEvent::UpdateData {
                    scope: r.scope,
                    page,
                    path: r.path,
                    value,
                })?;
                Ok(Value::Null)
            }
            RuntimeEvent::SetRootProperties { properties } => {
                self.tree
                    .write()
                    .unwrap()
                    .dispatch(DocEvent::SetRootProperties { properties })?;
                Ok(Value::Null)
            }
        }
    }
}
