//! Command dispatch.

use crate::builtin::{BuiltinRegistry, GOTO_BUILTIN};
use crate::{InterpError, InterpResult};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use weft_doc::{DocEvent, ScopeView, SharedTree};
use weft_resolve::{resolve, Request};
use weft_types::{is_reference, to_boolean, Command, CommandKind, RefExpr, Value};

/// Result of interpreting one command.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// The command's value.
    pub value: Value,
    /// The command terminates further chain execution (goto).
    pub abort: bool,
}

impl Outcome {
    fn value(value: Value) -> Self {
        Self {
            value,
            abort: false,
        }
    }
}

/// Evaluates commands against the shared document tree, invoking registered
/// builtins by reference. All writes go through the tree's dispatch point.
pub struct Interpreter {
    tree: SharedTree,
    registry: Arc<BuiltinRegistry>,
}

impl Interpreter {
    pub fn new(tree: SharedTree, registry: Arc<BuiltinRegistry>) -> Self {
        Self { tree, registry }
    }

    pub fn registry(&self) -> &Arc<BuiltinRegistry> {
        &self.registry
    }

    /// Snapshot the scopes for `page`. Taken fresh per evaluation step so
    /// composite commands observe earlier side effects.
    fn view(&self, page: Option<&str>) -> ScopeView {
        self.tree.read().unwrap().scope(page)
    }

    /// Interpret one command.
    pub async fn eval(&self, command: &Command, page: Option<&str>) -> InterpResult<Outcome> {
        self.eval_boxed(command, page).await
    }

    // Recursive dispatch goes through a boxed future.
    fn eval_boxed<'a>(
        &'a self,
        command: &'a Command,
        page: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = InterpResult<Outcome>> + Send + 'a>> {
        Box::pin(async move {
            tracing::trace!(kind = command.kind_name(), "interp eval");
            match &command.kind {
                CommandKind::Assignment { dest, value } => {
                    self.eval_assignment(dest, value, page).await
                }
                CommandKind::Conditional {
                    cond,
                    if_true,
                    if_false,
                } => self.eval_conditional(cond, if_true, if_false, page).await,
                CommandKind::Goto { destination } => self.eval_goto(destination, page).await,
                CommandKind::BuiltinCall {
                    name,
                    data_in,
                    data_out,
                } => {
                    self.eval_builtin_call(name, data_in.as_ref(), data_out.as_ref(), page)
                        .await
                }
                CommandKind::Composite(commands) => self.eval_composite(commands, page).await,
                CommandKind::Verbatim(value) => Ok(Outcome::value(value.clone())),
            }
        })
    }

    // ── Assignment ────────────────────────────────────────────────────

    /// Merge-or-replace write at the destination path, routed through the
    /// tree's single set-value event. The value's own references are
    /// resolved first.
    async fn eval_assignment(
        &self,
        dest: &RefExpr,
        value: &Value,
        page: Option<&str>,
    ) -> InterpResult<Outcome> {
        let resolved = self.resolve_value(value.clone(), page)?;
        self.tree.write().unwrap().dispatch(DocEvent::SetValue {
            scope: dest.scope,
            page: page.map(str::to_string),
            path: dest.path.clone(),
            value: resolved.clone(),
        })?;
        Ok(Outcome::value(resolved))
    }

    // ── Conditional ───────────────────────────────────────────────────

    async fn eval_conditional(
        &self,
        cond: &Value,
        if_true: &Value,
        if_false: &Value,
        page: Option<&str>,
    ) -> InterpResult<Outcome> {
        let truth = self.coerce_condition(cond, page).await?;
        let branch = if truth { if_true } else { if_false };
        self.eval_branch(branch, page).await
    }

    /// Coerce the condition slot to a boolean: booleans pass through,
    /// reference strings resolve then coerce, nested eval-objects dispatch
    /// recursively, everything else goes through `to_boolean`.
    async fn coerce_condition(&self, cond: &Value, page: Option<&str>) -> InterpResult<bool> {
        match cond {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if is_reference(s) => {
                let r = RefExpr::parse(s).unwrap();
                // A dangling reference is false.
                Ok(self
                    .view(page)
                    .lookup(&r)
                    .map(|v| to_boolean(&v))
                    .unwrap_or(false))
            }
            Value::Object(_) => {
                let cmd = Command::classify(cond.clone());
                if matches!(cmd.kind, CommandKind::BuiltinCall { .. }) {
                    let out = self.eval_boxed(&cmd, page).await?;
                    Ok(to_boolean(&out.value))
                } else {
                    Ok(to_boolean(cond))
                }
            }
            other => Ok(to_boolean(other)),
        }
    }

    /// Interpret the selected branch. Goto/assignment/eval shapes dispatch
    /// as commands; reference strings resolve; plain values return verbatim.
    async fn eval_branch(&self, branch: &Value, page: Option<&str>) -> InterpResult<Outcome> {
        if let Value::String(s) = branch {
            if is_reference(s) {
                let r = RefExpr::parse(s).unwrap();
                let resolved = self.view(page).lookup(&r);
                return match resolved {
                    // A resolved callable gets its dataIn/dataOut plumbing.
                    Some(v) if is_call_shape(&v) => {
                        self.eval_boxed(&Command::classify(v), page).await
                    }
                    Some(v) => Ok(Outcome::value(v)),
                    None => Ok(Outcome::value(branch.clone())),
                };
            }
            return Ok(Outcome::value(branch.clone()));
        }

        let cmd = Command::classify(branch.clone());
        self.eval_boxed(&cmd, page).await
    }

    // ── Goto ──────────────────────────────────────────────────────────

    /// Populate the destination, dispatch the registered goto builtin, and
    /// signal chain abort: goto always terminates further execution.
    async fn eval_goto(&self, destination: &Value, page: Option<&str>) -> InterpResult<Outcome> {
        let destination = self.resolve_value(destination.clone(), page)?;
        let builtin = self
            .registry
            .get(GOTO_BUILTIN)
            .ok_or_else(|| InterpError::UnknownBuiltin(GOTO_BUILTIN.into()))?;
        let value = builtin
            .call(destination)
            .await
            .map_err(|source| InterpError::UnableToExecuteFn {
                name: GOTO_BUILTIN.into(),
                source,
            })?;
        Ok(Outcome { value, abort: true })
    }

    // ── Builtin call ──────────────────────────────────────────────────

    async fn eval_builtin_call(
        &self,
        name: &RefExpr,
        data_in: Option<&Value>,
        data_out: Option<&RefExpr>,
        page: Option<&str>,
    ) -> InterpResult<Outcome> {
        let fn_name = name.path_str();
        let builtin = match self.registry.get(&fn_name) {
            Some(b) => b,
            // The path may hold an indirection: a string in the document
            // naming the registered callable.
            None => match self.view(page).lookup(name) {
                Some(Value::String(indirect)) => self
                    .registry
                    .get(&indirect)
                    .ok_or(InterpError::UnknownBuiltin(indirect))?,
                _ => return Err(InterpError::UnknownBuiltin(fn_name)),
            },
        };

        // Resolve the payload's own references against the live tree.
        let payload = match data_in {
            Some(v) => self.resolve_value(v.clone(), page)?,
            None => Value::Null,
        };

        let result = builtin
            .call(payload)
            .await
            .map_err(|source| InterpError::UnableToExecuteFn {
                name: fn_name,
                source,
            })?;

        if let Some(out) = data_out {
            self.tree.write().unwrap().dispatch(DocEvent::SetValue {
                scope: out.scope,
                page: page.map(str::to_string),
                path: out.path.clone(),
                value: result.clone(),
            })?;
        }

        Ok(Outcome::value(result))
    }

    // ── Composite ─────────────────────────────────────────────────────

    /// Evaluate a command list strictly in order. Each command is
    /// re-resolved against the live tree immediately before it runs, so
    /// earlier side effects are visible to later commands. Short-circuits
    /// on the first chain-aborting outcome.
    async fn eval_composite(
        &self,
        commands: &[Command],
        page: Option<&str>,
    ) -> InterpResult<Outcome> {
        let mut collected = Vec::with_capacity(commands.len());
        for sub in commands {
            let refreshed = self.resolve_value(sub.raw.clone(), page)?;
            let cmd = Command::classify(refreshed);
            let out = self.eval_boxed(&cmd, page).await?;
            collected.push(out.value);
            if out.abort {
                return Ok(Outcome {
                    value: Value::Array(collected),
                    abort: true,
                });
            }
        }
        Ok(Outcome::value(Value::Array(collected)))
    }

    // ── Shared plumbing ───────────────────────────────────────────────

    /// One resolver pass over `value` against a fresh scope snapshot.
    fn resolve_value(&self, value: Value, page: Option<&str>) -> InterpResult<Value> {
        let view = self.view(page);
        let mut request = Request::new(value);
        request.page = page.map(str::to_string);
        Ok(resolve(request, &view)?.value)
    }
}

/// Is this value a single-key eval-object (callable shape)?
fn is_call_shape(value: &Value) -> bool {
    matches!(
        Command::classify(value.clone()).kind,
        CommandKind::BuiltinCall { .. }
    )
}
