//! The default executor: every action runs its command through the
//! interpreter.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use weft_chain::{ActionExecutor, ChainError, ExecResult, ExecOutcome};
use weft_interp::Interpreter;
use weft_types::{Command, Value};

/// Routes commands to [`Interpreter::eval`] against the page current at
/// execution time.
pub struct InterpExecutor {
    interpreter: Arc<Interpreter>,
    page: Arc<RwLock<Option<String>>>,
}

impl InterpExecutor {
    pub fn new(interpreter: Arc<Interpreter>, page: Arc<RwLock<Option<String>>>) -> Self {
        Self { interpreter, page }
    }
}

#[async_trait]
impl ActionExecutor for InterpExecutor {
    async fn execute(&self, command: &Command, _args: &Value) -> ExecResult<ExecOutcome> {
        let page = self.page.read().unwrap().clone();
        match self.interpreter.eval(command, page.as_deref()).await {
            Ok(outcome) => Ok(ExecOutcome {
                value: outcome.value,
                abort: outcome.abort,
            }),
            Err(err) => Err(ChainError::Executor(err.to_string())),
        }
    }
}
