//! A single schedulable unit: one command plus its execution lifecycle.

use crate::{AbortError, ChainError, ExecResult};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use weft_types::{Command, Value};

/// Hard per-action timeout unless configured otherwise.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_millis(8000);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Outcome of one executor invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    /// The action's result value.
    pub value: Value,
    /// The executor signalled that the whole chain must stop (goto).
    pub abort: bool,
}

impl ExecOutcome {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            abort: false,
        }
    }
}

/// Executes one command on behalf of an [`Action`].
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Run the command. Every invocation is a suspension point.
    async fn execute(&self, command: &Command, args: &Value) -> ExecResult<ExecOutcome>;

    /// Called when the action is aborted before or instead of execution.
    /// Failures are recorded by the chain drain and never stop it.
    fn on_abort(&self, _command: &Command, _reason: &str) -> ExecResult<()> {
        Ok(())
    }
}

/// Lifecycle status. Exactly one terminal status is reached per execution
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Idle,
    Pending,
    Resolved,
    Error,
    Aborted,
    TimedOut,
}

/// One schedulable unit wrapping a single command.
pub struct Action {
    id: String,
    action_type: String,
    original: Command,
    status: ActionStatus,
    timeout: Duration,
    deadline: Option<Instant>,
    result: Option<Value>,
    error: Option<ChainError>,
    executed: bool,
    executor: Option<Arc<dyn ActionExecutor>>,
}

/// Plain descriptor of an action, for introspection and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSnapshot {
    pub id: String,
    pub action_type: String,
    pub status: ActionStatus,
    pub executed: bool,
    pub timeout_ms: u64,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl Action {
    /// Create an idle action around a classified command.
    pub fn new(command: Command) -> Self {
        let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("action-{n}"),
            action_type: command.kind_name().to_string(),
            original: command,
            status: ActionStatus::Idle,
            timeout: DEFAULT_ACTION_TIMEOUT,
            deadline: None,
            result: None,
            error: None,
            executed: false,
            executor: None,
        }
    }

    /// Bind the executor that will run the command.
    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Override the hard timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> ActionStatus {
        self.status
    }

    /// The immutable original command.
    pub fn original(&self) -> &Command {
        &self.original
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&ChainError> {
        self.error.as_ref()
    }

    pub fn executed(&self) -> bool {
        self.executed
    }

    /// Time left before the hard timeout fires; `None` when not pending.
    /// This is the countdown observable while an execution is in flight.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Execute the bound executor under the hard timeout.
    ///
    /// Terminal transitions: success → `Resolved`, executor error → `Error`
    /// (error stored and returned), deadline → `TimedOut` with a timeout
    /// [`AbortError`] result. An already-aborted action returns its recorded
    /// AbortError without invoking the executor. The timeout is a future
    /// raced against the executor, so no timer survives any exit path.
    pub async fn execute(&mut self, args: &Value) -> ExecResult<ExecOutcome> {
        if self.status == ActionStatus::Aborted {
            let value = self
                .result
                .clone()
                .unwrap_or_else(|| AbortError::new("aborted").to_value());
            return Ok(ExecOutcome::value(value));
        }

        self.result = None;
        self.error = None;
        self.status = ActionStatus::Pending;

        // An action with no bound executor resolves immediately with null.
        let Some(executor) = self.executor.clone() else {
            self.status = ActionStatus::Resolved;
            self.executed = true;
            self.result = Some(Value::Null);
            return Ok(ExecOutcome::value(Value::Null));
        };

        let deadline = Instant::now() + self.timeout;
        self.deadline = Some(deadline);
        let raced = tokio::time::timeout_at(deadline, executor.execute(&self.original, args)).await;
        self.deadline = None;

        match raced {
            Err(_elapsed) => {
                tracing::warn!(id = %self.id, timeout_ms = self.timeout.as_millis() as u64, "action timed out");
                self.status = ActionStatus::TimedOut;
                let abort =
                    AbortError::new(format!("timed out after {}ms", self.timeout.as_millis()));
                self.result = Some(abort.to_value());
                Ok(ExecOutcome::value(abort.to_value()))
            }
            Ok(Ok(outcome)) => {
                self.status = ActionStatus::Resolved;
                self.executed = true;
                self.result = Some(outcome.value.clone());
                Ok(outcome)
            }
            Ok(Err(err)) => {
                self.status = ActionStatus::Error;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Abort the action: never invokes the executor, records an
    /// [`AbortError`] result. Idempotent. Returns the executor's abort
    /// handler outcome so a chain drain can record failures.
    pub fn abort(&mut self, reason: &str) -> ExecResult<()> {
        if self.status == ActionStatus::Aborted {
            return Ok(());
        }
        self.deadline = None;
        self.status = ActionStatus::Aborted;
        self.result = Some(AbortError::new(reason).to_value());
        match &self.executor {
            Some(executor) => executor.on_abort(&self.original, reason),
            None => Ok(()),
        }
    }

    /// Plain descriptor for introspection and tests.
    pub fn snapshot(&self) -> ActionSnapshot {
        ActionSnapshot {
            id: self.id.clone(),
            action_type: self.action_type.clone(),
            status: self.status,
            executed: self.executed,
            timeout_ms: self.timeout.as_millis() as u64,
            result: self.result.clone(),
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("action_type", &self.action_type)
            .field("status", &self.status)
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}
