//! Ordered action queue for one trigger.
//!
//! The chain pulls the queue head only after the previous step has fully
//! settled and its result is recorded — a strict request/response hand-off.
//! Replaces the generator-driven iteration of older designs with an explicit
//! queue + worker loop.

use crate::hooks::ChainHooks;
use crate::{AbortError, Action, ActionExecutor, ActionSnapshot, ActionStatus, ChainError};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weft_types::{Command, Value};

/// Per-step watchdog: the whole chain aborts if one step exceeds this.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_millis(10_000);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Converts raw commands into actions. Pluggable so callers can construct
/// specialized actions (custom executors, per-kind timeouts).
pub trait ActionLoader: Send + Sync {
    fn load(&self, raw: Value) -> Action;
}

/// Loader binding every action to one shared executor with one timeout.
pub struct DefaultLoader {
    executor: Option<Arc<dyn ActionExecutor>>,
    timeout: Duration,
}

impl DefaultLoader {
    pub fn new(executor: Option<Arc<dyn ActionExecutor>>) -> Self {
        Self {
            executor,
            timeout: crate::DEFAULT_ACTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ActionLoader for DefaultLoader {
    fn load(&self, raw: Value) -> Action {
        let mut action = Action::new(Command::classify(raw)).with_timeout(self.timeout);
        if let Some(executor) = &self.executor {
            action = action.with_executor(Arc::clone(executor));
        }
        action
    }
}

/// Chain state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Idle,
    InProgress,
    Aborted,
    Error,
}

/// One `{action, result}` pair accumulated during execution or abort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainResult {
    pub action: ActionSnapshot,
    pub result: Value,
}

/// Plain descriptor of the chain, for introspection and tests.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSnapshot {
    pub id: String,
    pub trigger: String,
    pub status: ChainStatus,
    pub queued: usize,
    pub results: usize,
    pub injected: usize,
    pub abort_reason: Option<String>,
}

/// Selective reset targets for [`ActionChain::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearKey {
    Actions,
    Queue,
    Results,
    Error,
    Hooks,
}

/// An ordered, triggerable list of actions executed sequentially under
/// shared abort/timeout/observer machinery.
pub struct ActionChain {
    id: String,
    trigger: String,
    /// Raw commands as loaded; the queue is rebuilt from these.
    raw: Vec<Value>,
    queue: VecDeque<Action>,
    /// Snapshot of the in-flight action, if any.
    current: Option<ActionSnapshot>,
    results: Vec<ChainResult>,
    injected: Vec<Value>,
    status: ChainStatus,
    error: Option<ChainError>,
    abort_reason: Option<String>,
    hooks: ChainHooks,
    loader: Arc<dyn ActionLoader>,
    step_timeout: Duration,
}

impl ActionChain {
    /// Create a chain for `trigger`, loading `commands` through `loader`.
    pub fn new(
        trigger: impl Into<String>,
        commands: Vec<Value>,
        loader: Arc<dyn ActionLoader>,
    ) -> Self {
        let n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let mut chain = Self {
            id: format!("chain-{n}"),
            trigger: trigger.into(),
            raw: commands,
            queue: VecDeque::new(),
            current: None,
            results: Vec::new(),
            injected: Vec::new(),
            status: ChainStatus::Idle,
            error: None,
            abort_reason: None,
            hooks: ChainHooks::default(),
            loader,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        };
        chain.load_queue();
        chain
    }

    /// Override the per-step watchdog duration.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Install observer hooks.
    pub fn with_hooks(mut self, hooks: ChainHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn status(&self) -> ChainStatus {
        self.status
    }

    pub fn error(&self) -> Option<&ChainError> {
        self.error.as_ref()
    }

    /// Snapshots of the queued (not yet executed) actions, head first.
    pub fn queued(&self) -> Vec<ActionSnapshot> {
        self.queue.iter().map(Action::snapshot).collect()
    }

    /// Results accumulated so far.
    pub fn results(&self) -> &[ChainResult] {
        &self.results
    }

    /// Plain descriptor for introspection.
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            id: self.id.clone(),
            trigger: self.trigger.clone(),
            status: self.status,
            queued: self.queue.len(),
            results: self.results.len(),
            injected: self.injected.len(),
            abort_reason: self.abort_reason.clone(),
        }
    }

    /// Rebuild the working queue from the raw command list, re-arming
    /// iteration state. Existing queue contents are replaced.
    pub fn load_queue(&mut self) {
        self.queue = self
            .raw
            .iter()
            .cloned()
            .map(|raw| self.loader.load(raw))
            .collect();
        self.current = None;
    }

    /// Load a command and place it at the queue **head**: it is the very
    /// next action dispatched, ahead of all remaining work. Recorded in the
    /// injected list.
    pub fn inject(&mut self, command: Value) -> ActionSnapshot {
        let action = self.loader.load(command.clone());
        let snapshot = action.snapshot();
        ChainHooks::action(&self.hooks.on_before_inject, &snapshot);
        self.injected.push(command);
        self.queue.push_front(action);
        ChainHooks::action(&self.hooks.on_after_inject, &snapshot);
        tracing::debug!(chain = %self.id, action = %snapshot.id, "injected at queue head");
        snapshot
    }

    /// Run the queue to completion, returning the accumulated
    /// `{action, result}` pairs.
    ///
    /// Each step is guarded by the chain watchdog: if the step exceeds the
    /// watchdog, the current action is aborted with a timeout message and
    /// the remaining queue is aborted. An executor error likewise aborts the
    /// remainder instead of propagating as a crash. On every exit the queue
    /// is reloaded and the status returns to idle.
    pub async fn execute(&mut self, args: Value) -> Vec<ChainResult> {
        self.results.clear();
        self.status = ChainStatus::InProgress;
        self.abort_reason = None;
        self.error = None;
        ChainHooks::chain(&self.hooks.on_execute_start);
        tracing::debug!(chain = %self.id, trigger = %self.trigger, queued = self.queue.len(), "chain execute");

        while let Some(mut action) = self.queue.pop_front() {
            // An action aborted while still queued is recorded, not run.
            if action.status() == ActionStatus::Aborted {
                let result = action
                    .result()
                    .cloned()
                    .unwrap_or_else(|| AbortError::new("aborted").to_value());
                self.results.push(ChainResult {
                    action: action.snapshot(),
                    result,
                });
                continue;
            }

            let snapshot = action.snapshot();
            ChainHooks::action(&self.hooks.on_before_action_execute, &snapshot);
            self.current = Some(snapshot);

            let step = tokio::time::timeout(self.step_timeout, action.execute(&args)).await;
            match step {
                // Watchdog fired: abort the current action, then everything.
                Err(_elapsed) => {
                    let reason = format!(
                        "chain step exceeded {}ms watchdog",
                        self.step_timeout.as_millis()
                    );
                    if let Err(err) = action.abort(&reason) {
                        ChainHooks::error(&self.hooks.on_abort_error, &err);
                    }
                    self.results.push(ChainResult {
                        result: AbortError::new(reason.as_str()).to_value(),
                        action: action.snapshot(),
                    });
                    self.abort_remaining(&reason);
                    break;
                }
                Ok(Ok(outcome)) => {
                    let snapshot = action.snapshot();
                    ChainHooks::result(&self.hooks.on_execute_result, &snapshot, &outcome.value);

                    // A result waiting on user-driven input parks the rest
                    // of the chain.
                    let waiting = outcome
                        .value
                        .get("wait")
                        .is_some_and(weft_types::to_boolean);

                    self.results.push(ChainResult {
                        action: snapshot,
                        result: outcome.value,
                    });

                    if outcome.abort {
                        self.abort_remaining("aborted by action result");
                        break;
                    }
                    if waiting {
                        self.abort_remaining("waiting on user input");
                        break;
                    }
                }
                // Executor errors fail soft: captured on the action, chain
                // aborts the remainder.
                Ok(Err(err)) => {
                    ChainHooks::error(&self.hooks.on_execute_error, &err);
                    self.error = Some(err.clone());
                    self.status = ChainStatus::Error;
                    self.results.push(ChainResult {
                        result: AbortError::new(err.to_string()).to_value(),
                        action: action.snapshot(),
                    });
                    self.abort_remaining(&err.to_string());
                    break;
                }
            }
            self.current = None;
        }

        let results = self.results.clone();
        self.load_queue();
        self.status = ChainStatus::Idle;
        ChainHooks::chain(&self.hooks.on_execute_end);
        results
    }

    /// Abort the chain: drain the queue, marking every not-yet-executed
    /// action aborted with an [`AbortError`] result. Idempotent — a second
    /// call finds an empty queue and appends nothing. Returns the
    /// accumulated results.
    pub fn abort(&mut self, reason: &str) -> Vec<ChainResult> {
        self.status = ChainStatus::Aborted;
        self.abort_reason = Some(reason.to_string());
        ChainHooks::chain(&self.hooks.on_abort_start);
        self.drain_queue(reason);
        self.current = None;
        ChainHooks::chain(&self.hooks.on_abort_end);
        self.results.clone()
    }

    /// Rebuild the queue from the raw commands and notify observers.
    pub fn refresh(&mut self) {
        self.load_queue();
        ChainHooks::chain(&self.hooks.on_refresh);
    }

    /// Selectively or fully reset chain state.
    pub fn clear(&mut self, key: Option<ClearKey>) {
        match key {
            Some(ClearKey::Actions) => {
                self.raw.clear();
                self.queue.clear();
                self.injected.clear();
            }
            Some(ClearKey::Queue) => self.queue.clear(),
            Some(ClearKey::Results) => self.results.clear(),
            Some(ClearKey::Error) => {
                self.error = None;
                self.abort_reason = None;
            }
            Some(ClearKey::Hooks) => self.hooks = ChainHooks::default(),
            None => {
                self.raw.clear();
                self.queue.clear();
                self.injected.clear();
                self.results.clear();
                self.error = None;
                self.abort_reason = None;
                self.current = None;
                self.hooks = ChainHooks::default();
                self.status = ChainStatus::Idle;
            }
        }
    }

    /// Abort everything still queued, mid-execution. Unlike [`Self::abort`]
    /// the chain status is already settled by the caller.
    fn abort_remaining(&mut self, reason: &str) {
        if self.status != ChainStatus::Error {
            self.status = ChainStatus::Aborted;
        }
        self.abort_reason = Some(reason.to_string());
        ChainHooks::chain(&self.hooks.on_abort_start);
        self.drain_queue(reason);
        ChainHooks::chain(&self.hooks.on_abort_end);
    }

    /// Drain every remaining non-aborted action, tolerating and recording
    /// per-action abort failures without stopping.
    fn drain_queue(&mut self, reason: &str) {
        while let Some(mut action) = self.queue.pop_front() {
            if action.status() == ActionStatus::Aborted {
                continue;
            }
            ChainHooks::action(&self.hooks.on_before_abort_action, &action.snapshot());
            if let Err(err) = action.abort(reason) {
                tracing::warn!(chain = %self.id, action = %action.id(), %err, "abort handler failed");
                ChainHooks::error(&self.hooks.on_abort_error, &err);
            }
            ChainHooks::action(&self.hooks.on_after_abort_action, &action.snapshot());
            self.results.push(ChainResult {
                action: action.snapshot(),
                result: AbortError::new(reason).to_value(),
            });
        }
    }
}

impl std::fmt::Debug for ActionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionChain")
            .field("id", &self.id)
            .field("trigger", &self.trigger)
            .field("status", &self.status)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}
