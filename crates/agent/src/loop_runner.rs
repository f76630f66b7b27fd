//! The agent reasoning loop implementation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local};
use orchestra_config::AppConfig;
use orchestra_core::agent::{AgentState, HumanExit, RunOutcome};
use orchestra_core::event::{AgentUpdate, Subscription, UpdateBus};
use orchestra_core::human::HumanInput;
use orchestra_core::memory::MemoryStore;
use orchestra_core::message::Message;
use orchestra_core::provider::{ChatModel, TokenCounter};
use orchestra_core::step::{PendingStep, Step};
use orchestra_core::tool::ToolRegistry;
use orchestra_memory::{InMemoryStore, NoopMemory, TokenTextSplitter};
use tracing::{debug, info, warn};

use crate::control::{CancelSignal, PauseGate};
use crate::dispatcher::{DispatchOutcome, ToolDispatcher};
use crate::error::AgentError;
use crate::parser::OutputParser;
use crate::prompt::{
    CharTokenCounter, DEFAULT_HISTORY_WINDOW, DEFAULT_MEMORY_TOKEN_CEILING,
    DEFAULT_SEND_TOKEN_LIMIT, Persona, PromptBuilder,
};

/// Input used when no pending step supplies one.
pub const NEXT_STEP_INPUT: &str =
    "Determine which next command to use, and respond using the json format specified above:";

/// Default cap on iterations per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Chunk size for memory writes when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 2046;

/// All mutable state of one run, threaded through every iteration.
#[derive(Debug, Default)]
pub struct RunContext {
    pub goals: Vec<String>,
    pub history: Vec<Message>,
    pub saved_steps: Vec<Step>,
    pub pending: VecDeque<PendingStep>,
    pub iteration: u32,
    pub cancel_reason: Option<String>,
}

impl RunContext {
    pub fn new(goals: Vec<String>, pending: Vec<PendingStep>) -> Self {
        Self {
            goals,
            pending: pending.into(),
            ..Self::default()
        }
    }
}

/// Build the memory backend named in the configuration.
pub fn build_memory(config: &AppConfig) -> Arc<dyn MemoryStore> {
    match config.memory.backend.as_str() {
        "none" => Arc::new(NoopMemory),
        _ => Arc::new(InMemoryStore::with_limit(config.memory.recall_limit)),
    }
}

/// Builder for [`AgentLoop`].
pub struct AgentLoopBuilder {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    memory: Arc<dyn MemoryStore>,
    counter: Arc<dyn TokenCounter>,
    human: Option<(Arc<dyn HumanInput>, Duration)>,
    persona: Persona,
    max_iterations: u32,
    replay_supported: bool,
    send_token_limit: usize,
    memory_token_ceiling: usize,
    history_window: usize,
    chunk_size: usize,
    chunk_overlap: Option<usize>,
    clock: Option<fn() -> DateTime<Local>>,
}

impl AgentLoopBuilder {
    pub fn persona(mut self, name: impl Into<String>, role: impl Into<String>) -> Self {
        self.persona = Persona {
            name: name.into(),
            role: role.into(),
        };
        self
    }

    pub fn token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Enable the human-in-the-loop command.
    pub fn human_input(mut self, human: Arc<dyn HumanInput>, timeout: Duration) -> Self {
        self.human = Some((human, timeout));
        self
    }

    pub fn max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Whether pending steps may stand in for model and tool calls.
    pub fn replay_supported(mut self, enabled: bool) -> Self {
        self.replay_supported = enabled;
        self
    }

    pub fn send_token_limit(mut self, limit: usize) -> Self {
        self.send_token_limit = limit;
        self
    }

    pub fn memory_token_ceiling(mut self, ceiling: usize) -> Self {
        self.memory_token_ceiling = ceiling;
        self
    }

    pub fn history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Chunking of memory writes. Overlap defaults to a tenth of the size.
    pub fn chunking(mut self, size: usize, overlap: Option<usize>) -> Self {
        self.chunk_size = size;
        self.chunk_overlap = overlap;
        self
    }

    pub fn clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Apply the `[agent]` and `[memory]` sections. The human channel is
    /// still attached separately, and only used when `human_in_the_loop` is on.
    pub fn config(mut self, config: &AppConfig) -> Self {
        let agent = &config.agent;
        self = self
            .persona(&agent.name, &agent.role)
            .max_iterations(agent.max_iterations)
            .replay_supported(agent.replay_supported)
            .send_token_limit(orchestra_providers::send_token_limit(config))
            .memory_token_ceiling(agent.memory_token_ceiling)
            .history_window(agent.history_window)
            .chunking(
                config.memory.chunk_size.unwrap_or_else(|| {
                    orchestra_providers::embedding_context_size(&config.memory.embedding_model)
                }),
                config.memory.chunk_overlap,
            );
        if !agent.human_in_the_loop {
            self.human = None;
        }
        self
    }

    pub fn build(self) -> AgentLoop {
        let human_in_the_loop = self.human.is_some();

        let mut prompt = PromptBuilder::new(
            self.persona,
            &self.tools,
            human_in_the_loop,
            Arc::clone(&self.counter),
            self.memory.clone(),
        )
        .with_send_token_limit(self.send_token_limit)
        .with_memory_token_ceiling(self.memory_token_ceiling)
        .with_history_window(self.history_window);
        if let Some(clock) = self.clock {
            prompt = prompt.with_clock(clock);
        }

        let mut dispatcher = ToolDispatcher::new(self.tools);
        if let Some((human, timeout)) = self.human {
            dispatcher = dispatcher.with_human_input(human, timeout);
        }

        let splitter = match self.chunk_overlap {
            Some(overlap) => TokenTextSplitter::new(self.counter, self.chunk_size, overlap),
            None => TokenTextSplitter::with_default_overlap(self.counter, self.chunk_size),
        };

        AgentLoop {
            model: self.model,
            prompt,
            parser: OutputParser::new(),
            dispatcher,
            memory: self.memory,
            splitter,
            max_iterations: self.max_iterations,
            replay_supported: self.replay_supported,
            bus: UpdateBus::new(),
            state: Mutex::new(AgentState::Idle),
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancelSignal::new()),
            gate: PauseGate::new(),
            edited_steps: Mutex::new(None),
            steps: Mutex::new(Vec::new()),
        }
    }
}

/// The think → act → observe state machine.
///
/// One instance runs at most one goal set at a time. Control methods
/// (`stop`, `pause`, `resume`) take `&self` and may be called from other
/// tasks while `start` is awaited.
pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    prompt: PromptBuilder,
    parser: OutputParser,
    dispatcher: ToolDispatcher,
    memory: Arc<dyn MemoryStore>,
    splitter: TokenTextSplitter,
    max_iterations: u32,
    replay_supported: bool,
    bus: UpdateBus,
    state: Mutex<AgentState>,
    running: Arc<AtomicBool>,
    cancel: Mutex<CancelSignal>,
    gate: PauseGate,
    edited_steps: Mutex<Option<Vec<PendingStep>>>,
    steps: Mutex<Vec<Step>>,
}

/// Exclusive right to run an [`AgentLoop`] once.
///
/// Its cancel signal is installed when the claim is taken, so a `stop`
/// issued any time after [`AgentLoop::claim`] returns reaches the run.
/// Dropping the claim releases the agent.
pub struct RunClaim {
    running: Arc<AtomicBool>,
    cancel: CancelSignal,
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl AgentLoop {
    pub fn builder(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryStore>,
    ) -> AgentLoopBuilder {
        AgentLoopBuilder {
            model,
            tools,
            memory,
            counter: Arc::new(CharTokenCounter),
            human: None,
            persona: Persona::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            replay_supported: true,
            send_token_limit: DEFAULT_SEND_TOKEN_LIMIT,
            memory_token_ceiling: DEFAULT_MEMORY_TOKEN_CEILING,
            history_window: DEFAULT_HISTORY_WINDOW,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: None,
            clock: None,
        }
    }

    /// Run `goals` to completion.
    ///
    /// `pending` steps are replayed first, in order. Recoverable failures
    /// (bad replies, unknown commands, tool errors) are fed back to the
    /// model; only a failed model call ends the run with an error.
    pub async fn start(
        &self,
        goals: Vec<String>,
        pending: Vec<PendingStep>,
    ) -> Result<RunOutcome, AgentError> {
        let claim = self.claim()?;
        self.start_claimed(claim, goals, pending).await
    }

    /// Reserve this agent for a run without starting it.
    ///
    /// Fails with [`AgentError::AlreadyRunning`] while another claim is held.
    pub fn claim(&self) -> Result<RunClaim, AgentError> {
        // Held across the swap so a concurrent `stop` lands on one signal or the other.
        let mut slot = lock(&self.cancel);
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AgentError::AlreadyRunning);
        }
        let cancel = CancelSignal::new();
        *slot = cancel.clone();
        Ok(RunClaim {
            running: Arc::clone(&self.running),
            cancel,
        })
    }

    /// Run `goals` under a claim taken from this agent.
    pub async fn start_claimed(
        &self,
        claim: RunClaim,
        goals: Vec<String>,
        pending: Vec<PendingStep>,
    ) -> Result<RunOutcome, AgentError> {
        debug_assert!(Arc::ptr_eq(&claim.running, &self.running));
        let cancel = claim.cancel.clone();
        self.gate.open();
        lock(&self.edited_steps).take();
        lock(&self.steps).clear();

        info!(
            goals = goals.len(),
            pending = pending.len(),
            max_iterations = self.max_iterations,
            "Starting agent run"
        );
        self.set_state(AgentState::Running);

        let mut ctx = RunContext::new(goals, pending);
        let result = self.run(&mut ctx, &cancel).await;

        match &result {
            Ok(outcome) => {
                info!(iterations = ctx.iteration, outcome = ?outcome, "Agent run ended");
                self.set_state(outcome.final_state());
            }
            Err(e) => {
                warn!(iteration = ctx.iteration, error = %e, "Agent run failed");
                self.set_state(AgentState::Stopped);
            }
        }
        result
    }

    /// Cancel the current run. Idempotent; the first reason wins.
    ///
    /// Applies to the run claimed most recently; with no claim held it is a
    /// no-op and the next run starts fresh.
    pub fn stop(&self, reason: Option<String>) {
        debug!(reason = ?reason, "Stop requested");
        lock(&self.cancel).cancel(reason);
    }

    /// Hold the loop at the next iteration boundary.
    pub fn pause(&self) {
        if self.state() != AgentState::Running {
            return;
        }
        self.gate.close();
        self.set_state(AgentState::Paused);
    }

    /// Release a paused loop. `edited` replaces the pending queue.
    pub fn resume(&self, edited: Option<Vec<PendingStep>>) {
        if let Some(steps) = edited {
            *lock(&self.edited_steps) = Some(steps);
        }
        self.gate.open();
        if self.state() == AgentState::Paused {
            self.set_state(AgentState::Running);
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AgentUpdate) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn state(&self) -> AgentState {
        *lock(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the saved-step log of the current or last run.
    pub fn steps(&self) -> Vec<Step> {
        lock(&self.steps).clone()
    }

    async fn run(&self, ctx: &mut RunContext, cancel: &CancelSignal) -> Result<RunOutcome, AgentError> {
        while ctx.iteration < self.max_iterations {
            if cancel.is_cancelled() {
                return Ok(stopped(ctx, cancel));
            }

            if !self.gate.is_open() {
                debug!(iteration = ctx.iteration, "Paused at iteration boundary");
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(stopped(ctx, cancel)),
                    _ = self.gate.wait_open() => {}
                }
            }
            if let Some(edited) = lock(&self.edited_steps).take() {
                debug!(steps = edited.len(), "Replacing pending steps");
                ctx.pending = edited.into();
            }

            ctx.iteration += 1;
            let pending = ctx.pending.pop_front().unwrap_or_default();
            let user_input = pending.user_message().unwrap_or(NEXT_STEP_INPUT).to_string();
            debug!(iteration = ctx.iteration, "Agent loop iteration");

            // ── Think ──
            let reply = match pending.reply().filter(|_| self.replay_supported) {
                Some(recorded) => {
                    debug!(iteration = ctx.iteration, "Replaying recorded reply");
                    recorded.to_string()
                }
                None => {
                    let built = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        m = self.prompt.build(&ctx.goals, &ctx.history, &user_input) => Some(m),
                    };
                    let Some(messages) = built else {
                        return Ok(stopped(ctx, cancel));
                    };
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(stopped(ctx, cancel)),
                        r = self.model.complete(&messages) => r?,
                    }
                }
            };

            ctx.history.push(Message::human(user_input.as_str()));
            ctx.history.push(Message::ai(reply.as_str()));

            let parsed = self.parser.parse(&reply);
            let command = parsed.command.clone();
            ctx.saved_steps.push(Step {
                user_message: Some(user_input),
                assistant_reply: reply.clone(),
                parsed,
                result: None,
            });
            self.publish_steps(ctx, |iteration, steps| AgentUpdate::ActionStart { iteration, steps });

            if command.is_finish() {
                let answer = command.arg_str("response").unwrap_or_default().to_string();
                return Ok(RunOutcome::Finished { answer });
            }

            // ── Act ──
            let result = match pending.recorded_result().filter(|_| self.replay_supported) {
                Some(recorded) => match recorded_exit(recorded) {
                    Some(exit) => return Ok(RunOutcome::Exited { exit }),
                    None => recorded.to_string(),
                },
                None => {
                    debug!(command = %command.name, "Dispatching command");
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(stopped(ctx, cancel)),
                        o = self.dispatcher.dispatch(&command) => o,
                    };
                    match outcome {
                        DispatchOutcome::Observation(text) => text,
                        DispatchOutcome::Exit(exit) => {
                            info!(exit = ?exit, "Operator ended the run");
                            return Ok(RunOutcome::Exited { exit });
                        }
                    }
                }
            };

            // ── Observe ──
            if let Some(step) = ctx.saved_steps.last_mut() {
                step.result = Some(result.clone());
            }
            self.publish_steps(ctx, |iteration, steps| AgentUpdate::ActionEnd { iteration, steps });

            let transcript = format!("Assistant Reply: {reply}\nResult: {result} ");
            let documents = self.splitter.split_documents(&transcript);
            let write = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(stopped(ctx, cancel)),
                w = self.memory.add_documents(documents) => w,
            };
            if let Err(e) = write {
                warn!("Failed to write step to memory: {e}");
            }

            ctx.history.push(Message::system(result));
        }

        info!(max_iterations = self.max_iterations, "Iteration cap reached");
        Ok(RunOutcome::Exhausted)
    }

    fn set_state(&self, next: AgentState) {
        {
            let mut state = lock(&self.state);
            if *state == next {
                return;
            }
            debug!(from = %*state, to = %next, "Agent state changed");
            *state = next;
        }
        self.bus.publish(&AgentUpdate::StateChanged { state: next });
    }

    fn publish_steps(&self, ctx: &RunContext, update: impl FnOnce(u32, Vec<Step>) -> AgentUpdate) {
        *lock(&self.steps) = ctx.saved_steps.clone();
        self.bus.publish(&update(ctx.iteration, ctx.saved_steps.clone()));
    }
}

fn stopped(ctx: &mut RunContext, cancel: &CancelSignal) -> RunOutcome {
    ctx.cancel_reason = cancel.reason();
    info!(reason = ?ctx.cancel_reason, iteration = ctx.iteration, "Run cancelled");
    RunOutcome::Stopped {
        reason: ctx.cancel_reason.clone(),
    }
}

/// A recorded result that is itself an exit sentinel ends the replay.
fn recorded_exit(result: &str) -> Option<HumanExit> {
    [HumanExit::Requested, HumanExit::NoInput]
        .into_iter()
        .find(|exit| exit.sentinel() == result)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}
