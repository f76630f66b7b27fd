//! One WebSocket connection = one session = one agent.
//!
//! The session owns its `AgentLoop`, forwards every agent update as a
//! frame, and bridges the `request-human-input` command to the client:
//! the question goes out as `request_human_input`, the next `reply` frame
//! answers it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orchestra_agent::{AgentLoop, Planner, RunRegistry, build_memory};
use orchestra_core::event::Subscription;
use orchestra_core::human::HumanInput;
use orchestra_core::step::PendingStep;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::GatewayState;
use crate::protocol::{ClientFrame, ServerFrame};

pub type Outbound = mpsc::UnboundedSender<ServerFrame>;

/// Human input answered by the session's client.
pub struct WsHumanInput {
    outbound: Outbound,
    waiting: Mutex<Option<oneshot::Sender<String>>>,
}

impl WsHumanInput {
    pub fn new(outbound: Outbound) -> Self {
        Self {
            outbound,
            waiting: Mutex::new(None),
        }
    }

    /// Deliver an answer. Returns `false` if no question is outstanding.
    pub fn answer(&self, content: String) -> bool {
        let waiting = self.waiting.lock().unwrap_or_else(|p| p.into_inner()).take();
        match waiting {
            Some(tx) => tx.send(content).is_ok(),
            None => false,
        }
    }

    /// Abandon any outstanding question.
    pub fn cancel(&self) {
        self.waiting.lock().unwrap_or_else(|p| p.into_inner()).take();
    }
}

#[async_trait]
impl HumanInput for WsHumanInput {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn request(&self, question: &str) -> Option<String> {
        let (tx, rx) = oneshot::channel();
        *self.waiting.lock().unwrap_or_else(|p| p.into_inner()) = Some(tx);

        let frame = ServerFrame::RequestHumanInput {
            content: question.to_string(),
        };
        if self.outbound.send(frame).is_err() {
            return None;
        }
        rx.await.ok()
    }
}

pub struct Session {
    id: String,
    agent: Arc<AgentLoop>,
    planner: Arc<Planner>,
    human: Arc<WsHumanInput>,
    registry: RunRegistry,
    outbound: Outbound,
    subscription: Mutex<Option<Subscription>>,
}

impl Session {
    pub fn new(id: impl Into<String>, state: &GatewayState, outbound: Outbound) -> Arc<Self> {
        let id = id.into();
        let config = &state.config;
        let human = Arc::new(WsHumanInput::new(outbound.clone()));

        let agent = Arc::new(
            AgentLoop::builder(
                Arc::clone(&state.model),
                Arc::clone(&state.tools),
                build_memory(config),
            )
            .human_input(
                human.clone(),
                Duration::from_secs(config.agent.human_input_timeout_secs),
            )
            .config(config)
            .build(),
        );

        let updates = outbound.clone();
        let subscription = agent.subscribe(move |update| {
            let _ = updates.send(ServerFrame::Update {
                update: update.clone(),
            });
        });

        Arc::new(Self {
            id,
            agent,
            planner: Arc::new(Planner::new(Arc::clone(&state.model))),
            human,
            registry: state.registry.clone(),
            outbound,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent(&self) -> &AgentLoop {
        &self.agent
    }

    /// React to one client frame.
    pub fn handle(self: &Arc<Self>, frame: ClientFrame) {
        debug!(session = %self.id, frame = ?frame, "Client frame");
        match frame {
            ClientFrame::Input { content } => self.begin(vec![content], Vec::new()),
            ClientFrame::Restart { goals, steps } => self.begin(goals, steps),
            ClientFrame::Reply { content } => {
                if !self.human.answer(content) {
                    self.send(ServerFrame::error("No human input was requested"));
                }
            }
            ClientFrame::Pause => self.agent.pause(),
            ClientFrame::Resume { steps } => self.agent.resume(steps),
            ClientFrame::Stop { reason } => self.agent.stop(reason),
            ClientFrame::PlanClarify { content } => self.plan(content, false),
            ClientFrame::PlanPolish { content } => self.plan(content, true),
        }
    }

    /// Stop the run and detach from the agent. Called on disconnect.
    pub fn close(&self) {
        self.agent.stop(Some("client disconnected".into()));
        self.human.cancel();
        if let Some(sub) = self.subscription.lock().unwrap_or_else(|p| p.into_inner()).take() {
            sub.unsubscribe();
        }
        info!(session = %self.id, "Session closed");
    }

    fn begin(self: &Arc<Self>, goals: Vec<String>, steps: Vec<PendingStep>) {
        let guard = match self.registry.try_begin(self.id.as_str()) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(session = %self.id, "Rejected start: {e}");
                self.send(ServerFrame::error(e.to_string()));
                return;
            }
        };

        // Claimed here, not in the task, so a stop frame that follows at once still applies.
        let claim = match self.agent.claim() {
            Ok(claim) => claim,
            Err(e) => {
                warn!(session = %self.id, "Rejected start: {e}");
                self.send(ServerFrame::error(e.to_string()));
                return;
            }
        };

        info!(session = %self.id, goals = ?goals, pending = steps.len(), "Starting run");
        self.send(ServerFrame::Start {
            goals: goals.clone(),
        });

        let session = Arc::clone(self);
        tokio::spawn(async move {
            let result = session.agent.start_claimed(claim, goals, steps).await;
            drop(guard);
            let frame = match result {
                Ok(outcome) => ServerFrame::FinalResponse {
                    content: outcome.text(),
                },
                Err(e) => ServerFrame::error(e.to_string()),
            };
            session.send(frame);
        });
    }

    fn plan(self: &Arc<Self>, content: String, polish: bool) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let frame = if polish {
                match session.planner.polish(&content).await {
                    Ok(polished) => ServerFrame::Plan {
                        plan: polished.document(),
                        content: polished.reply,
                    },
                    Err(e) => ServerFrame::error(e.to_string()),
                }
            } else {
                match session.planner.clarify(&content).await {
                    Ok(reply) => ServerFrame::PlanReply { content: reply },
                    Err(e) => ServerFrame::error(e.to_string()),
                }
            };
            session.send(frame);
        });
    }

    fn send(&self, frame: ServerFrame) {
        if self.outbound.send(frame).is_err() {
            debug!(session = %self.id, "Client gone, dropping frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedModel, state_with};
    use orchestra_core::event::AgentUpdate;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn finish(response: &str) -> String {
        json!({"command": {"name": "finish", "args": {"response": response}}}).to_string()
    }

    fn ask(question: &str) -> String {
        json!({"command": {"name": "request-human-input", "args": {"input": question}}}).to_string()
    }

    async fn next_non_update(rx: &mut UnboundedReceiver<ServerFrame>) -> ServerFrame {
        loop {
            match rx.recv().await.expect("session closed") {
                ServerFrame::Update { .. } => continue,
                other => return other,
            }
        }
    }

    #[tokio::test]
    async fn input_runs_to_final_response() {
        let state = state_with(ScriptedModel::new(vec![finish("done")]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s1", &state, tx);

        session.handle(ClientFrame::Input { content: "write a haiku".into() });

        assert_eq!(
            rx.recv().await.unwrap(),
            ServerFrame::Start { goals: vec!["write a haiku".into()] }
        );
        let mut saw_step = false;
        let final_frame = loop {
            match rx.recv().await.unwrap() {
                ServerFrame::Update { update: AgentUpdate::ActionStart { steps, .. } } => {
                    saw_step = steps.len() == 1;
                }
                ServerFrame::Update { .. } => {}
                other => break other,
            }
        };
        assert!(saw_step);
        assert_eq!(final_frame, ServerFrame::FinalResponse { content: Some("done".into()) });
    }

    #[tokio::test]
    async fn human_input_round_trip() {
        let state = state_with(ScriptedModel::new(vec![ask("which color?"), finish("blue it is")]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s2", &state, tx);

        session.handle(ClientFrame::Input { content: "pick a color".into() });
        assert!(matches!(next_non_update(&mut rx).await, ServerFrame::Start { .. }));
        assert_eq!(
            next_non_update(&mut rx).await,
            ServerFrame::RequestHumanInput { content: "which color?".into() }
        );

        session.handle(ClientFrame::Reply { content: "blue".into() });
        assert_eq!(
            next_non_update(&mut rx).await,
            ServerFrame::FinalResponse { content: Some("blue it is".into()) }
        );
        let steps = session.agent().steps();
        assert_eq!(
            steps[0].result.as_deref(),
            Some("Command request-human-input returned: blue")
        );
    }

    #[tokio::test]
    async fn reply_without_question_is_an_error() {
        let state = state_with(ScriptedModel::new(Vec::<String>::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s3", &state, tx);

        session.handle(ClientFrame::Reply { content: "hello?".into() });
        assert!(matches!(rx.recv().await.unwrap(), ServerFrame::Error { .. }));
    }

    #[tokio::test]
    async fn second_input_while_running_is_rejected() {
        let state = state_with(ScriptedModel::new(vec![ask("wait for me")]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s4", &state, tx);

        session.handle(ClientFrame::Input { content: "first".into() });
        assert!(matches!(next_non_update(&mut rx).await, ServerFrame::Start { .. }));
        assert!(matches!(
            next_non_update(&mut rx).await,
            ServerFrame::RequestHumanInput { .. }
        ));

        session.handle(ClientFrame::Input { content: "second".into() });
        let ServerFrame::Error { message } = next_non_update(&mut rx).await else {
            panic!("expected busy error");
        };
        assert!(message.contains("already has an active run"));

        session.close();
        assert_eq!(
            next_non_update(&mut rx).await,
            ServerFrame::FinalResponse {
                content: Some("Stopped with reason: client disconnected".into())
            }
        );
    }

    #[tokio::test]
    async fn stop_frame_ends_the_run() {
        let state = state_with(ScriptedModel::new(vec![ask("anything?")]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s5", &state, tx);

        session.handle(ClientFrame::Input { content: "go".into() });
        assert!(matches!(next_non_update(&mut rx).await, ServerFrame::Start { .. }));
        assert!(matches!(
            next_non_update(&mut rx).await,
            ServerFrame::RequestHumanInput { .. }
        ));

        session.handle(ClientFrame::Stop { reason: Some("enough".into()) });
        assert_eq!(
            next_non_update(&mut rx).await,
            ServerFrame::FinalResponse { content: Some("Stopped with reason: enough".into()) }
        );
    }

    #[tokio::test]
    async fn stop_right_after_input_is_not_lost() {
        let state = state_with(ScriptedModel::new(vec![finish("too late")]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s7", &state, tx);

        session.handle(ClientFrame::Input { content: "go".into() });
        session.handle(ClientFrame::Stop { reason: Some("changed my mind".into()) });

        assert!(matches!(next_non_update(&mut rx).await, ServerFrame::Start { .. }));
        assert_eq!(
            next_non_update(&mut rx).await,
            ServerFrame::FinalResponse {
                content: Some("Stopped with reason: changed my mind".into())
            }
        );
    }

    #[tokio::test]
    async fn planner_clarifies_then_polishes() {
        let polished = "```\n## Goals\n- Find a cafe in Lisbon\n```";
        let state = state_with(ScriptedModel::new(vec!["Which city?", polished]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s8", &state, tx);

        session.handle(ClientFrame::PlanClarify {
            content: "## Goals\n- Find a cafe in {city}".into(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerFrame::PlanReply { content: "Which city?".into() }
        );

        session.handle(ClientFrame::PlanPolish { content: "Lisbon".into() });
        let ServerFrame::Plan { content, plan } = rx.recv().await.unwrap() else {
            panic!("expected a plan");
        };
        assert_eq!(content, polished);
        assert_eq!(plan.unwrap().goals(), vec!["Find a cafe in Lisbon".to_string()]);
    }

    #[tokio::test]
    async fn restart_replays_steps() {
        let state = state_with(ScriptedModel::new(Vec::<String>::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("s6", &state, tx);

        session.handle(ClientFrame::Restart {
            goals: vec!["replay".into()],
            steps: vec![PendingStep {
                user_message: None,
                assistant_reply: Some(finish("replayed")),
                result: None,
            }],
        });
        assert!(matches!(next_non_update(&mut rx).await, ServerFrame::Start { .. }));
        assert_eq!(
            next_non_update(&mut rx).await,
            ServerFrame::FinalResponse { content: Some("replayed".into()) }
        );
    }
}
