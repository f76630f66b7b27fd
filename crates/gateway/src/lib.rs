//! HTTP + WebSocket gateway for Orchestra.
//!
//! - `GET /health` — liveness and version
//! - `GET /ws`     — one agent session per connection
//!
//! Built on Axum. Each connection gets its own `AgentLoop`; the shared
//! `RunRegistry` admits at most one active run per session.

pub mod protocol;
pub mod session;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use orchestra_agent::RunRegistry;
use orchestra_config::AppConfig;
use orchestra_core::provider::ChatModel;
use orchestra_core::tool::ToolRegistry;

pub use protocol::{ClientFrame, ServerFrame};
pub use session::{Session, WsHumanInput};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub model: Arc<dyn ChatModel>,
    pub tools: Arc<ToolRegistry>,
    pub registry: RunRegistry,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway server.
///
/// Builds the model and tools once; sessions share them.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let model = orchestra_providers::build_model(&config)?;
    let tools = Arc::new(orchestra_tools::default_registry(&config));
    info!(model = model.name(), tools = ?tools.names(), "Gateway subsystems ready");

    let state = Arc::new(GatewayState {
        config,
        model,
        tools,
        registry: RunRegistry::new(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: SharedState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let session = Session::new(uuid::Uuid::new_v4().to_string(), &state, tx.clone());
    info!(session = %session.id(), "WebSocket connection established");

    // Writer: frames from the session and the agent go out in order.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to encode frame: {e}");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket receive error: {e}");
                break;
            }
        };

        match serde_json::from_str::<ClientFrame>(&text) {
            Ok(frame) => session.handle(frame),
            Err(e) => {
                let _ = tx.send(ServerFrame::error(format!("Invalid message: {e}")));
            }
        }
    }

    session.close();
    drop(tx);
    writer.abort();
    info!(session = %session.id(), "WebSocket connection closed");
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use orchestra_core::error::ProviderError;
    use orchestra_core::message::Message;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns scripted replies in order; errors once exhausted.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedModel {
        pub fn new<S: Into<String>>(replies: Vec<S>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _messages: &[Message]) -> Result<String, ProviderError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::EmptyResponse("script exhausted".into()))
        }
    }

    pub fn state_with(model: ScriptedModel) -> GatewayState {
        let mut config = AppConfig::default();
        config.memory.backend = "none".into();
        GatewayState {
            config,
            model: Arc::new(model),
            tools: Arc::new(ToolRegistry::new()),
            registry: RunRegistry::new(),
        }
    }
}
