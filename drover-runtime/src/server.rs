use crate::error::RuntimeError;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use drover::{Agent, AgentError};
use drover_core::{AgentConfig, Progress};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Serves the control API until the process exits.
pub async fn serve(agent: Arc<Agent>, port: u16) -> Result<(), RuntimeError> {
    let app = router(agent);

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    debug!("control server listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/workload/start", post(start_workload))
        .route("/workload/stop", post(stop_workload))
        .route("/workload/progress", get(progress))
        .route("/config", post(set_config))
        .with_state(agent)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[derive(Error, Debug)]
enum HandlerError {
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let HandlerError::Agent(err) = self;
        match err {
            AgentError::AlreadyRunning => {
                (StatusCode::CONFLICT, "a workload run is already active".to_string())
            }
            AgentError::Config(err) => {
                (StatusCode::BAD_REQUEST, format!("invalid configuration: {err}"))
            }
        }
        .into_response()
    }
}

async fn start_workload(State(agent): State<Arc<Agent>>) -> Result<String, HandlerError> {
    agent.start()?;
    Ok("workload run started".to_string())
}

async fn stop_workload(State(agent): State<Arc<Agent>>) -> String {
    agent.cancel();
    "cancelling".to_string()
}

#[derive(Serialize)]
struct ProgressEntry {
    name: String,
    #[serde(flatten)]
    progress: Progress,
}

async fn progress(State(agent): State<Arc<Agent>>) -> Json<Vec<ProgressEntry>> {
    Json(
        agent
            .progress()
            .into_iter()
            .map(|(name, progress)| ProgressEntry { name, progress })
            .collect(),
    )
}

async fn set_config(
    State(agent): State<Arc<Agent>>,
    Json(config): Json<AgentConfig>,
) -> Result<String, HandlerError> {
    agent.set_config(config).map_err(AgentError::from)?;
    Ok("config updated".to_string())
}
