//! HTTP and WebSocket API.

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{RunConfig, RunRequest};
use crate::notify::{BroadcastSink, RunEvent};
use crate::orchestrator::OrchestratorError;
use crate::records::{RunId, RunStats, RunView};
use crate::supervisor::RunSupervisor;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    supervisor: RunSupervisor,
    events: BroadcastSink,
    default_model: String,
}

impl AppState {
    /// Creates handler state.
    ///
    /// `events` must be the sink the orchestrator publishes to.
    #[instrument(skip(supervisor, events))]
    pub fn new(supervisor: RunSupervisor, events: BroadcastSink, default_model: String) -> Self {
        Self {
            supervisor,
            events,
            default_model,
        }
    }
}

/// Response body of `GET /api/runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunList {
    /// Runs, newest first.
    pub runs: Vec<RunView>,
}

/// Error response rendered as `{"error": "..."}`.
#[derive(Debug, Clone, derive_more::Display)]
#[display("{status}: {message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Run not found".to_string(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        error!(error = %err, "Request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Builds the API router.
#[instrument(skip(state))]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/runs", get(list_runs).post(create_run))
        .route("/api/runs/{run_id}", get(get_run))
        .route("/api/runs/{run_id}/step", post(step_run))
        .route("/api/runs/{run_id}/abort", post(abort_run))
        .route("/api/stats", get(get_stats))
        .route("/ws", get(events_socket))
        .with_state(state)
}

/// Binds `host:port` and serves the API until the process ends.
///
/// # Errors
///
/// Returns the I/O error if the address cannot be bound or serving fails.
#[instrument(skip(state))]
pub async fn serve(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(address = %listener.local_addr()?, "Server ready");
    axum::serve(listener, router(state)).await
}

fn parse_run_id(raw: &str) -> Result<RunId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found())
}

#[instrument(skip(state))]
async fn list_runs(State(state): State<AppState>) -> Result<Json<RunList>, ApiError> {
    let runs = state.supervisor.orchestrator().list_runs()?;
    debug!(count = runs.len(), "Listing runs");
    Ok(Json(RunList { runs }))
}

#[instrument(skip(state))]
async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunView>, ApiError> {
    let run_id = parse_run_id(&run_id)?;
    state
        .supervisor
        .orchestrator()
        .get_run(run_id)?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

#[instrument(skip(state))]
async fn get_stats(State(state): State<AppState>) -> Result<Json<RunStats>, ApiError> {
    Ok(Json(state.supervisor.orchestrator().stats()?))
}

#[instrument(skip(state, body))]
async fn create_run(
    State(state): State<AppState>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunView>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected run request");
        ApiError::bad_request(rejection.body_text())
    })?;

    let config = RunConfig::from_request(&request, &state.default_model);
    let view = state.supervisor.orchestrator().initialize_run(&config)?;
    state.supervisor.launch(view.run.id);

    info!(run_id = %view.run.id, model_id = %config.model_id(), "Run created");
    Ok(Json(view))
}

#[instrument(skip(state))]
async fn step_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunView>, ApiError> {
    let run_id = parse_run_id(&run_id)?;
    state
        .supervisor
        .orchestrator()
        .step(run_id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

#[instrument(skip(state))]
async fn abort_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunView>, ApiError> {
    let run_id = parse_run_id(&run_id)?;
    state
        .supervisor
        .cancel(run_id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

#[instrument(skip(state, upgrade))]
async fn events_socket(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    let events = state.events.subscribe();
    upgrade.on_upgrade(move |socket| forward_events(socket, events))
}

/// Streams every event to one WebSocket client until either side closes.
#[instrument(skip_all)]
async fn forward_events(mut socket: WebSocket, mut events: broadcast::Receiver<RunEvent>) {
    info!("WebSocket client connected");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!(error = %e, kind = event.kind(), "Failed to encode event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    info!("WebSocket client disconnected");
}
