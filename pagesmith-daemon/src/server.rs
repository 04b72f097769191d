//! Intake router: `GET /` and `POST /deploy`.
//!
//! A deploy request is answered as soon as the secret checks out; the
//! pipeline then runs as a detached task whose outcome is only logged.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use pagesmith_core::Task;
use pagesmith_pipeline::Pipeline;

use crate::error::IntakeError;
use crate::protocol::{AcceptedResponse, DeployRequest, HealthResponse};

#[derive(Clone)]
pub struct AppState {
    secret: Arc<str>,
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(secret: impl Into<Arc<str>>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            secret: secret.into(),
            pipeline,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/deploy", post(deploy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

async fn deploy(
    State(state): State<AppState>,
    body: Result<Json<DeployRequest>, JsonRejection>,
) -> Result<Json<AcceptedResponse>, IntakeError> {
    let Json(request) = body.map_err(|e| IntakeError::MalformedRequest(e.body_text()))?;
    if request.secret != *state.secret {
        tracing::warn!(task = %request.task, round = request.round, "deploy rejected: bad secret");
        return Err(IntakeError::AuthRejected);
    }

    let task = request.into_task();
    let accepted = AcceptedResponse::for_task(&task);
    tracing::info!(task = %task.id, round = task.round, "task accepted");
    dispatch(state.pipeline.clone(), task);
    Ok(Json(accepted))
}

/// Run the pipeline for `task` in the background.
///
/// A second task awaits the first so a panic inside the pipeline is logged
/// rather than lost with the join handle.
pub fn dispatch(pipeline: Arc<Pipeline>, task: Task) -> JoinHandle<()> {
    let id = task.id.clone();
    let round = task.round;
    let run = tokio::spawn(async move { pipeline.run(&task).await });
    tokio::spawn(async move {
        match run.await {
            Ok(report) => tracing::info!(
                task = %id,
                round,
                terminal = %report.terminal(),
                "pipeline finished",
            ),
            Err(err) if err.is_panic() => {
                tracing::error!(task = %id, round, "pipeline panicked");
            }
            Err(err) => tracing::error!(task = %id, round, error = %err, "pipeline aborted"),
        }
    })
}
