// SPDX-License-Identifier: MIT

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::{EngineConfig, FlowError, StateMap};
use crate::flow::steps::prism;
use crate::flow::workflow::graph::{GraphDefinition, GraphExecutor};
use crate::flow::workflow::run::WorkflowRun;

const VERSION: &str = env!("CARGO_PKG_VERSION");

type Executor = State<Arc<GraphExecutor>>;

/// Build the HTTP routes around a shared executor
pub fn router(executor: Arc<GraphExecutor>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .route("/graph/create", post(create_graph))
        .route("/graph/run", post(run_graph))
        .route("/graph/state/{run_id}", get(get_run_state))
        .route("/graph/cancel/{run_id}", post(cancel_run))
        .route("/graph/{graph_id}", get(get_graph))
        .route("/prism/run", post(run_prism))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(executor)
}

pub async fn serve(executor: Arc<GraphExecutor>, config: &EngineConfig) -> Result<(), FlowError> {
    let app = router(executor);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// `FlowError` rendered as a JSON error body with a matching status code
struct ApiError(FlowError);

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FlowError::GraphNotFound(_) | FlowError::RunNotFound(_) => StatusCode::NOT_FOUND,
            FlowError::InvalidCondition { .. }
            | FlowError::InvalidGraph { .. }
            | FlowError::Json(_)
            | FlowError::Yaml(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

async fn root(State(executor): Executor) -> Json<Value> {
    Json(json!({
        "name": "QuantumFlow",
        "version": VERSION,
        "status": "running",
        "tools_registered": executor.registry().count().await,
    }))
}

async fn health_check(State(executor): Executor) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "tools_count": executor.registry().count().await,
        "version": VERSION,
    }))
}

async fn list_tools(State(executor): Executor) -> Json<Value> {
    let tools = executor.registry().list().await;
    Json(json!({ "count": tools.len(), "tools": tools }))
}

async fn create_graph(
    State(executor): Executor,
    Json(definition): Json<GraphDefinition>,
) -> ApiResult {
    let name = definition.name.clone();
    let mut nodes: Vec<String> = definition.nodes.keys().cloned().collect();
    nodes.sort();

    let graph_id = executor.register_graph(definition).await?;
    Ok(Json(json!({
        "graph_id": graph_id,
        "message": format!("Graph '{}' created successfully", name),
        "nodes": nodes,
    })))
}

async fn get_graph(State(executor): Executor, Path(graph_id): Path<String>) -> ApiResult {
    let graph = executor.get_graph(&graph_id).await?;
    let definition = serde_json::to_value(graph.definition()).map_err(FlowError::from)?;
    Ok(Json(definition))
}

#[derive(Deserialize)]
struct RunRequest {
    graph_id: String,
    #[serde(default)]
    initial_state: StateMap,
    /// Return immediately and let the caller poll `/graph/state/{run_id}`
    #[serde(default)]
    background: bool,
}

async fn run_graph(State(executor): Executor, Json(payload): Json<RunRequest>) -> ApiResult {
    if payload.background {
        let handle = executor
            .clone()
            .spawn(&payload.graph_id, payload.initial_state)
            .await?;
        return Ok(Json(json!({
            "run_id": handle.run_id,
            "status": "running",
        })));
    }

    let run = executor
        .execute(&payload.graph_id, payload.initial_state)
        .await?;
    Ok(Json(run_summary(&run)))
}

async fn get_run_state(State(executor): Executor, Path(run_id): Path<String>) -> ApiResult {
    let run = executor
        .get_run(&run_id)
        .await
        .ok_or(FlowError::RunNotFound(run_id))?;

    Ok(Json(json!({
        "run_id": run.run_id,
        "status": run.status,
        "current_state": run.state,
        "execution_time_seconds": run.execution_time_seconds(),
        "error": run.error,
    })))
}

async fn cancel_run(State(executor): Executor, Path(run_id): Path<String>) -> ApiResult {
    if !executor.cancel(&run_id).await {
        return Err(FlowError::RunNotFound(run_id).into());
    }
    Ok(Json(json!({ "run_id": run_id, "cancelled": true })))
}

#[derive(Deserialize)]
struct PrismRequest {
    code: String,
    #[serde(default = "default_threshold")]
    threshold: i64,
    #[serde(default = "default_max_iterations")]
    max_iterations: i64,
}

fn default_threshold() -> i64 {
    prism::DEFAULT_THRESHOLD
}

fn default_max_iterations() -> i64 {
    prism::DEFAULT_MAX_ITERATIONS
}

async fn run_prism(State(executor): Executor, Json(payload): Json<PrismRequest>) -> ApiResult {
    let graph_id = executor.register_graph(prism::prism_graph()).await?;
    let state = prism::initial_state(&payload.code, payload.threshold, payload.max_iterations);
    let run = executor.execute(&graph_id, state).await?;

    let execution_log: Vec<Value> = run
        .logs
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            json!({
                "step": i + 1,
                "timestamp": entry.timestamp,
                "level": entry.level,
                "message": entry.message,
            })
        })
        .collect();

    let mut summary = run_summary(&run);
    summary["graph_id"] = json!(graph_id);
    summary["execution_log"] = json!(execution_log);
    Ok(Json(summary))
}

fn run_summary(run: &WorkflowRun) -> Value {
    json!({
        "run_id": run.run_id,
        "status": run.status,
        "final_state": run.state,
        "logs": run.logs,
        "execution_time_seconds": run.execution_time_seconds(),
        "error": run.error,
    })
}
