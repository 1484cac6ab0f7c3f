//! `/procs*` REST routes. Grounded on the handler shape of the teacher's
//! `routes/database.rs::logs` (`Path`/`Query` extractors, a resolve-or-404
//! step up front, `Json` on the way out) generalized to the route table in
//! spec.md §6; the route list itself follows
//! `original_source/app/main.py` one-for-one.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use fleetd_core::{LogRecord, ProcessSupervisor};
use serde::Deserialize;

use crate::domain::{CreateProcessRequest, ProcessDescriptor};
use crate::error::ApiError;
use crate::AppState;

pub fn procs_router() -> Router<AppState> {
    Router::new()
        .route("/procs", get(list_processes).post(create_process))
        .route("/procs/:name", get(get_process).delete(delete_process))
        .route("/procs/:name/start", post(start_process))
        .route("/procs/:name/write", post(write_process))
        .route("/procs/:name/tail", get(tail_process))
        .route("/procs/:name/tail-text", get(tail_process_text))
        .route("/procs/:name/stop", post(stop_process))
        .route("/procs/:name/restart", post(restart_process))
}

async fn resolve(state: &AppState, name: &str) -> Result<Arc<ProcessSupervisor>, ApiError> {
    state
        .registry
        .get(name)
        .ok_or_else(|| ApiError::Supervisor(fleetd_core::SupervisorError::NotFound(name.to_string())))
}

async fn list_processes(State(state): State<AppState>) -> Result<Json<Vec<ProcessDescriptor>>, ApiError> {
    Ok(Json(ProcessDescriptor::from_supervisors(&state.registry.list()).await))
}

#[derive(Deserialize)]
pub struct CreateQuery {
    #[serde(default = "default_true")]
    start: bool,
}

fn default_true() -> bool {
    true
}

async fn create_process(
    State(state): State<AppState>,
    Query(query): Query<CreateQuery>,
    Json(req): Json<CreateProcessRequest>,
) -> Result<Json<ProcessDescriptor>, ApiError> {
    let supervisor = state.registry.create(&req.name, req.command)?;
    if query.start {
        supervisor.start().await?;
    }
    Ok(Json(ProcessDescriptor::from_supervisor(&supervisor).await))
}

async fn get_process(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<ProcessDescriptor>, ApiError> {
    let supervisor = resolve(&state, &name).await?;
    Ok(Json(ProcessDescriptor::from_supervisor(&supervisor).await))
}

async fn start_process(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<ProcessDescriptor>, ApiError> {
    let supervisor = resolve(&state, &name).await?;
    supervisor.start().await?;
    Ok(Json(ProcessDescriptor::from_supervisor(&supervisor).await))
}

async fn write_process(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: String,
) -> Result<axum::http::StatusCode, ApiError> {
    let supervisor = resolve(&state, &name).await?;
    supervisor.write(&body).await?;
    Ok(axum::http::StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
pub struct TailQuery {
    n: i64,
    #[serde(default = "default_true")]
    include_stderr: bool,
}

async fn tail_process(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<TailQuery>,
) -> Result<Json<Vec<LogRecord>>, ApiError> {
    let supervisor = resolve(&state, &name).await?;
    Ok(Json(supervisor.tail(query.n, query.include_stderr).await?))
}

#[derive(Deserialize)]
pub struct TailTextQuery {
    n: i64,
    #[serde(default = "default_true")]
    include_stderr: bool,
    #[serde(default = "default_true")]
    prefix_timestamp: bool,
}

async fn tail_process_text(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<TailTextQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let supervisor = resolve(&state, &name).await?;
    let records = supervisor.tail(query.n, query.include_stderr).await?;
    Ok(Json(records.into_iter().map(|r| r.format_line(query.prefix_timestamp)).collect()))
}

#[derive(Deserialize)]
pub struct StopQuery {
    #[serde(default)]
    kill: bool,
}

async fn stop_process(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<StopQuery>,
) -> Result<Json<ProcessDescriptor>, ApiError> {
    let supervisor = resolve(&state, &name).await?;
    supervisor.stop(query.kill).await;
    Ok(Json(ProcessDescriptor::from_supervisor(&supervisor).await))
}

#[derive(Deserialize)]
pub struct RestartQuery {
    #[serde(default)]
    kill_existing: bool,
    #[serde(default)]
    clear_logs: bool,
}

async fn restart_process(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<RestartQuery>,
) -> Result<Json<ProcessDescriptor>, ApiError> {
    let supervisor = resolve(&state, &name).await?;
    supervisor.restart(query.kill_existing, query.clear_logs).await?;
    Ok(Json(ProcessDescriptor::from_supervisor(&supervisor).await))
}

async fn delete_process(State(state): State<AppState>, Path(name): Path<String>) -> Result<axum::http::StatusCode, ApiError> {
    state.registry.delete(&name).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
