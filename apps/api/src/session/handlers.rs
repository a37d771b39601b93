//! Axum route handlers for stateful revision sessions.
//!
//! Model-calling handlers run the orchestrator on a spawned task. A client that
//! disconnects mid-call drops only the response; the session still settles.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::contract::MatchAnalysis;
use crate::generation::stages::RevisionStage;
use crate::models::resume::ResumeDocument;
use crate::session::orchestrator::Orchestrator;
use crate::session::state::SessionView;
use crate::session::store::InMemoryDocumentStore;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub resume: Option<ResumeDocument>,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptionRequest {
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceResumeRequest {
    pub resume: ResumeDocument,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGenerateRequest {
    #[serde(default = "default_use_existing")]
    pub use_existing_resume: bool,
}

fn default_use_existing() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CustomInstructionRequest {
    pub instruction: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub session: SessionView,
    pub resume: ResumeDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_analysis: Option<MatchAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted: Option<bool>,
}

impl SessionResponse {
    async fn of(session_id: Uuid, orchestrator: &Orchestrator) -> Self {
        Self {
            session_id,
            session: orchestrator.view().await,
            resume: orchestrator.document().await,
            match_analysis: None,
            reverted: None,
        }
    }
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let Json(request) = payload?;
    let store = InMemoryDocumentStore::new(request.resume.unwrap_or_default());
    let orchestrator = Orchestrator::new(state.gateway.clone(), Arc::new(store), "");
    if let Some(job_description) = request.job_description.as_deref() {
        orchestrator.set_job_description(job_description).await?;
    }

    let (session_id, orchestrator) = state.sessions.insert(orchestrator).await;
    info!("Created revision session {session_id}");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::of(session_id, &orchestrator).await),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let orchestrator = state.sessions.get(id).await?;
    Ok(Json(SessionResponse::of(id, &orchestrator).await))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    state.sessions.remove(id).await?;
    info!("Deleted revision session {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/job-description
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<JobDescriptionRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let orchestrator = state.sessions.get(id).await?;
    orchestrator
        .set_job_description(&request.job_description)
        .await?;
    Ok(Json(SessionResponse::of(id, &orchestrator).await))
}

/// PUT /api/v1/sessions/:id/resume
pub async fn handle_replace_resume(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReplaceResumeRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let orchestrator = state.sessions.get(id).await?;
    orchestrator.replace_document(request.resume).await?;
    Ok(Json(SessionResponse::of(id, &orchestrator).await))
}

/// POST /api/v1/sessions/:id/generate
pub async fn handle_session_generate(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SessionGenerateRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let orchestrator = state.sessions.get(id).await?;

    let task = orchestrator.clone();
    detached(async move { task.generate(request.use_existing_resume).await }).await?;
    Ok(Json(SessionResponse::of(id, &orchestrator).await))
}

/// POST /api/v1/sessions/:id/score
pub async fn handle_score(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let orchestrator = state.sessions.get(id).await?;

    let task = orchestrator.clone();
    let analysis = detached(async move { task.run_match_analysis().await }).await?;
    let mut response = SessionResponse::of(id, &orchestrator).await;
    response.match_analysis = Some(analysis);
    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/rewrite
pub async fn handle_rewrite(
    state: State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    run_document_stage(state, path, RevisionStage::ExperienceRewrite).await
}

/// POST /api/v1/sessions/:id/optimize
pub async fn handle_optimize(
    state: State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    run_document_stage(state, path, RevisionStage::AtsOptimization).await
}

/// POST /api/v1/sessions/:id/custom
pub async fn handle_custom_instruction(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CustomInstructionRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let orchestrator = state.sessions.get(id).await?;

    let task = orchestrator.clone();
    detached(async move { task.run_custom_instruction(&request.instruction).await }).await?;
    Ok(Json(SessionResponse::of(id, &orchestrator).await))
}

/// POST /api/v1/sessions/:id/revert
pub async fn handle_revert(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let orchestrator = state.sessions.get(id).await?;
    let reverted = orchestrator.revert().await?;

    let mut response = SessionResponse::of(id, &orchestrator).await;
    response.reverted = Some(reverted);
    Ok(Json(response))
}

async fn run_document_stage(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    stage: RevisionStage,
) -> Result<Json<SessionResponse>, AppError> {
    let Path(id) = path?;
    let orchestrator = state.sessions.get(id).await?;

    let task = orchestrator.clone();
    detached(async move { task.run_stage(stage).await }).await?;
    Ok(Json(SessionResponse::of(id, &orchestrator).await))
}

/// Runs `task` to completion on its own tokio task.
async fn detached<T, F>(task: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Revision task failed: {e}")))?
}
