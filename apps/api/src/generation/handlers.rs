//! Axum route handlers for the stateless Generate / Revise API.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::info;

use crate::errors::AppError;
use crate::generation::stages::{
    generate, revise, validate_job_description, GenerateRequest, GenerateResponse, ReviseBody,
    ReviseRequest, ReviseResponse,
};
use crate::state::AppState;

/// POST /api/v1/resumes/generate
///
/// Single-shot generation. With `currentResume` the model tailors it;
/// without one it produces sample content for the role.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = payload?;
    let job_description = validate_job_description(request.job_description.as_deref())?;

    let resume = generate(
        state.gateway.as_ref(),
        job_description,
        request.current_resume.as_ref(),
    )
    .await?;

    Ok(Json(GenerateResponse { resume }))
}

/// POST /api/v1/resumes/revise
///
/// Runs one revision stage: 1 = match analysis, 2 = experience rewrite, 3 = ATS optimization.
pub async fn handle_revise(
    State(state): State<AppState>,
    payload: Result<Json<ReviseBody>, JsonRejection>,
) -> Result<Json<ReviseResponse>, AppError> {
    let Json(body) = payload?;
    let request = ReviseRequest::try_from(body)?;
    info!("Revise request for stage {}", request.stage().number());

    let response = revise(state.gateway.as_ref(), request).await?;
    Ok(Json(response))
}
