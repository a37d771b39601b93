//! Stage execution: one model round trip per call, validated against that stage's contract.
//!
//! Flow for every stage: build prompt → gateway → parse reply → contract → typed result.
//! Nothing here touches session state or a document store; the session orchestrator and the
//! stateless HTTP handlers both call into these functions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::errors::AppError;
use crate::generation::contract::{
    parse_reply, validate_document, validate_experience_rewrite, validate_match_analysis,
    MatchAnalysis,
};
use crate::generation::prompts::{
    build_ats_request, build_custom_request, build_generation_request, build_match_request,
    build_rewrite_request,
};
use crate::llm_client::{ModelGateway, ModelRequest};
use crate::models::resume::{ResumeDocument, WorkExperience};

/// Upper bound on job description length, in characters.
pub const MAX_JOB_DESCRIPTION_CHARS: usize = 10_000;

/// The three fixed revision stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionStage {
    MatchAnalysis,
    ExperienceRewrite,
    AtsOptimization,
}

impl RevisionStage {
    pub fn number(self) -> u8 {
        match self {
            RevisionStage::MatchAnalysis => 1,
            RevisionStage::ExperienceRewrite => 2,
            RevisionStage::AtsOptimization => 3,
        }
    }
}

impl TryFrom<u8> for RevisionStage {
    type Error = AppError;

    fn try_from(stage: u8) -> Result<Self, Self::Error> {
        match stage {
            1 => Ok(RevisionStage::MatchAnalysis),
            2 => Ok(RevisionStage::ExperienceRewrite),
            3 => Ok(RevisionStage::AtsOptimization),
            _ => Err(invalid_stage()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub job_description: Option<String>,
    pub current_resume: Option<ResumeDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub resume: ResumeDocument,
}

/// Loosely-typed wire body of a revise call; converted into `ReviseRequest` before dispatch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviseBody {
    pub stage: Option<Value>,
    pub job_description: Option<String>,
    pub resume: Option<ResumeDocument>,
    pub missing_keywords: Option<Vec<String>>,
}

/// One variant per stage, each carrying exactly the inputs that stage needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviseRequest {
    MatchAnalysis {
        job_description: String,
        resume: ResumeDocument,
    },
    ExperienceRewrite {
        job_description: String,
        resume: ResumeDocument,
        missing_keywords: Vec<String>,
    },
    AtsOptimization {
        resume: ResumeDocument,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReviseResponse {
    MatchAnalysis(MatchAnalysis),
    #[serde(rename_all = "camelCase")]
    ExperienceRewrite {
        work_experiences: Vec<WorkExperience>,
    },
    AtsOptimization {
        resume: ResumeDocument,
    },
}

impl ReviseRequest {
    pub fn stage(&self) -> RevisionStage {
        match self {
            ReviseRequest::MatchAnalysis { .. } => RevisionStage::MatchAnalysis,
            ReviseRequest::ExperienceRewrite { .. } => RevisionStage::ExperienceRewrite,
            ReviseRequest::AtsOptimization { .. } => RevisionStage::AtsOptimization,
        }
    }
}

impl TryFrom<ReviseBody> for ReviseRequest {
    type Error = AppError;

    fn try_from(body: ReviseBody) -> Result<Self, Self::Error> {
        let stage = body
            .stage
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|n| n.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(n))
            .map(|n| n as u8)
            .ok_or_else(invalid_stage)
            .and_then(RevisionStage::try_from)?;

        let resume = body
            .resume
            .ok_or_else(|| AppError::Validation("Resume is required.".to_string()))?;

        let job_description = match stage {
            RevisionStage::AtsOptimization => None,
            _ => Some(
                validate_job_description(body.job_description.as_deref())
                    .map_err(|_| {
                        AppError::Validation(
                            "A job description of at most 10,000 characters is required for stages 1 and 2."
                                .to_string(),
                        )
                    })?
                    .to_string(),
            ),
        };

        Ok(match (stage, job_description) {
            (RevisionStage::MatchAnalysis, Some(job_description)) => ReviseRequest::MatchAnalysis {
                job_description,
                resume,
            },
            (RevisionStage::ExperienceRewrite, Some(job_description)) => {
                let missing_keywords = body.missing_keywords.ok_or_else(|| {
                    AppError::Validation("missingKeywords array is required for stage 2.".to_string())
                })?;
                ReviseRequest::ExperienceRewrite {
                    job_description,
                    resume,
                    missing_keywords,
                }
            }
            _ => ReviseRequest::AtsOptimization { resume },
        })
    }
}

fn invalid_stage() -> AppError {
    AppError::Validation("Invalid stage. Must be 1, 2, or 3.".to_string())
}

/// Non-blank and within the length limit. Returns the trimmed text.
pub fn validate_job_description(job_description: Option<&str>) -> Result<&str, AppError> {
    let trimmed = job_description.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Job description is required.".to_string()));
    }
    if trimmed.chars().count() > MAX_JOB_DESCRIPTION_CHARS {
        return Err(AppError::Validation(
            "Job description is too long. Please limit to 10,000 characters.".to_string(),
        ));
    }
    Ok(trimmed)
}

// ────────────────────────────────────────────────────────────────────────────
// Stage entry points
// ────────────────────────────────────────────────────────────────────────────

/// Single entry point for the three revision stages.
pub async fn revise(
    gateway: &dyn ModelGateway,
    request: ReviseRequest,
) -> Result<ReviseResponse, AppError> {
    match request {
        ReviseRequest::MatchAnalysis {
            job_description,
            resume,
        } => analyze_match(gateway, &job_description, &resume)
            .await
            .map(ReviseResponse::MatchAnalysis),
        ReviseRequest::ExperienceRewrite {
            job_description,
            resume,
            missing_keywords,
        } => rewrite_experience(
            gateway,
            &job_description,
            &missing_keywords,
            &resume.work_experiences,
        )
        .await
        .map(|work_experiences| ReviseResponse::ExperienceRewrite { work_experiences }),
        ReviseRequest::AtsOptimization { resume } => optimize_for_ats(gateway, &resume)
            .await
            .map(|resume| ReviseResponse::AtsOptimization { resume }),
    }
}

/// Generates a full document, optionally tailoring `current` instead of inventing sample content.
pub async fn generate(
    gateway: &dyn ModelGateway,
    job_description: &str,
    current: Option<&ResumeDocument>,
) -> Result<ResumeDocument, AppError> {
    let request = build_generation_request(job_description, current)?;
    let document = validate_document(round_trip(gateway, &request).await?)?;
    info!(
        "Generated resume: {} work experiences, {} educations, based_on_current={}",
        document.work_experiences.len(),
        document.educations.len(),
        current.is_some()
    );
    Ok(document)
}

/// Stage 1.
pub async fn analyze_match(
    gateway: &dyn ModelGateway,
    job_description: &str,
    resume: &ResumeDocument,
) -> Result<MatchAnalysis, AppError> {
    let request = build_match_request(job_description, resume)?;
    let analysis = validate_match_analysis(&round_trip(gateway, &request).await?)?;
    info!(
        "Match analysis: score={}/100, {} missing keywords",
        analysis.score,
        analysis.missing_keywords.len()
    );
    Ok(analysis)
}

/// Stage 2. Returns the replacement work experience section.
pub async fn rewrite_experience(
    gateway: &dyn ModelGateway,
    job_description: &str,
    missing_keywords: &[String],
    experiences: &[WorkExperience],
) -> Result<Vec<WorkExperience>, AppError> {
    let request = build_rewrite_request(job_description, missing_keywords, experiences)?;
    let rewritten = validate_experience_rewrite(&round_trip(gateway, &request).await?, experiences)?;
    info!("Rewrote {} work experiences", rewritten.len());
    Ok(rewritten)
}

/// Stage 3. Returns the replacement document.
pub async fn optimize_for_ats(
    gateway: &dyn ModelGateway,
    resume: &ResumeDocument,
) -> Result<ResumeDocument, AppError> {
    let request = build_ats_request(resume)?;
    Ok(validate_document(round_trip(gateway, &request).await?)?)
}

/// Free-form instruction. Same contract as generation and stage 3.
pub async fn apply_instruction(
    gateway: &dyn ModelGateway,
    instruction: &str,
    job_description: Option<&str>,
    resume: &ResumeDocument,
) -> Result<ResumeDocument, AppError> {
    let request = build_custom_request(instruction, job_description, resume)?;
    Ok(validate_document(round_trip(gateway, &request).await?)?)
}

async fn round_trip(
    gateway: &dyn ModelGateway,
    request: &ModelRequest,
) -> Result<Map<String, Value>, AppError> {
    let raw = gateway.complete(request).await?;
    Ok(parse_reply(&raw)?)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
