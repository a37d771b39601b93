// All model prompts for resume generation and revision.
// System policies are fixed per stage; shared fragments from llm_client::prompts are
// spliced in by `{placeholder}`. User payloads are formatted directly so text supplied
// by the candidate is never treated as a template slot.

use serde::Serialize;

use crate::errors::AppError;
use crate::llm_client::prompts::fill_shared_fragments;
use crate::llm_client::ModelRequest;
use crate::models::resume::{ResumeDocument, WorkExperience};

pub const GENERATION_TEMPERATURE: f32 = 0.7;
pub const MATCH_TEMPERATURE: f32 = 0.3;
pub const REWRITE_TEMPERATURE: f32 = 0.3;
pub const ATS_TEMPERATURE: f32 = 0.2;
pub const CUSTOM_TEMPERATURE: f32 = 0.3;

/// System policy for single-shot generation.
pub const GENERATION_SYSTEM: &str = r#"You are an expert resume writer and ATS (Applicant Tracking System) specialist.

Produce a resume tailored to the job description you are given:
1. Extract the key skills, technologies, qualifications and keywords from the job description
2. Work those keywords naturally into the resume content
3. Use strong action verbs and achievement-focused bullet points
4. Keep descriptions concise and scannable

{json_only}

Respond with exactly this structure:
{resume_shape}

Guidelines:
- 2-3 work experiences with 3-4 bullet points each
- 1-2 education entries and 1-2 relevant projects
- Exactly 6 featured skills: the most important skills from the job description
- Skill descriptions group related skills, e.g. "Languages: Python, Java, SQL"
- When a current resume is provided, keep its companies, titles, dates, schools and degrees intact"#;

/// System policy for stage 1: match scoring and keyword gap analysis.
pub const MATCH_SYSTEM: &str = r#"You are a senior technical recruiter evaluating how well a candidate fits a role.

Compare the resume with the job description and identify the gaps.

{json_only}

Respond with exactly this structure:
{
  "score": <integer 0-100, overall match>,
  "missingKeywords": ["keyword1", "keyword2", "keyword3", "keyword4", "keyword5"]
}

Scoring:
- 80-100: strong match, most required skills present
- 60-79: moderate match, several key skills missing
- 0-59: weak match, major gaps in required qualifications

missingKeywords must hold exactly 5 items: the most important skills, technologies or
qualifications from the job description that are absent or underrepresented in the resume."#;

/// System policy for stage 2: experience rewrite with the XYZ formula.
pub const REWRITE_SYSTEM: &str = r#"You are an expert resume writer who uses the XYZ formula: "Accomplished X, as measured by Y, by doing Z."

Rewrite every work experience bullet point with the XYZ structure and weave the listed
missing keywords in where the candidate's existing descriptions support them.

Rules:
- Keep company names, job titles and dates exactly as given
- Return exactly as many work experiences as you received, in the same order
- {no_fabrication}
- Metrics: only use numbers that already appear in the original bullet. When a bullet has no
  metric, describe the result qualitatively (e.g. "significantly reduced") and NEVER invent a
  percentage, count or amount.
- Missing keywords: only use a keyword when the existing descriptions show the candidate really
  worked with it. Skipping a keyword is better than claiming experience the candidate lacks.
- Restructure and strengthen; do not reinvent. The underlying facts must stay true.
- {emphasis}

{json_only}

Respond with exactly this structure:
{
  "workExperiences": [
    { "company": "string", "jobTitle": "string", "date": "string", "descriptions": ["string"] }
  ]
}"#;

/// System policy for stage 3: ATS readability pass over the whole document.
pub const ATS_SYSTEM: &str = r#"You are an ATS (Applicant Tracking System) optimization specialist.

Rewrite the resume for maximum machine readability:
- Use simple, parser-friendly dates (e.g. "Jan 2022 - Mar 2024")
- Remove special characters, tables, columns and unusual formatting from descriptions
- Start bullet points with strong action verbs and keep them scannable
- Raise the density of critical skills that already appear in the resume
- If a section is already ATS-friendly, reproduce it as-is
- {no_fabrication}
- Do not add skills, technologies or experiences that are not already in the resume; only
  improve phrasing and formatting
- {emphasis} Apply this across every description field, including 1-2 critical qualifications
  in the profile summary, and keep any bold added by earlier passes.

{json_only}

Respond with exactly this structure:
{resume_shape}"#;

/// System policy for a free-form user instruction applied to the whole document.
pub const CUSTOM_SYSTEM: &str = r#"You are an expert resume editor applying a specific change requested by the candidate.

Apply the candidate's instruction to the resume and return the complete, updated resume.
Leave every part the instruction does not concern unchanged.

Rules:
- {no_fabrication}
- If the instruction asks for something that would require inventing facts, apply only the
  parts that can be done truthfully
- {emphasis}

{json_only}

Respond with exactly this structure:
{resume_shape}"#;

/// Single-shot generation, optionally seeded with the current document.
pub fn build_generation_request(
    job_description: &str,
    current: Option<&ResumeDocument>,
) -> Result<ModelRequest, AppError> {
    let mut user = format!(
        "Generate a tailored resume for the following job description:\n\n---\n{job_description}\n---"
    );
    match current {
        Some(resume) => user.push_str(&format!(
            "\n\nHere is the candidate's current resume to use as a base. \
            Tailor it to the job description while keeping the core information intact:\n\n{}",
            to_json(resume)?
        )),
        None => user.push_str(
            "\n\nGenerate realistic sample resume content that would be a strong match for this position.",
        ),
    }

    Ok(request(GENERATION_SYSTEM, user, GENERATION_TEMPERATURE))
}

/// Stage 1: job description + full document.
pub fn build_match_request(
    job_description: &str,
    resume: &ResumeDocument,
) -> Result<ModelRequest, AppError> {
    let user = format!(
        "Job Description:\n---\n{job_description}\n---\n\nCandidate Resume:\n{}",
        to_json(resume)?
    );
    Ok(request(MATCH_SYSTEM, user, MATCH_TEMPERATURE))
}

/// Stage 2: job description + keyword gaps + the work experience section only.
pub fn build_rewrite_request(
    job_description: &str,
    missing_keywords: &[String],
    experiences: &[WorkExperience],
) -> Result<ModelRequest, AppError> {
    let user = format!(
        "Job Description:\n---\n{job_description}\n---\n\n\
        Missing Keywords to incorporate: {}\n\n\
        Current Work Experience:\n{}",
        missing_keywords.join(", "),
        to_json(experiences)?
    );
    Ok(request(REWRITE_SYSTEM, user, REWRITE_TEMPERATURE))
}

/// Stage 3: the document alone.
pub fn build_ats_request(resume: &ResumeDocument) -> Result<ModelRequest, AppError> {
    let user = format!(
        "Here is the resume to optimize for ATS compatibility:\n\n{}",
        to_json(resume)?
    );
    Ok(request(ATS_SYSTEM, user, ATS_TEMPERATURE))
}

/// Free-form instruction over the whole document, with the job description when one is set.
pub fn build_custom_request(
    instruction: &str,
    job_description: Option<&str>,
    resume: &ResumeDocument,
) -> Result<ModelRequest, AppError> {
    let job_context = job_description
        .map(|jd| format!("Target Job Description:\n---\n{jd}\n---\n\n"))
        .unwrap_or_default();
    let user = format!(
        "Instruction:\n---\n{instruction}\n---\n\n{job_context}Current Resume:\n{}",
        to_json(resume)?
    );
    Ok(request(CUSTOM_SYSTEM, user, CUSTOM_TEMPERATURE))
}

fn request(system_template: &str, user: String, temperature: f32) -> ModelRequest {
    ModelRequest {
        system: fill_shared_fragments(system_template),
        user,
        temperature,
    }
}

/// Pretty JSON in declaration order, so the model sees every field of the current state.
fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize prompt payload: {e}")))
}
