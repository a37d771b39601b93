//! Drives one revision session: gates each call on the stage machine, runs it
//! against the model gateway and commits the result to the document store.
//!
//! The session lock is held only while checking and updating state. It is released
//! for the model call itself; the transient stage (or pending side call) is what keeps
//! a second call out in the meantime.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::contract::MatchAnalysis;
use crate::generation::stages::{
    analyze_match, apply_instruction, generate, optimize_for_ats, rewrite_experience,
    validate_job_description, RevisionStage,
};
use crate::llm_client::ModelGateway;
use crate::models::resume::ResumeDocument;
use crate::session::state::{RevisionSession, SessionView, SideCall};
use crate::session::store::DocumentStore;

pub struct Orchestrator {
    gateway: Arc<dyn ModelGateway>,
    store: Arc<dyn DocumentStore>,
    session: Mutex<RevisionSession>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        store: Arc<dyn DocumentStore>,
        job_description: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            session: Mutex::new(RevisionSession::new(job_description)),
        }
    }

    pub async fn view(&self) -> SessionView {
        self.session.lock().await.view()
    }

    pub async fn document(&self) -> ResumeDocument {
        self.store.read().await
    }

    /// Replaces the job description; a different text resets the session.
    pub async fn set_job_description(&self, job_description: &str) -> Result<bool, AppError> {
        let job_description = validate_job_description(Some(job_description))?;
        let reset = self
            .session
            .lock()
            .await
            .set_job_description(job_description)?;
        if reset {
            info!("Job description changed, revision session reset");
        }
        Ok(reset)
    }

    /// Manual edit of the document between calls.
    pub async fn replace_document(&self, mut document: ResumeDocument) -> Result<(), AppError> {
        let mut session = self.session.lock().await;
        session.record_edit()?;
        document.normalize();
        self.store.replace(document).await;
        Ok(())
    }

    /// Stage 1: scores the document against the job description. Does not touch the document.
    pub async fn run_match_analysis(&self) -> Result<MatchAnalysis, AppError> {
        let (job_description, document) = {
            let mut session = self.session.lock().await;
            let document = self.store.read().await;
            session.begin_stage(RevisionStage::MatchAnalysis, &document)?;
            (session.job_description().to_string(), document)
        };

        info!("Dispatching stage 1: match analysis");
        let result = analyze_match(self.gateway.as_ref(), &job_description, &document).await;

        let mut session = self.session.lock().await;
        match result {
            Ok(analysis) => {
                session.record_match(&analysis);
                session.complete_stage();
                Ok(analysis)
            }
            Err(err) => {
                session.fail_stage(&err);
                Err(err)
            }
        }
    }

    /// Stage 2: rewrites the work experience section. Nothing else in the document changes.
    pub async fn run_experience_rewrite(&self) -> Result<ResumeDocument, AppError> {
        let (job_description, missing_keywords, document) = {
            let mut session = self.session.lock().await;
            let document = self.store.read().await;
            session.begin_stage(RevisionStage::ExperienceRewrite, &document)?;
            (
                session.job_description().to_string(),
                session.missing_keywords().to_vec(),
                document,
            )
        };

        info!(
            "Dispatching stage 2: experience rewrite with {} missing keywords",
            missing_keywords.len()
        );
        let result = rewrite_experience(
            self.gateway.as_ref(),
            &job_description,
            &missing_keywords,
            &document.work_experiences,
        )
        .await;

        let mut session = self.session.lock().await;
        match result {
            Ok(work_experiences) => {
                let mut updated = document;
                updated.work_experiences = work_experiences;
                updated.normalize();
                self.store.replace(updated.clone()).await;
                session.complete_stage();
                Ok(updated)
            }
            Err(err) => {
                session.fail_stage(&err);
                Err(err)
            }
        }
    }

    /// Stage 3: ATS pass over the whole document.
    pub async fn run_ats_optimization(&self) -> Result<ResumeDocument, AppError> {
        let document = {
            let mut session = self.session.lock().await;
            let document = self.store.read().await;
            session.begin_stage(RevisionStage::AtsOptimization, &document)?;
            document
        };

        info!("Dispatching stage 3: ATS optimization");
        let result = optimize_for_ats(self.gateway.as_ref(), &document).await;

        let mut session = self.session.lock().await;
        match result {
            Ok(optimized) => {
                self.store.replace(optimized.clone()).await;
                session.complete_stage();
                Ok(optimized)
            }
            Err(err) => {
                session.fail_stage(&err);
                Err(err)
            }
        }
    }

    pub async fn run_stage(&self, stage: RevisionStage) -> Result<ResumeDocument, AppError> {
        match stage {
            RevisionStage::MatchAnalysis => {
                self.run_match_analysis().await?;
                Ok(self.document().await)
            }
            RevisionStage::ExperienceRewrite => self.run_experience_rewrite().await,
            RevisionStage::AtsOptimization => self.run_ats_optimization().await,
        }
    }

    /// Applies a free-form instruction to the whole document. Snapshots first, leaves the
    /// stage untouched.
    pub async fn run_custom_instruction(&self, instruction: &str) -> Result<ResumeDocument, AppError> {
        let instruction = instruction.trim();
        let (job_description, document) = {
            let mut session = self.session.lock().await;
            session.ensure_settled()?;
            if instruction.is_empty() {
                return Err(session.reject(AppError::Validation(
                    "Instruction is required.".to_string(),
                )));
            }
            let document = self.store.read().await;
            session.begin_side_call(SideCall::CustomInstruction, &document)?;
            (session.job_description().to_string(), document)
        };

        let job_context = Some(job_description.as_str()).filter(|jd| !jd.trim().is_empty());
        let result =
            apply_instruction(self.gateway.as_ref(), instruction, job_context, &document).await;
        self.settle_side_call(result).await
    }

    /// Generates a new document for the session's job description. With `use_existing`
    /// the current document is tailored instead of replaced by sample content, provided it
    /// has any content. Success drops stage results back to idle.
    pub async fn generate(&self, use_existing: bool) -> Result<ResumeDocument, AppError> {
        let (job_description, document) = {
            let mut session = self.session.lock().await;
            session.ensure_settled()?;
            let validated =
                validate_job_description(Some(session.job_description())).map(str::to_string);
            let job_description = match validated {
                Ok(jd) => jd,
                Err(err) => return Err(session.reject(err)),
            };
            let document = self.store.read().await;
            session.begin_side_call(SideCall::Generation, &document)?;
            (job_description, document)
        };

        let base = (use_existing && document.has_content()).then_some(&document);
        if use_existing && base.is_none() {
            warn!("Existing resume has no content, generating from the job description alone");
        }
        let result = generate(self.gateway.as_ref(), &job_description, base).await;
        self.settle_side_call(result).await
    }

    /// Restores the pre-revision snapshot and resets the session to idle.
    /// Returns whether a snapshot existed; without one the document is left as-is.
    pub async fn revert(&self) -> Result<bool, AppError> {
        let mut session = self.session.lock().await;
        match session.take_for_revert()? {
            Some(snapshot) => {
                self.store.replace(snapshot).await;
                info!("Reverted resume to pre-revision snapshot");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn settle_side_call(
        &self,
        result: Result<ResumeDocument, AppError>,
    ) -> Result<ResumeDocument, AppError> {
        let mut session = self.session.lock().await;
        match result {
            Ok(document) => {
                self.store.replace(document.clone()).await;
                session.finish_side_call(None);
                Ok(document)
            }
            Err(err) => {
                session.finish_side_call(Some(&err));
                Err(err)
            }
        }
    }
}
