//! Revision session state: the stage machine, its one-shot snapshot and the last error.
//!
//! ```text
//! idle ──score──▶ scoring ──ok──▶ scored ──rewrite──▶ rewriting ──ok──▶ rewritten ──optimize──▶ atsFixing ──ok──▶ atsFixed
//!                    │ err                               │ err                                     │ err
//!                    ▼                                   ▼                                         ▼
//!                  idle                                scored                                  rewritten
//! ```
//! Any non-transient state resets to `idle` on revert or on a job description change.
//! Generation and custom instructions run beside the stage machine and mark the session busy.
//! A custom instruction never moves `stage`; a successful generation drops stage results
//! back to `idle` because the document they were computed against is gone.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::generation::contract::MatchAnalysis;
use crate::generation::stages::RevisionStage;
use crate::models::resume::ResumeDocument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Idle,
    Scoring,
    Scored,
    Rewriting,
    Rewritten,
    AtsFixing,
    AtsFixed,
}

impl Stage {
    /// True while a stage call is dispatched and has not yet settled.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Stage::Scoring | Stage::Rewriting | Stage::AtsFixing)
    }

    /// The transient state entered when `stage` starts from `self`, or `None` when gated.
    pub fn begin(self, stage: RevisionStage) -> Option<Stage> {
        match (self, stage) {
            (Stage::Idle, RevisionStage::MatchAnalysis) => Some(Stage::Scoring),
            (Stage::Scored, RevisionStage::ExperienceRewrite) => Some(Stage::Rewriting),
            (Stage::Rewritten, RevisionStage::AtsOptimization) => Some(Stage::AtsFixing),
            _ => None,
        }
    }

    pub fn succeed(self) -> Stage {
        match self {
            Stage::Scoring => Stage::Scored,
            Stage::Rewriting => Stage::Rewritten,
            Stage::AtsFixing => Stage::AtsFixed,
            settled => settled,
        }
    }

    /// One step back: stage-1 failure returns to idle, later failures keep prior results.
    pub fn fail(self) -> Stage {
        match self {
            Stage::Scoring => Stage::Idle,
            Stage::Rewriting => Stage::Scored,
            Stage::AtsFixing => Stage::Rewritten,
            settled => settled,
        }
    }
}

/// A model call that runs outside the stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SideCall {
    Generation,
    CustomInstruction,
}

/// Frozen copy of the document taken before the first mutation of a session.
#[derive(Debug, Clone)]
struct Snapshot {
    document: ResumeDocument,
    taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub stage: Stage,
    pub job_description: String,
    pub match_score: Option<u8>,
    pub missing_keywords: Vec<String>,
    pub has_snapshot: bool,
    pub snapshot_taken_at: Option<DateTime<Utc>>,
    pub pending: Option<SideCall>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RevisionSession {
    stage: Stage,
    job_description: String,
    match_score: Option<u8>,
    missing_keywords: Vec<String>,
    snapshot: Option<Snapshot>,
    pending: Option<SideCall>,
    error: Option<String>,
    updated_at: DateTime<Utc>,
}

impl RevisionSession {
    pub fn new(job_description: impl Into<String>) -> Self {
        Self {
            stage: Stage::Idle,
            job_description: job_description.into(),
            match_score: None,
            missing_keywords: Vec::new(),
            snapshot: None,
            pending: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn missing_keywords(&self) -> &[String] {
        &self.missing_keywords
    }

    pub fn is_busy(&self) -> bool {
        self.stage.is_in_flight() || self.pending.is_some()
    }

    /// Rejects any action while a call is in flight. Leaves state untouched.
    pub fn ensure_settled(&self) -> Result<(), AppError> {
        if self.is_busy() {
            return Err(AppError::Conflict(
                "A revision call is already in progress for this session.".to_string(),
            ));
        }
        Ok(())
    }

    /// Moves into the transient state for `stage`, snapshotting `current` on stage 1.
    pub fn begin_stage(
        &mut self,
        stage: RevisionStage,
        current: &ResumeDocument,
    ) -> Result<(), AppError> {
        self.ensure_settled()?;
        self.error = None;

        let next = match self.stage.begin(stage) {
            Some(next) => next,
            None => {
                return Err(self.reject(AppError::Conflict(format!(
                    "Stage {} cannot run while the session is {:?}.",
                    stage.number(),
                    self.stage
                ))))
            }
        };

        if stage != RevisionStage::AtsOptimization && self.job_description.trim().is_empty() {
            return Err(self.reject(AppError::Validation(
                "Job description is required for stages 1 and 2.".to_string(),
            )));
        }

        if stage == RevisionStage::MatchAnalysis {
            self.ensure_snapshot(current);
        }
        self.stage = next;
        self.touch();
        Ok(())
    }

    pub fn record_match(&mut self, analysis: &MatchAnalysis) {
        self.match_score = Some(analysis.score);
        self.missing_keywords = analysis.missing_keywords.clone();
    }

    pub fn complete_stage(&mut self) {
        self.stage = self.stage.succeed();
        self.touch();
    }

    pub fn fail_stage(&mut self, error: &AppError) {
        self.stage = self.stage.fail();
        self.error = Some(error.user_message());
        self.touch();
    }

    /// Marks a side call as running. Custom instructions snapshot first; generation does not.
    pub fn begin_side_call(
        &mut self,
        call: SideCall,
        current: &ResumeDocument,
    ) -> Result<(), AppError> {
        self.ensure_settled()?;
        self.error = None;
        if call == SideCall::CustomInstruction {
            self.ensure_snapshot(current);
        }
        self.pending = Some(call);
        self.touch();
        Ok(())
    }

    /// Settles the running side call. A successful generation replaced the whole
    /// document, so stage results computed against the old one are dropped. The
    /// snapshot stays, so revert still reaches the pre-revision document.
    pub fn finish_side_call(&mut self, error: Option<&AppError>) {
        if self.pending == Some(SideCall::Generation) && error.is_none() {
            self.clear_stage_results();
        }
        self.pending = None;
        self.error = error.map(AppError::user_message);
        self.touch();
    }

    /// Records a manual document edit made between calls.
    pub fn record_edit(&mut self) -> Result<(), AppError> {
        self.ensure_settled()?;
        self.error = None;
        self.touch();
        Ok(())
    }

    /// Records a rejection raised before any call was dispatched.
    pub fn reject(&mut self, error: AppError) -> AppError {
        self.error = Some(error.user_message());
        self.touch();
        error
    }

    /// Replaces the job description. A changed text invalidates every stage result.
    /// Returns whether the session was reset.
    pub fn set_job_description(&mut self, job_description: &str) -> Result<bool, AppError> {
        self.ensure_settled()?;
        self.error = None;
        if self.job_description == job_description {
            self.touch();
            return Ok(false);
        }
        self.job_description = job_description.to_string();
        self.reset();
        Ok(true)
    }

    /// Hands out the snapshot (if any) and resets the session to idle.
    pub fn take_for_revert(&mut self) -> Result<Option<ResumeDocument>, AppError> {
        self.ensure_settled()?;
        let snapshot = self.snapshot.take().map(|s| s.document);
        self.reset();
        Ok(snapshot)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            stage: self.stage,
            job_description: self.job_description.clone(),
            match_score: self.match_score,
            missing_keywords: self.missing_keywords.clone(),
            has_snapshot: self.snapshot.is_some(),
            snapshot_taken_at: self.snapshot.as_ref().map(|s| s.taken_at),
            pending: self.pending,
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }

    fn ensure_snapshot(&mut self, current: &ResumeDocument) {
        if self.snapshot.is_none() {
            self.snapshot = Some(Snapshot {
                document: current.clone(),
                taken_at: Utc::now(),
            });
        }
    }

    fn reset(&mut self) {
        self.clear_stage_results();
        self.snapshot = None;
        self.error = None;
        self.touch();
    }

    fn clear_stage_results(&mut self) {
        self.stage = Stage::Idle;
        self.match_score = None;
        self.missing_keywords.clear();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
