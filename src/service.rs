//! Report orchestration service.
//!
//! `ReportService` is the crate's operational surface: generation, listing,
//! retrieval, provider comments, deletion, and the eligibility probe. Every
//! operation follows the same shape: authenticate, authorize through
//! `policy`, then act.
//!
//! Generation runs its pipeline on a detached task so a caller dropping the
//! request cannot strand a report in `generating`; the caller still awaits
//! the outcome. Alert derivation runs after the terminal transition and is
//! best-effort only.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::alerts::derive_and_dispatch;
use crate::clock::{Clock, SystemClock};
use crate::collab::{Aggregator, Analyzer, EmailChannel, SmsChannel};
use crate::config::ServiceConfig;
use crate::eligibility::{self, Eligibility};
use crate::models::enums::{CommentType, ReportStatus};
use crate::models::{Report, ReportComment};
use crate::policy::{self, Action, Actor};
use crate::store::{AlertStore, ReportStore, StoreError, SubjectStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("Not eligible for report generation")]
    NotEligible(Eligibility),
    #[error("Record not found")]
    NotFound,
    #[error("A report is already being generated for this subject")]
    Conflict,
    /// The pipeline failed after the report record was created; the record
    /// persists in `error` status.
    #[error("Report generation failed: {message}")]
    GenerationFailed { report_id: Uuid, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Structured error payload for transport layers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ServiceError {
    /// HTTP status class for transport layers.
    pub fn status_class(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden(_) => 403,
            Self::NotEligible(_) => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::GenerationFailed { .. } | Self::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotEligible(_) => "not_eligible",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let message = match self {
            Self::NotEligible(eligibility) => eligibility
                .reason
                .clone()
                .unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        };
        ErrorBody {
            error: self.code(),
            message,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict => Self::Conflict,
            StoreError::Terminal => {
                Self::Internal("Attempted to overwrite a terminal report".into())
            }
            StoreError::LockPoisoned => Self::Internal("Store lock poisoned".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// A report with the comments visible to the requesting actor.
#[derive(Debug, Clone, Serialize)]
pub struct ReportWithComments {
    pub report: Report,
    pub comments: Vec<ReportComment>,
}

pub struct ReportService<St, Ag, An, Sms, Em, Ck = SystemClock> {
    store: Arc<St>,
    aggregator: Arc<Ag>,
    analyzer: Arc<An>,
    sms: Arc<Sms>,
    email: Arc<Em>,
    clock: Arc<Ck>,
    config: ServiceConfig,
}

impl<St, Ag, An, Sms, Em> ReportService<St, Ag, An, Sms, Em, SystemClock>
where
    St: ReportStore + AlertStore + SubjectStore + 'static,
    Ag: Aggregator + 'static,
    An: Analyzer + 'static,
    Sms: SmsChannel + 'static,
    Em: EmailChannel + 'static,
{
    pub fn new(
        store: St,
        aggregator: Ag,
        analyzer: An,
        sms: Sms,
        email: Em,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            aggregator: Arc::new(aggregator),
            analyzer: Arc::new(analyzer),
            sms: Arc::new(sms),
            email: Arc::new(email),
            clock: Arc::new(SystemClock),
            config,
        }
    }
}

impl<St, Ag, An, Sms, Em, Ck> ReportService<St, Ag, An, Sms, Em, Ck>
where
    St: ReportStore + AlertStore + SubjectStore + 'static,
    Ag: Aggregator + 'static,
    An: Analyzer + 'static,
    Sms: SmsChannel + 'static,
    Em: EmailChannel + 'static,
    Ck: Clock + 'static,
{
    /// Replace the clock, for deterministic tests.
    pub fn with_clock<C2: Clock + 'static>(
        self,
        clock: C2,
    ) -> ReportService<St, Ag, An, Sms, Em, C2> {
        ReportService {
            store: self.store,
            aggregator: self.aggregator,
            analyzer: self.analyzer,
            sms: self.sms,
            email: self.email,
            clock: Arc::new(clock),
            config: self.config,
        }
    }

    fn authorize(
        &self,
        actor: &Actor,
        action: Action,
        target_subject: Uuid,
    ) -> Result<(), ServiceError> {
        let decision = policy::evaluate(actor, action, target_subject);
        if decision.allowed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(policy::denial_message(actor, action)))
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Generate a new recovery report for `subject_id`.
    ///
    /// Eligibility is re-checked here even if the caller probed it earlier.
    /// On collaborator failure the report record persists in `error` status
    /// and the returned error carries its id.
    pub async fn generate_report(
        &self,
        actor: Option<&Actor>,
        subject_id: Uuid,
    ) -> Result<Report, ServiceError> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;
        self.authorize(actor, Action::GenerateReport, subject_id)?;

        let now = self.clock.now();
        let profile = self.store.get_profile(subject_id)?;
        let last = self.store.latest_completed_for(subject_id)?;
        let eligibility =
            eligibility::check_eligibility(actor.role, profile.as_ref(), last.as_ref(), now);
        if !eligibility.eligible {
            return Err(ServiceError::NotEligible(eligibility));
        }

        let patient_id = profile.as_ref().and_then(|p| p.patient_id);
        let surgery_date = profile.as_ref().and_then(|p| p.surgery_date);
        let report = self.store.claim_generation(Report::new_generating(
            subject_id,
            patient_id,
            surgery_date,
            now,
        ))?;
        info!(report_id = %report.id, subject_id = %subject_id, "Report generation claimed");

        // Detached so caller cancellation cannot strand the claim.
        let store = Arc::clone(&self.store);
        let aggregator = Arc::clone(&self.aggregator);
        let analyzer = Arc::clone(&self.analyzer);
        let sms = Arc::clone(&self.sms);
        let email = Arc::clone(&self.email);
        let clock = Arc::clone(&self.clock);
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            run_pipeline(store, aggregator, analyzer, sms, email, clock, config, report).await
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => Err(ServiceError::Internal(format!(
                "Generation task failed: {err}"
            ))),
        }
    }

    /// Probe the eligibility rules without creating anything.
    pub fn check_eligibility(
        &self,
        actor: Option<&Actor>,
        subject_id: Uuid,
    ) -> Result<Eligibility, ServiceError> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;
        self.authorize(actor, Action::CheckEligibility, subject_id)?;

        let profile = self.store.get_profile(subject_id)?;
        let last = self.store.latest_completed_for(subject_id)?;
        Ok(eligibility::check_eligibility(
            actor.role,
            profile.as_ref(),
            last.as_ref(),
            self.clock.now(),
        ))
    }

    /// List a subject's reports, newest first. Error reports are included
    /// only on request; `limit` defaults from the service config.
    pub fn list_reports(
        &self,
        actor: Option<&Actor>,
        subject_id: Uuid,
        include_errors: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Report>, ServiceError> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;
        self.authorize(actor, Action::ViewReports, subject_id)?;

        let limit = limit.unwrap_or(self.config.list_limit);
        Ok(self.store.list_for_subject(subject_id, include_errors, limit)?)
    }

    /// Fetch one report with the comments the actor may see. Private
    /// comments stay between providers.
    pub fn get_report(
        &self,
        actor: Option<&Actor>,
        report_id: Uuid,
    ) -> Result<ReportWithComments, ServiceError> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;
        let report = self.store.get(report_id)?;
        self.authorize(actor, Action::ViewReports, report.subject_id)?;

        let mut comments = self.store.comments_for(report_id)?;
        if !actor.is_staff() {
            comments.retain(|c| !c.is_private);
        }
        Ok(ReportWithComments { report, comments })
    }

    /// Attach a provider comment to a report.
    pub fn add_comment(
        &self,
        actor: Option<&Actor>,
        report_id: Uuid,
        comment: String,
        comment_type: CommentType,
        is_private: bool,
    ) -> Result<ReportComment, ServiceError> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;
        let report = self.store.get(report_id)?;
        self.authorize(actor, Action::CommentOnReport, report.subject_id)?;

        let comment = ReportComment {
            id: Uuid::new_v4(),
            report_id,
            author_id: actor.id,
            comment,
            comment_type,
            is_private,
            created_at: self.clock.now(),
        };
        self.store.add_comment(comment.clone())?;
        info!(report_id = %report_id, author_id = %actor.id, "Comment added to report");
        Ok(comment)
    }

    /// Delete a report and its comments. Derived alerts are kept; they
    /// reference the report by id but have their own lifecycle.
    pub fn delete_report(
        &self,
        actor: Option<&Actor>,
        report_id: Uuid,
    ) -> Result<(), ServiceError> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;
        let report = self.store.get(report_id)?;
        self.authorize(actor, Action::DeleteReport, report.subject_id)?;

        self.store.delete(report_id)?;
        info!(report_id = %report_id, "Report deleted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
async fn run_pipeline<St, Ag, An, Sms, Em, Ck>(
    store: Arc<St>,
    aggregator: Arc<Ag>,
    analyzer: Arc<An>,
    sms: Arc<Sms>,
    email: Arc<Em>,
    clock: Arc<Ck>,
    config: ServiceConfig,
    mut report: Report,
) -> Result<Report, ServiceError>
where
    St: ReportStore + AlertStore + SubjectStore,
    Ag: Aggregator,
    An: Analyzer,
    Sms: SmsChannel,
    Em: EmailChannel,
    Ck: Clock,
{
    match run_stages(&*store, &*aggregator, &*analyzer, &config, &mut report).await {
        Ok(()) => {
            report.status = ReportStatus::Completed;
            report.generated_at = clock.now();
            ReportStore::update(&*store, &report)?;
            info!(
                report_id = %report.id,
                subject_id = %report.subject_id,
                recovery_score = report.recovery_score,
                "Report completed"
            );

            // Best-effort: the completed report stands regardless.
            if let Err(err) =
                derive_and_dispatch(&*store, &*store, &*sms, &*email, &report, clock.now()).await
            {
                warn!(report_id = %report.id, error = %err, "Alert derivation failed");
            }
            Ok(report)
        }
        Err(message) => {
            report.status = ReportStatus::Error;
            report.error_message = Some(message.clone());
            if let Err(err) = ReportStore::update(&*store, &report) {
                error!(report_id = %report.id, error = %err, "Failed to record error status");
            }
            warn!(report_id = %report.id, message = %message, "Report generation failed");
            Err(ServiceError::GenerationFailed {
                report_id: report.id,
                message,
            })
        }
    }
}

/// The two collaborator stages, each under its own timeout. Mutates the
/// report in place; the caller owns the terminal transition.
async fn run_stages<St, Ag, An>(
    store: &St,
    aggregator: &Ag,
    analyzer: &An,
    config: &ServiceConfig,
    report: &mut Report,
) -> Result<(), String>
where
    St: ReportStore,
    Ag: Aggregator,
    An: Analyzer,
{
    let data = timeout(
        config.aggregation_timeout,
        aggregator.aggregate(report.subject_id),
    )
    .await
    .map_err(|_| "Data aggregation timed out".to_string())?
    .map_err(|err| err.to_string())?;

    // The aggregator owns the analysis window; copy it over verbatim.
    report.analysis_start = data.analysis_start;
    report.analysis_end = data.analysis_end;
    report.days_post_surgery = data.days_post_surgery;
    report.data_completeness = Some(data.completeness.clone());
    store.update(report).map_err(|err| err.to_string())?;
    info!(
        report_id = %report.id,
        data_points = data.completeness.total_data_points,
        "Aggregation complete"
    );

    let analysis = timeout(
        config.analysis_timeout,
        analyzer.analyze(report.subject_id, &data),
    )
    .await
    .map_err(|_| "Analysis timed out".to_string())?
    .map_err(|err| err.to_string())?;

    // Collaborator scores are bounded to the documented 0-100 scale.
    report.recovery_score = analysis.recovery_score.map(|score| score.min(100));
    report.summary = analysis.summary;
    report.risk_assessment = analysis.risk_assessment;
    report.unusual_findings = analysis.unusual_findings;
    report.action_plan = analysis.action_plan;
    report.report_data = analysis.report_data;
    Ok(())
}
