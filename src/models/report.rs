use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::models::enums::{CommentType, ReportStatus};

// ---------------------------------------------------------------------------
// DataCompleteness
// ---------------------------------------------------------------------------

/// Summary of which record categories fed the analysis window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCompleteness {
    pub data_categories: Vec<String>,
    pub total_data_points: u64,
    pub has_vitals: bool,
    pub has_exercise: bool,
    pub has_meals: bool,
    pub has_sleep: bool,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One analysis run over a subject's longitudinal health data.
///
/// Status is write-once-terminal: once `completed` or `error`, the only
/// permitted mutations are downstream annotations (comments, sharing flag).
/// A report is mutated only by the generation run that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub subject_id: Uuid,
    /// Linked patient profile, when one exists for the subject.
    pub patient_id: Option<Uuid>,
    /// Surgery date snapshot at generation time.
    pub surgery_date: Option<NaiveDate>,
    pub analysis_start: DateTime<Utc>,
    pub analysis_end: DateTime<Utc>,
    pub days_post_surgery: Option<i64>,
    /// 0-100, populated by the analysis collaborator.
    pub recovery_score: Option<u8>,
    pub data_completeness: Option<DataCompleteness>,
    pub summary: Option<String>,
    /// Polymorphic: JSON array of risk objects, object with a `risks` key,
    /// or free text. The normalizer accepts all shapes.
    pub risk_assessment: Option<serde_json::Value>,
    pub unusual_findings: Option<String>,
    pub action_plan: Option<String>,
    /// Full detail payload from the analysis collaborator.
    pub report_data: Option<serde_json::Value>,
    pub ai_model: String,
    pub ai_prompt_version: String,
    pub status: ReportStatus,
    pub error_message: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// Downstream annotation: subject chose to share with their care team.
    pub shared_with_provider: bool,
}

impl Report {
    /// A fresh report in the sole initial state, with a placeholder analysis
    /// window of "now". The aggregation stage overwrites the window.
    pub fn new_generating(
        subject_id: Uuid,
        patient_id: Option<Uuid>,
        surgery_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id,
            patient_id,
            surgery_date,
            analysis_start: now,
            analysis_end: now,
            days_post_surgery: None,
            recovery_score: None,
            data_completeness: None,
            summary: None,
            risk_assessment: None,
            unusual_findings: None,
            action_plan: None,
            report_data: None,
            ai_model: config::AI_MODEL.to_string(),
            ai_prompt_version: config::AI_PROMPT_VERSION.to_string(),
            status: ReportStatus::Generating,
            error_message: None,
            generated_at: now,
            shared_with_provider: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// ReportComment
// ---------------------------------------------------------------------------

/// A provider's annotation on a completed report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportComment {
    pub id: Uuid,
    pub report_id: Uuid,
    /// The commenting provider (clinician actor id).
    pub author_id: Uuid,
    pub comment: String,
    pub comment_type: CommentType,
    /// Private comments are visible to providers only, not to the subject.
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
}
