//! External collaborator contracts.
//!
//! The orchestrator never talks to the data warehouse, the AI provider, or
//! the messaging gateways directly. It consumes them through the narrow
//! traits here; production adapters and test stubs implement the same
//! surface. Every method returns a `Send` future so the pipeline can run on
//! a detached task.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::DataCompleteness;

/// Failure surfaced by a collaborator call.
#[derive(Debug, Error)]
pub enum CollabError {
    #[error("Data aggregation failed: {0}")]
    Aggregation(String),
    #[error("Analysis failed: {0}")]
    Analysis(String),
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Everything the aggregation collaborator collected for one analysis window.
///
/// The aggregator owns the window: surgery-anchored (surgery date out to at
/// least surgery + 90 days) when a surgery date is on file, the trailing 90
/// days otherwise. The orchestrator copies it onto the report verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedData {
    pub analysis_start: DateTime<Utc>,
    pub analysis_end: DateTime<Utc>,
    /// Whole days since surgery at collection time; absent on the
    /// exploratory path.
    pub days_post_surgery: Option<i64>,
    pub completeness: DataCompleteness,
    /// Collected records in the shape the analyzer expects. Opaque to the
    /// orchestrator.
    pub payload: Value,
}

/// Collects a subject's health records and decides the analysis window.
pub trait Aggregator: Send + Sync {
    fn aggregate(
        &self,
        subject_id: Uuid,
    ) -> impl Future<Output = Result<AggregatedData, CollabError>> + Send;
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Output of the AI analysis collaborator.
///
/// `risk_assessment` is deliberately loose: providers have returned arrays,
/// wrapper objects, and prose. The normalizer accepts all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub recovery_score: Option<u8>,
    pub summary: Option<String>,
    pub risk_assessment: Option<Value>,
    pub unusual_findings: Option<String>,
    pub action_plan: Option<String>,
    /// Full detail payload, stored verbatim on the report.
    pub report_data: Option<Value>,
}

/// Runs the recovery analysis over aggregated data.
pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        subject_id: Uuid,
        data: &AggregatedData,
    ) -> impl Future<Output = Result<AnalysisResult, CollabError>> + Send;
}

// ---------------------------------------------------------------------------
// Notification channels
// ---------------------------------------------------------------------------

/// SMS gateway. Used only for critical alerts when a phone is on file.
pub trait SmsChannel: Send + Sync {
    fn send_sms(
        &self,
        phone: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), CollabError>> + Send;
}

/// Email gateway.
pub trait EmailChannel: Send + Sync {
    fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> impl Future<Output = Result<(), CollabError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedAggregator;

    impl Aggregator for FixedAggregator {
        async fn aggregate(&self, _subject_id: Uuid) -> Result<AggregatedData, CollabError> {
            let end = Utc::now();
            Ok(AggregatedData {
                analysis_start: end - chrono::Duration::days(90),
                analysis_end: end,
                days_post_surgery: None,
                completeness: DataCompleteness {
                    data_categories: vec!["vitals".into()],
                    total_data_points: 12,
                    has_vitals: true,
                    ..Default::default()
                },
                payload: json!({ "vitals": [] }),
            })
        }
    }

    #[tokio::test]
    async fn stub_aggregator_satisfies_the_contract() {
        let data = FixedAggregator.aggregate(Uuid::new_v4()).await.unwrap();
        assert!(data.completeness.has_vitals);
        assert_eq!(data.completeness.total_data_points, 12);
        assert!(data.analysis_start < data.analysis_end);
    }

    #[test]
    fn collab_errors_render_their_stage() {
        let err = CollabError::Analysis("model overloaded".into());
        assert_eq!(err.to_string(), "Analysis failed: model overloaded");
    }
}
