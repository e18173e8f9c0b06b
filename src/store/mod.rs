//! Persistence interfaces.
//!
//! The orchestrator owns the lifecycle rules; the store only enforces the
//! two invariants that must hold under concurrency no matter who writes:
//! one in-flight generation per subject, and write-once terminal statuses.
//! `store::memory` provides the in-process implementation used by tests and
//! embedders; production adapters implement the same traits over a database.

pub mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::AlertKind;
use crate::models::{Alert, Report, ReportComment, SubjectProfile};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    /// A `generating` report already exists for the subject.
    #[error("A report is already being generated for this subject")]
    Conflict,
    /// The report reached `completed` or `error`; its status is immutable.
    #[error("Report is in a terminal status")]
    Terminal,
    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Report lifecycle persistence.
pub trait ReportStore: Send + Sync {
    /// Atomically insert `report` as the subject's in-flight generation.
    /// Fails with [`StoreError::Conflict`] when another `generating` report
    /// exists for the same subject; no duplicate record is created.
    fn claim_generation(&self, report: Report) -> Result<Report, StoreError>;

    /// Overwrite the stored report. Refused once the stored copy is
    /// terminal.
    fn update(&self, report: &Report) -> Result<(), StoreError>;

    fn get(&self, id: Uuid) -> Result<Report, StoreError>;

    /// Most recent `completed` report for the subject, if any. `generating`
    /// and `error` reports never count toward eligibility.
    fn latest_completed_for(&self, subject_id: Uuid) -> Result<Option<Report>, StoreError>;

    /// Reports for a subject, newest first, capped at `limit`. Error
    /// reports are excluded unless `include_errors` is set.
    fn list_for_subject(
        &self,
        subject_id: Uuid,
        include_errors: bool,
        limit: usize,
    ) -> Result<Vec<Report>, StoreError>;

    /// Delete a report and its comments.
    fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    fn add_comment(&self, comment: ReportComment) -> Result<(), StoreError>;

    fn comments_for(&self, report_id: Uuid) -> Result<Vec<ReportComment>, StoreError>;
}

/// Alert persistence.
pub trait AlertStore: Send + Sync {
    fn insert(&self, alert: Alert) -> Result<(), StoreError>;

    /// The subject's unresolved alert matching the `(kind, title)`
    /// fingerprint, if one is open. Dedup key for the deriver: a recurring
    /// concern updates the open alert instead of stacking a duplicate.
    fn find_open(
        &self,
        subject_id: Uuid,
        kind: AlertKind,
        title: &str,
    ) -> Result<Option<Alert>, StoreError>;

    fn update(&self, alert: &Alert) -> Result<(), StoreError>;
}

/// Subject profile lookup. Contact details feed the notification fan-out.
pub trait SubjectStore: Send + Sync {
    fn get_profile(&self, subject_id: Uuid) -> Result<Option<SubjectProfile>, StoreError>;
}
