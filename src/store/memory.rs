//! In-process store backed by `RwLock`ed vectors.
//!
//! Single-node semantics: the claim and terminal-status invariants hold via
//! the write lock. Suitable for tests and embedded deployments.

use std::sync::RwLock;

use uuid::Uuid;

use crate::models::enums::{AlertKind, ReportStatus};
use crate::models::{Alert, Report, ReportComment, SubjectProfile};
use crate::store::{AlertStore, ReportStore, StoreError, SubjectStore};

#[derive(Default)]
pub struct MemoryStore {
    reports: RwLock<Vec<Report>>,
    comments: RwLock<Vec<ReportComment>>,
    alerts: RwLock<Vec<Alert>>,
    profiles: RwLock<Vec<SubjectProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a subject profile.
    pub fn put_profile(&self, profile: SubjectProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().map_err(|_| StoreError::LockPoisoned)?;
        profiles.retain(|p| p.subject_id != profile.subject_id);
        profiles.push(profile);
        Ok(())
    }
}

impl ReportStore for MemoryStore {
    fn claim_generation(&self, report: Report) -> Result<Report, StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::LockPoisoned)?;
        let in_flight = reports
            .iter()
            .any(|r| r.subject_id == report.subject_id && r.status == ReportStatus::Generating);
        if in_flight {
            return Err(StoreError::Conflict);
        }
        reports.push(report.clone());
        Ok(report)
    }

    fn update(&self, report: &Report) -> Result<(), StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = reports
            .iter_mut()
            .find(|r| r.id == report.id)
            .ok_or(StoreError::NotFound)?;
        if stored.is_terminal() {
            return Err(StoreError::Terminal);
        }
        *stored = report.clone();
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Report, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
        reports
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn latest_completed_for(&self, subject_id: Uuid) -> Result<Option<Report>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(reports
            .iter()
            .filter(|r| r.subject_id == subject_id && r.status == ReportStatus::Completed)
            .max_by_key(|r| r.generated_at)
            .cloned())
    }

    fn list_for_subject(
        &self,
        subject_id: Uuid,
        include_errors: bool,
        limit: usize,
    ) -> Result<Vec<Report>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut matched: Vec<Report> = reports
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .filter(|r| include_errors || r.status != ReportStatus::Error)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        matched.truncate(limit);
        Ok(matched)
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::LockPoisoned)?;
        let before = reports.len();
        reports.retain(|r| r.id != id);
        if reports.len() == before {
            return Err(StoreError::NotFound);
        }
        drop(reports);

        // Comments do not outlive their report.
        let mut comments = self.comments.write().map_err(|_| StoreError::LockPoisoned)?;
        comments.retain(|c| c.report_id != id);
        Ok(())
    }

    fn add_comment(&self, comment: ReportComment) -> Result<(), StoreError> {
        {
            let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
            if !reports.iter().any(|r| r.id == comment.report_id) {
                return Err(StoreError::NotFound);
            }
        }
        let mut comments = self.comments.write().map_err(|_| StoreError::LockPoisoned)?;
        comments.push(comment);
        Ok(())
    }

    fn comments_for(&self, report_id: Uuid) -> Result<Vec<ReportComment>, StoreError> {
        let comments = self.comments.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut matched: Vec<ReportComment> = comments
            .iter()
            .filter(|c| c.report_id == report_id)
            .cloned()
            .collect();
        matched.sort_by_key(|c| c.created_at);
        Ok(matched)
    }
}

impl AlertStore for MemoryStore {
    fn insert(&self, alert: Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().map_err(|_| StoreError::LockPoisoned)?;
        alerts.push(alert);
        Ok(())
    }

    fn find_open(
        &self,
        subject_id: Uuid,
        kind: AlertKind,
        title: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let alerts = self.alerts.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(alerts
            .iter()
            .find(|a| {
                a.subject_id == subject_id && a.kind == kind && a.title == title && !a.resolved
            })
            .cloned())
    }

    fn update(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = alerts
            .iter_mut()
            .find(|a| a.id == alert.id)
            .ok_or(StoreError::NotFound)?;
        *stored = alert.clone();
        Ok(())
    }
}

impl SubjectStore for MemoryStore {
    fn get_profile(&self, subject_id: Uuid) -> Result<Option<SubjectProfile>, StoreError> {
        let profiles = self.profiles.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(profiles
            .iter()
            .find(|p| p.subject_id == subject_id)
            .cloned())
    }
}
