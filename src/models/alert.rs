use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{AlertKind, AlertSeverity, NotificationMethod};

/// Entity type recorded on alerts derived from a recovery report.
pub const RELATED_ENTITY_REPORT: &str = "recovery_report";

/// A persisted, actionable concern derived from a completed report.
///
/// Alerts outlive the generation run that created them. Resolution is a
/// separate workflow; the dispatcher only ever sets the notification state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    /// Back-reference to the originating record.
    pub related_entity_type: String,
    pub related_entity_id: Uuid,
    pub resolved: bool,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// True iff at least one notification channel succeeded.
    pub notification_sent: bool,
    pub notification_methods: Vec<NotificationMethod>,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// A new unresolved, unnotified alert referencing its source report.
    pub fn from_report(
        subject_id: Uuid,
        report_id: Uuid,
        kind: AlertKind,
        severity: AlertSeverity,
        title: String,
        message: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id,
            kind,
            severity,
            title,
            message,
            related_entity_type: RELATED_ENTITY_REPORT.to_string(),
            related_entity_id: report_id,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            notification_sent: false,
            notification_methods: Vec::new(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_alert_is_unresolved_and_unnotified() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let report_id = Uuid::new_v4();
        let alert = Alert::from_report(
            Uuid::new_v4(),
            report_id,
            AlertKind::VitalConcern,
            AlertSeverity::Critical,
            "Elevated resting heart rate".into(),
            "Resting heart rate trending above 100 bpm.".into(),
            now,
        );

        assert!(!alert.resolved);
        assert!(!alert.notification_sent);
        assert!(alert.notification_methods.is_empty());
        assert_eq!(alert.related_entity_type, RELATED_ENTITY_REPORT);
        assert_eq!(alert.related_entity_id, report_id);
    }
}
