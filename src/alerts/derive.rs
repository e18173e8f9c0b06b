//! Alert derivation from a completed report.
//!
//! Runs after the report reaches `completed`, always best-effort from the
//! orchestrator's point of view: the report is the source of truth and
//! derivation failures must never un-complete it.
//!
//! Rules:
//! - Info-level items are informational only and never persisted.
//! - One alert per surviving item, except that an open (unresolved) alert
//!   with the same kind and title is refreshed in place instead of stacked.
//! - Critical alerts fan out to SMS (when a phone is on file) and email,
//!   concurrently. A channel failure is logged and isolated; the alert
//!   records which channels succeeded and `notification_sent` is true iff at
//!   least one did.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::alerts::notify;
use crate::classify::{map_category_to_alert_kind, map_severity_to_alert_level};
use crate::collab::{EmailChannel, SmsChannel};
use crate::models::enums::{AlertSeverity, NotificationMethod};
use crate::models::{Alert, Report, SubjectProfile};
use crate::normalize::normalize_analysis;
use crate::store::{AlertStore, StoreError, SubjectStore};

/// Derive alerts from `report` and dispatch notifications for the critical
/// ones. Returns the alerts in their final persisted state.
pub async fn derive_and_dispatch<A, S, Sms, Email>(
    alerts: &A,
    subjects: &S,
    sms: &Sms,
    email: &Email,
    report: &Report,
    now: DateTime<Utc>,
) -> Result<Vec<Alert>, StoreError>
where
    A: AlertStore,
    S: SubjectStore,
    Sms: SmsChannel,
    Email: EmailChannel,
{
    let items = normalize_analysis(
        report.risk_assessment.as_ref(),
        report.unusual_findings.as_deref(),
    );

    let mut derived = Vec::new();
    for item in items {
        let severity = map_severity_to_alert_level(&item.severity);
        if severity < AlertSeverity::Warning {
            continue;
        }
        let kind = map_category_to_alert_kind(&item.category);

        let alert = match alerts.find_open(report.subject_id, kind, &item.title)? {
            // Refresh the open alert; severity only ever escalates.
            Some(mut open) => {
                open.severity = open.severity.max(severity);
                open.message = item.description;
                open.related_entity_id = report.id;
                alerts.update(&open)?;
                info!(
                    alert_id = %open.id,
                    kind = kind.as_str(),
                    severity = open.severity.as_str(),
                    "Refreshed open alert from report"
                );
                open
            }
            None => {
                let alert = Alert::from_report(
                    report.subject_id,
                    report.id,
                    kind,
                    severity,
                    item.title,
                    item.description,
                    now,
                );
                alerts.insert(alert.clone())?;
                info!(
                    alert_id = %alert.id,
                    kind = kind.as_str(),
                    severity = severity.as_str(),
                    low_confidence = item.low_confidence,
                    "Created alert from report"
                );
                alert
            }
        };
        derived.push(alert);
    }

    // Dispatch after all items are persisted, so a slow gateway never delays
    // alert creation.
    let profile = subjects.get_profile(report.subject_id)?;
    for alert in &mut derived {
        if alert.severity == AlertSeverity::Critical && !alert.notification_sent {
            match &profile {
                Some(profile) => {
                    dispatch(sms, email, profile, alert).await;
                    alerts.update(alert)?;
                }
                None => warn!(
                    subject_id = %report.subject_id,
                    alert_id = %alert.id,
                    "No profile on file; critical alert not dispatched"
                ),
            }
        }
    }

    Ok(derived)
}

/// Fan a critical alert out over both channels concurrently and record the
/// successes on the alert.
async fn dispatch<Sms, Email>(sms: &Sms, email: &Email, profile: &SubjectProfile, alert: &mut Alert)
where
    Sms: SmsChannel,
    Email: EmailChannel,
{
    let sms_text = notify::sms_body(alert);
    let email_subject = notify::email_subject(alert);
    let email_html = notify::email_body(alert);

    let sms_send = async {
        match &profile.phone {
            Some(phone) => Some(sms.send_sms(phone, &sms_text).await),
            None => None,
        }
    };
    let email_send = email.send_email(&profile.email, &email_subject, &email_html);

    let (sms_result, email_result) = tokio::join!(sms_send, email_send);

    match sms_result {
        Some(Ok(())) => alert.notification_methods.push(NotificationMethod::Sms),
        Some(Err(err)) => warn!(alert_id = %alert.id, error = %err, "SMS delivery failed"),
        None => {}
    }
    match email_result {
        Ok(()) => alert.notification_methods.push(NotificationMethod::Email),
        Err(err) => warn!(alert_id = %alert.id, error = %err, "Email delivery failed"),
    }

    alert.notification_sent = !alert.notification_methods.is_empty();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::CollabError;
    use crate::models::enums::AlertKind;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingSms {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingSms {
        fn ok() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: false }
        }
        fn failing() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: true }
        }
    }

    impl SmsChannel for RecordingSms {
        async fn send_sms(&self, phone: &str, body: &str) -> Result<(), CollabError> {
            if self.fail {
                return Err(CollabError::Delivery("gateway down".into()));
            }
            self.sent.lock().unwrap().push(format!("{phone}: {body}"));
            Ok(())
        }
    }

    struct RecordingEmail {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingEmail {
        fn ok() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: false }
        }
        fn failing() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: true }
        }
    }

    impl EmailChannel for RecordingEmail {
        async fn send_email(&self, to: &str, subject: &str, _html: &str) -> Result<(), CollabError> {
            if self.fail {
                return Err(CollabError::Delivery("smtp refused".into()));
            }
            self.sent.lock().unwrap().push(format!("{to}: {subject}"));
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn completed_report(subject_id: Uuid, risks: serde_json::Value) -> Report {
        let mut report = Report::new_generating(subject_id, None, None, now());
        report.status = crate::models::enums::ReportStatus::Completed;
        report.risk_assessment = Some(risks);
        report
    }

    fn profile_with_phone(subject_id: Uuid) -> SubjectProfile {
        let mut profile = SubjectProfile::new(subject_id, "subject@example.com");
        profile.phone = Some("+15551230000".into());
        profile
    }

    #[tokio::test]
    async fn info_items_produce_no_alerts() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();
        let report = completed_report(
            subject,
            json!([{ "severity": "info", "category": "vitals", "title": "All stable" }]),
        );

        let derived = derive_and_dispatch(
            &store, &store, &RecordingSms::ok(), &RecordingEmail::ok(), &report, now(),
        )
        .await
        .unwrap();

        assert!(derived.is_empty());
        assert!(store
            .find_open(subject, AlertKind::VitalConcern, "All stable")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn only_warning_and_critical_items_become_alerts() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();
        let report = completed_report(
            subject,
            json!([
                { "severity": "info", "category": "vitals", "title": "HR stable" },
                { "severity": "critical", "category": "vitals", "title": "BP spike" },
                { "severity": "warning", "category": "medication", "title": "Late doses" },
                { "severity": "info", "category": "exercise", "title": "Steps on target" },
                { "severity": "warning", "category": "exercise", "title": "Activity declining" }
            ]),
        );

        let derived = derive_and_dispatch(
            &store, &store, &RecordingSms::ok(), &RecordingEmail::ok(), &report, now(),
        )
        .await
        .unwrap();

        assert_eq!(derived.len(), 3);
        let kinds: Vec<_> = derived.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::VitalConcern,
                AlertKind::MedicationMissed,
                AlertKind::ActivityIssue
            ]
        );
    }

    #[tokio::test]
    async fn warning_persists_without_notification() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();
        let report = completed_report(
            subject,
            json!([{ "severity": "warning", "category": "medication",
                     "title": "Irregular dose timing" }]),
        );

        let sms = RecordingSms::ok();
        let email = RecordingEmail::ok();
        let derived = derive_and_dispatch(&store, &store, &sms, &email, &report, now())
            .await
            .unwrap();

        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].kind, AlertKind::MedicationMissed);
        assert!(!derived[0].notification_sent);
        assert!(sms.sent.lock().unwrap().is_empty());
        assert!(email.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn critical_fans_out_to_both_channels() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();
        let report = completed_report(
            subject,
            json!([{ "severity": "critical", "category": "vitals",
                     "title": "Sustained tachycardia",
                     "description": "Resting HR above 110 bpm." }]),
        );

        let sms = RecordingSms::ok();
        let email = RecordingEmail::ok();
        let derived = derive_and_dispatch(&store, &store, &sms, &email, &report, now())
            .await
            .unwrap();

        assert_eq!(derived.len(), 1);
        assert!(derived[0].notification_sent);
        assert_eq!(
            derived[0].notification_methods,
            vec![NotificationMethod::Sms, NotificationMethod::Email]
        );
        assert_eq!(sms.sent.lock().unwrap().len(), 1);
        assert_eq!(email.sent.lock().unwrap().len(), 1);

        // The persisted copy carries the notification state.
        let stored = store
            .find_open(subject, AlertKind::VitalConcern, "Sustained tachycardia")
            .unwrap()
            .unwrap();
        assert!(stored.notification_sent);
    }

    #[tokio::test]
    async fn no_phone_sends_email_only() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store
            .put_profile(SubjectProfile::new(subject, "subject@example.com"))
            .unwrap();
        let report = completed_report(
            subject,
            json!([{ "severity": "critical", "category": "vitals", "title": "BP spike" }]),
        );

        let sms = RecordingSms::ok();
        let email = RecordingEmail::ok();
        let derived = derive_and_dispatch(&store, &store, &sms, &email, &report, now())
            .await
            .unwrap();

        assert!(derived[0].notification_sent);
        assert_eq!(derived[0].notification_methods, vec![NotificationMethod::Email]);
        assert!(sms.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn channel_failure_is_isolated() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();
        let report = completed_report(
            subject,
            json!([{ "severity": "critical", "category": "vitals", "title": "BP spike" }]),
        );

        let derived = derive_and_dispatch(
            &store, &store, &RecordingSms::failing(), &RecordingEmail::ok(), &report, now(),
        )
        .await
        .unwrap();
        assert!(derived[0].notification_sent);
        assert_eq!(derived[0].notification_methods, vec![NotificationMethod::Email]);
    }

    #[tokio::test]
    async fn all_channels_failing_leaves_notification_unsent() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();
        let report = completed_report(
            subject,
            json!([{ "severity": "critical", "category": "vitals", "title": "BP spike" }]),
        );

        let derived = derive_and_dispatch(
            &store,
            &store,
            &RecordingSms::failing(),
            &RecordingEmail::failing(),
            &report,
            now(),
        )
        .await
        .unwrap();

        // The alert still exists even though nobody was reached.
        assert_eq!(derived.len(), 1);
        assert!(!derived[0].notification_sent);
        assert!(derived[0].notification_methods.is_empty());
    }

    #[tokio::test]
    async fn open_alert_is_refreshed_not_duplicated() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();

        let first = completed_report(
            subject,
            json!([{ "severity": "warning", "category": "vitals",
                     "title": "Elevated BP", "description": "Trending high." }]),
        );
        let sms = RecordingSms::ok();
        let email = RecordingEmail::ok();
        let initial = derive_and_dispatch(&store, &store, &sms, &email, &first, now())
            .await
            .unwrap();

        let second = completed_report(
            subject,
            json!([{ "severity": "critical", "category": "vitals",
                     "title": "Elevated BP", "description": "Now a sustained spike." }]),
        );
        let refreshed = derive_and_dispatch(&store, &store, &sms, &email, &second, now())
            .await
            .unwrap();

        // Same alert record, escalated in place, now pointing at the new report.
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].id, initial[0].id);
        assert_eq!(refreshed[0].severity, AlertSeverity::Critical);
        assert_eq!(refreshed[0].message, "Now a sustained spike.");
        assert_eq!(refreshed[0].related_entity_id, second.id);
        // Escalation to critical triggered the fan-out.
        assert_eq!(sms.sent.lock().unwrap().len(), 1);

        // A differently-titled concern of the same kind is its own alert.
        let third = completed_report(
            subject,
            json!([{ "severity": "warning", "category": "vitals",
                     "title": "Weight gain", "description": "2 kg over the week." }]),
        );
        let added = derive_and_dispatch(&store, &store, &sms, &email, &third, now())
            .await
            .unwrap();
        assert_ne!(added[0].id, initial[0].id);
    }

    #[tokio::test]
    async fn findings_text_derives_warning_alerts() {
        let store = MemoryStore::new();
        let subject = Uuid::new_v4();
        store.put_profile(profile_with_phone(subject)).unwrap();

        let mut report = Report::new_generating(subject, None, None, now());
        report.status = crate::models::enums::ReportStatus::Completed;
        report.unusual_findings =
            Some("Heart rate variability dropped sharply mid-window.".into());

        let derived = derive_and_dispatch(
            &store, &store, &RecordingSms::ok(), &RecordingEmail::ok(), &report, now(),
        )
        .await
        .unwrap();

        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].severity, AlertSeverity::Warning);
        assert_eq!(derived[0].kind, AlertKind::VitalConcern);
        assert!(derived[0].title.starts_with("Unusual Finding: "));
    }
}
