//! Notification message shaping.
//!
//! Pure builders; the deriver decides when to send. SMS bodies stay short
//! for single-segment delivery, email gets the full detail.

use crate::models::Alert;

/// SMS messages keep the alert detail to one segment's worth of text.
const SMS_DETAIL_LIMIT: usize = 120;

/// Body for the critical-alert SMS.
pub fn sms_body(alert: &Alert) -> String {
    let mut detail: String = alert.message.chars().take(SMS_DETAIL_LIMIT).collect();
    if alert.message.chars().count() > SMS_DETAIL_LIMIT {
        detail.push_str("...");
    }
    format!(
        "CRITICAL health alert: {}. {} Please contact your care team.",
        alert.title, detail
    )
}

/// Subject line for the alert email.
pub fn email_subject(alert: &Alert) -> String {
    format!("Critical Health Alert: {}", alert.title)
}

/// HTML body for the alert email.
pub fn email_body(alert: &Alert) -> String {
    format!(
        "<h2>Critical Health Alert</h2>\
         <p><strong>{}</strong></p>\
         <p>{}</p>\
         <p>This alert was derived from your latest recovery report. \
         Please contact your care team if symptoms persist.</p>",
        alert.title, alert.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{AlertKind, AlertSeverity};
    use chrono::Utc;
    use uuid::Uuid;

    fn alert(message: &str) -> Alert {
        Alert::from_report(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AlertKind::VitalConcern,
            AlertSeverity::Critical,
            "Sustained tachycardia".into(),
            message.into(),
            Utc::now(),
        )
    }

    #[test]
    fn sms_keeps_short_messages_intact() {
        let body = sms_body(&alert("Resting heart rate above 110 bpm."));
        assert!(body.starts_with("CRITICAL health alert: Sustained tachycardia."));
        assert!(body.contains("Resting heart rate above 110 bpm."));
        assert!(!body.contains("..."));
    }

    #[test]
    fn sms_truncates_long_detail() {
        let body = sms_body(&alert(&"x".repeat(300)));
        assert!(body.contains("..."));
        // Fixed framing plus 120 chars of detail stays well under two segments.
        assert!(body.len() < 220);
    }

    #[test]
    fn email_carries_title_and_full_message() {
        let alert = alert("Full detail of the concern, untruncated.");
        assert_eq!(
            email_subject(&alert),
            "Critical Health Alert: Sustained tachycardia"
        );
        let body = email_body(&alert);
        assert!(body.contains("<strong>Sustained tachycardia</strong>"));
        assert!(body.contains("Full detail of the concern, untruncated."));
    }
}
