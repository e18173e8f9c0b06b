//! Report generation eligibility gate.
//!
//! Pure decision function over the subject's surgery date and report history.
//! Rules, evaluated in order:
//! 1. Staff role → always eligible (unlimited).
//! 2. No surgery date on file → eligible (exploratory report path).
//! 3. Fewer than 30 days post-surgery → ineligible until surgery + 30d.
//! 4. No prior completed report → eligible.
//! 5. Fewer than 30 days since the last completed report → ineligible until
//!    last report + 30d.
//! 6. Otherwise eligible.
//!
//! Day arithmetic is calendar-day truncation over UTC timestamps; callers
//! inject `now` so decisions are deterministic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::REPORT_INTERVAL_DAYS;
use crate::models::enums::Role;
use crate::models::{Report, SubjectProfile};

/// Outcome of an eligibility check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: Option<String>,
    /// Staff bypass: no interval rule applies.
    pub unlimited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_eligible_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_surgery: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report_date: Option<DateTime<Utc>>,
}

impl Eligibility {
    fn eligible() -> Self {
        Self {
            eligible: true,
            reason: None,
            unlimited: false,
            next_eligible_date: None,
            days_since_surgery: None,
            last_report_date: None,
        }
    }

    fn ineligible(reason: &str, next_eligible_date: DateTime<Utc>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.to_string()),
            unlimited: false,
            next_eligible_date: Some(next_eligible_date),
            days_since_surgery: None,
            last_report_date: None,
        }
    }
}

/// Whole UTC days elapsed since `start`, floored (negative when `start` is in
/// the future).
fn whole_days_since(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_seconds().div_euclid(86_400)
}

/// Evaluate the eligibility rules for one subject.
///
/// `last_completed` must be the most recent report with status `completed`
/// for the subject, or `None` when no such report exists. Reports stuck in
/// `generating` or ended in `error` never count against the interval.
pub fn check_eligibility(
    role: Role,
    profile: Option<&SubjectProfile>,
    last_completed: Option<&Report>,
    now: DateTime<Utc>,
) -> Eligibility {
    // Rule 1: staff bypass all interval rules.
    if role.is_staff() {
        return Eligibility {
            eligible: true,
            reason: Some("Staff - unlimited report generation".to_string()),
            unlimited: true,
            next_eligible_date: None,
            days_since_surgery: None,
            last_report_date: None,
        };
    }

    // Rule 2: no surgery date → exploratory report, no further checks.
    let surgery_date = match profile.and_then(|p| p.surgery_date) {
        Some(date) => date,
        None => {
            let mut result = Eligibility::eligible();
            result.reason =
                Some("No surgery date set - can generate exploratory report".to_string());
            return result;
        }
    };

    // Rule 3: 30 days post-surgery before the first report.
    let surgery_start = surgery_date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();
    let days_since_surgery = whole_days_since(surgery_start, now);

    if days_since_surgery < REPORT_INTERVAL_DAYS {
        let mut result = Eligibility::ineligible(
            "Must wait at least 30 days post-surgery for first report",
            surgery_start + Duration::days(REPORT_INTERVAL_DAYS),
        );
        result.days_since_surgery = Some(days_since_surgery);
        return result;
    }

    // Rule 4: no prior completed report → eligible.
    let last_report = match last_completed {
        Some(report) => report,
        None => {
            let mut result = Eligibility::eligible();
            result.days_since_surgery = Some(days_since_surgery);
            return result;
        }
    };

    // Rule 5: 30 days between reports.
    let last_report_date = last_report.generated_at;
    let days_since_last = whole_days_since(last_report_date, now);

    if days_since_last < REPORT_INTERVAL_DAYS {
        let mut result = Eligibility::ineligible(
            "Must wait at least 30 days between reports",
            last_report_date + Duration::days(REPORT_INTERVAL_DAYS),
        );
        result.days_since_surgery = Some(days_since_surgery);
        result.last_report_date = Some(last_report_date);
        return result;
    }

    // Rule 6: eligible.
    let mut result = Eligibility::eligible();
    result.days_since_surgery = Some(days_since_surgery);
    result.last_report_date = Some(last_report_date);
    result
}
