//! Keyword classifiers for free-text clinical findings.
//!
//! Heuristic by nature: the analysis collaborator is expected to return
//! structured risk items, and these regex tables are the documented
//! best-effort fallback for prose. First matching keyword set wins, in a
//! fixed priority order.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::enums::{AlertKind, AlertSeverity, RiskCategory};

fn keyword_set(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid classifier keyword pattern")
}

// ---------------------------------------------------------------------------
// Severity detection over raw fragments (normalizer prose path)
// ---------------------------------------------------------------------------

static CRITICAL_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    keyword_set(r"(?i)\b(critical|severe|dangerous|emergency|immediate|urgent)\b")
});

static WARNING_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| keyword_set(r"(?i)\b(warning|concern|elevated|high|moderate)\b"));

/// Detect the severity of a prose fragment.
pub fn detect_severity(fragment: &str) -> AlertSeverity {
    if CRITICAL_FRAGMENT.is_match(fragment) {
        AlertSeverity::Critical
    } else if WARNING_FRAGMENT.is_match(fragment) {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}

// ---------------------------------------------------------------------------
// Category detection over raw fragments
// ---------------------------------------------------------------------------

static CATEGORY_PATTERNS: LazyLock<Vec<(Regex, RiskCategory)>> = LazyLock::new(|| {
    vec![
        (
            keyword_set(
                r"(?i)\b(heart rate|hr|pulse|rhythm|arrhythmia|afib|bradycardia|tachycardia)\b",
            ),
            RiskCategory::Vitals,
        ),
        (
            keyword_set(r"(?i)\b(blood pressure|bp|hypertension|systolic|diastolic)\b"),
            RiskCategory::Vitals,
        ),
        (
            keyword_set(r"(?i)\b(medication|drug|prescription|dose)\b"),
            RiskCategory::Medication,
        ),
        (
            keyword_set(r"(?i)\b(exercise|activity|physical|walking|steps)\b"),
            RiskCategory::Exercise,
        ),
        (
            keyword_set(r"(?i)\b(weight|edema|fluid|retention|swelling)\b"),
            RiskCategory::Vitals,
        ),
        (
            keyword_set(r"(?i)\b(meal|food|nutrition|diet|sodium|cholesterol)\b"),
            RiskCategory::Nutrition,
        ),
    ]
});

/// Detect the risk category of a prose fragment. Priority order is fixed;
/// the first matching keyword set wins.
pub fn detect_category(fragment: &str) -> RiskCategory {
    for (pattern, category) in CATEGORY_PATTERNS.iter() {
        if pattern.is_match(fragment) {
            return *category;
        }
    }
    RiskCategory::Other
}

// ---------------------------------------------------------------------------
// Alert-level mapping for normalized items
// ---------------------------------------------------------------------------

static CRITICAL_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| keyword_set(r"(?i)\b(critical|severe|emergency|danger)\b"));

static WARNING_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| keyword_set(r"(?i)\b(warning|high|elevated|concern|moderate)\b"));

/// Map a severity label (or any free text standing in for one) to the alert
/// severity enum.
pub fn map_severity_to_alert_level(severity: &str) -> AlertSeverity {
    if CRITICAL_LEVEL.is_match(severity) {
        AlertSeverity::Critical
    } else if WARNING_LEVEL.is_match(severity) {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}

static KIND_PATTERNS: LazyLock<Vec<(Regex, AlertKind)>> = LazyLock::new(|| {
    vec![
        (
            keyword_set(r"(?i)\b(vital|vitals|heart|blood|pressure|hr|bp|weight|oxygen)\b"),
            AlertKind::VitalConcern,
        ),
        (
            keyword_set(r"(?i)\b(medication|drug|prescription)\b"),
            AlertKind::MedicationMissed,
        ),
        (
            keyword_set(r"(?i)\b(exercise|activity|physical)\b"),
            AlertKind::ActivityIssue,
        ),
        (
            keyword_set(r"(?i)\b(goal|milestone|target)\b"),
            AlertKind::GoalOverdue,
        ),
        (
            keyword_set(r"(?i)\b(routine|habit|schedule)\b"),
            AlertKind::RoutineSkipped,
        ),
    ]
});

/// Map a category label to the alert type enum. Priority order is fixed.
pub fn map_category_to_alert_kind(category: &str) -> AlertKind {
    for (pattern, kind) in KIND_PATTERNS.iter() {
        if pattern.is_match(category) {
            return *kind;
        }
    }
    AlertKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severe_text_is_critical() {
        assert_eq!(
            map_severity_to_alert_level("Patient reports severe chest pain"),
            AlertSeverity::Critical
        );
        assert_eq!(map_severity_to_alert_level("critical"), AlertSeverity::Critical);
        assert_eq!(map_severity_to_alert_level("EMERGENCY"), AlertSeverity::Critical);
    }

    #[test]
    fn elevated_text_is_warning() {
        assert_eq!(
            map_severity_to_alert_level("mildly elevated BP"),
            AlertSeverity::Warning
        );
        assert_eq!(map_severity_to_alert_level("moderate"), AlertSeverity::Warning);
    }

    #[test]
    fn stable_text_is_info() {
        assert_eq!(map_severity_to_alert_level("all stable"), AlertSeverity::Info);
        assert_eq!(map_severity_to_alert_level(""), AlertSeverity::Info);
    }

    #[test]
    fn critical_wins_over_warning_in_same_text() {
        assert_eq!(
            map_severity_to_alert_level("severe concern about elevated readings"),
            AlertSeverity::Critical
        );
        assert_eq!(
            detect_severity("urgent warning: high heart rate"),
            AlertSeverity::Critical
        );
    }

    #[test]
    fn fragment_severity_keywords() {
        assert_eq!(detect_severity("immediate follow-up required"), AlertSeverity::Critical);
        assert_eq!(detect_severity("some concern about sleep"), AlertSeverity::Warning);
        assert_eq!(detect_severity("recovery on track"), AlertSeverity::Info);
    }

    #[test]
    fn category_detection_priority() {
        assert_eq!(detect_category("irregular heart rate at rest"), RiskCategory::Vitals);
        assert_eq!(detect_category("blood pressure 160/100"), RiskCategory::Vitals);
        assert_eq!(detect_category("missed dose of metoprolol"), RiskCategory::Medication);
        assert_eq!(detect_category("low daily steps count"), RiskCategory::Exercise);
        assert_eq!(detect_category("ankle swelling and fluid retention"), RiskCategory::Vitals);
        assert_eq!(detect_category("high sodium meal pattern"), RiskCategory::Nutrition);
        assert_eq!(detect_category("reported poor mood"), RiskCategory::Other);
    }

    #[test]
    fn heart_terms_win_over_exercise_terms() {
        // "pulse" appears before "activity" in the priority order.
        assert_eq!(
            detect_category("pulse spikes during activity"),
            RiskCategory::Vitals
        );
    }

    #[test]
    fn category_to_kind_mapping() {
        assert_eq!(map_category_to_alert_kind("vitals"), AlertKind::VitalConcern);
        assert_eq!(map_category_to_alert_kind("blood pressure 160/100"), AlertKind::VitalConcern);
        assert_eq!(map_category_to_alert_kind("medication"), AlertKind::MedicationMissed);
        assert_eq!(map_category_to_alert_kind("exercise"), AlertKind::ActivityIssue);
        assert_eq!(map_category_to_alert_kind("goal progress"), AlertKind::GoalOverdue);
        assert_eq!(map_category_to_alert_kind("morning routine"), AlertKind::RoutineSkipped);
        assert_eq!(map_category_to_alert_kind("nutrition"), AlertKind::Other);
        assert_eq!(map_category_to_alert_kind("unknown"), AlertKind::Other);
    }

    #[test]
    fn kind_mapping_priority_order() {
        // Vital terms take priority over medication terms.
        assert_eq!(
            map_category_to_alert_kind("blood pressure medication"),
            AlertKind::VitalConcern
        );
    }
}
