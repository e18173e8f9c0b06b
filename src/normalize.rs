//! Risk/finding normalizer.
//!
//! The analysis collaborator's `risk_assessment` arrives in one of several
//! shapes: a JSON array of risk objects, a JSON object with a `risks` array,
//! a string that parses as either of those, or unstructured prose. This
//! module flattens them all into a uniform list of risk items. Prose-derived
//! items carry a `low_confidence` flag: the sentence heuristic is a
//! best-effort fallback, not a contract.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::classify::{detect_category, detect_severity};
use crate::models::enums::AlertSeverity;

/// Fragments shorter than this are discarded as noise.
const MIN_FRAGMENT_LEN: usize = 10;
/// Risk titles are truncated to this many characters.
const MAX_TITLE_LEN: usize = 100;
/// Unusual-finding titles keep a shorter excerpt after the prefix.
const MAX_FINDING_TITLE_LEN: usize = 80;

/// One normalized concern, prior to alert mapping.
///
/// Severity and category stay as raw labels here; the alert deriver maps
/// them onto the bounded enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRisk {
    pub severity: String,
    pub category: String,
    pub title: String,
    pub description: String,
    /// True when the item came from the prose fallback rather than a
    /// structured risk object.
    pub low_confidence: bool,
}

/// Normalize the analysis output into a flat list of risk items:
/// structured risks first, then parsed unusual findings.
pub fn normalize_analysis(
    risk_assessment: Option<&Value>,
    unusual_findings: Option<&str>,
) -> Vec<NormalizedRisk> {
    let mut items = risk_assessment.map(normalize_risk_value).unwrap_or_default();

    if let Some(findings) = unusual_findings {
        items.extend(parse_unusual_findings(findings));
    }

    items
}

/// Normalize one `risk_assessment` value of any accepted shape.
pub fn normalize_risk_value(value: &Value) -> Vec<NormalizedRisk> {
    match value {
        Value::Array(items) => items.iter().filter_map(structured_item).collect(),
        Value::Object(map) => match map.get("risks") {
            Some(Value::Array(items)) => items.iter().filter_map(structured_item).collect(),
            _ => Vec::new(),
        },
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            // A string that itself parses as JSON is unwrapped once.
            Ok(parsed @ (Value::Array(_) | Value::Object(_))) => normalize_risk_value(&parsed),
            _ => parse_risk_text(text),
        },
        _ => Vec::new(),
    }
}

/// Extract one normalized item from a structured risk object.
fn structured_item(value: &Value) -> Option<NormalizedRisk> {
    let obj = value.as_object()?;

    let severity = str_field(obj, &["severity", "level"]).unwrap_or("info");
    let category = str_field(obj, &["category", "type"]).unwrap_or("other");
    let title = str_field(obj, &["title", "finding"])
        .map(str::to_string)
        .unwrap_or_else(|| format!("Report Risk: {category}"));
    let description = str_field(obj, &["description", "message", "recommendation"])
        .unwrap_or("Please review your recovery report for details.");

    Some(NormalizedRisk {
        severity: severity.to_string(),
        category: category.to_string(),
        title,
        description: description.to_string(),
        low_confidence: false,
    })
}

fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_str))
}

// ---------------------------------------------------------------------------
// Prose fallback
// ---------------------------------------------------------------------------

/// Parse free-text risk prose. Only fragments classified warning or
/// critical survive.
pub fn parse_risk_text(text: &str) -> Vec<NormalizedRisk> {
    split_fragments(text)
        .into_iter()
        .filter_map(|fragment| {
            let severity = detect_severity(&fragment);
            if severity < AlertSeverity::Warning {
                return None;
            }
            Some(NormalizedRisk {
                severity: severity.as_str().to_string(),
                category: detect_category(&fragment).as_str().to_string(),
                title: truncate_chars(&fragment, MAX_TITLE_LEN),
                description: fragment,
                low_confidence: true,
            })
        })
        .collect()
}

/// Parse the unusual-findings text. Findings are inherently concerning, so
/// every surviving fragment is fixed at warning severity.
pub fn parse_unusual_findings(findings: &str) -> Vec<NormalizedRisk> {
    split_fragments(findings)
        .into_iter()
        .map(|fragment| NormalizedRisk {
            severity: AlertSeverity::Warning.as_str().to_string(),
            category: detect_category(&fragment).as_str().to_string(),
            title: format!(
                "Unusual Finding: {}",
                truncate_chars(&fragment, MAX_FINDING_TITLE_LEN)
            ),
            description: fragment,
            low_confidence: true,
        })
        .collect()
}

/// Boundary between two sentences: a period, one whitespace, an uppercase
/// letter. The period is consumed; the rest opens the next fragment.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s[A-Z]").expect("Invalid sentence boundary pattern"));

/// Split prose on newlines and sentence boundaries, dropping fragments under
/// the minimum length.
fn split_fragments(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();

    for line in text.split('\n') {
        let mut start = 0;
        for boundary in SENTENCE_BOUNDARY.find_iter(line) {
            fragments.push(&line[start..boundary.start()]);
            // Skip the period only; whitespace is trimmed below.
            start = boundary.start() + 1;
        }
        fragments.push(&line[start..]);
    }

    fragments
        .into_iter()
        .map(str::trim)
        .filter(|fragment| fragment.len() >= MIN_FRAGMENT_LEN)
        .map(str::to_string)
        .collect()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
