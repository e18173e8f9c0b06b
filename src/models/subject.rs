use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The patient whose data is analyzed, plus the contact details the
/// notification dispatcher needs. Maintained by an external profile service;
/// the core reads it through `SubjectStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub subject_id: Uuid,
    /// Linked clinical patient profile, when one exists.
    pub patient_id: Option<Uuid>,
    /// Absent for subjects on the exploratory-report path.
    pub surgery_date: Option<NaiveDate>,
    pub email: String,
    /// SMS fan-out is attempted only when a number is on file.
    pub phone: Option<String>,
}

impl SubjectProfile {
    pub fn new(subject_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            subject_id,
            patient_id: None,
            surgery_date: None,
            email: email.into(),
            phone: None,
        }
    }
}
