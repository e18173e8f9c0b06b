use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse a stored string into one of the bounded enums.
#[derive(Debug, Error)]
#[error("Invalid {field} value: {value}")]
pub struct EnumParseError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(EnumParseError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ReportStatus {
    Generating => "generating",
    Completed => "completed",
    Error => "error",
});

impl ReportStatus {
    /// `completed` and `error` are terminal: no further automated mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

str_enum!(AlertKind {
    MedicationMissed => "medication_missed",
    ActivityIssue => "activity_issue",
    VitalConcern => "vital_concern",
    GoalOverdue => "goal_overdue",
    RoutineSkipped => "routine_skipped",
    Other => "other",
});

str_enum!(RiskCategory {
    Vitals => "vitals",
    Medication => "medication",
    Exercise => "exercise",
    Nutrition => "nutrition",
    Other => "other",
});

str_enum!(CommentType {
    Feedback => "feedback",
    Approval => "approval",
    Concern => "concern",
    Recommendation => "recommendation",
    Question => "question",
});

str_enum!(Role {
    Patient => "patient",
    Clinician => "clinician",
    Administrator => "administrator",
});

impl Role {
    /// Staff roles bypass the eligibility interval and may act cross-subject.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Clinician | Self::Administrator)
    }
}

str_enum!(NotificationMethod {
    Sms => "sms",
    Email => "email",
});

// ---------------------------------------------------------------------------
// AlertSeverity is ordered, so it lives outside the macro
// ---------------------------------------------------------------------------

/// Severity determines whether a risk item becomes an alert and whether
/// notifications fan out. Ordering matters: Info < Warning < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational only, never persisted as an alert.
    Info,
    /// Persisted as an alert, no notification fan-out.
    Warning,
    /// Persisted and fanned out to notification channels.
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            _ => Err(EnumParseError {
                field: "AlertSeverity".into(),
                value: s.into(),
            }),
        }
    }
}
