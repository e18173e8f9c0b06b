use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Cardia";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum days post-surgery before the first report, and minimum days
/// between consecutive reports.
pub const REPORT_INTERVAL_DAYS: i64 = 30;

/// Model identity stamped on every report at creation.
pub const AI_MODEL: &str = "claude-sonnet-4-20250514";
pub const AI_PROMPT_VERSION: &str = "v1.0";

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "cardia=info"
}

/// Tunable knobs for one `ReportService` instance.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bound on the data-aggregation collaborator call.
    pub aggregation_timeout: Duration,
    /// Bound on the AI-analysis collaborator call.
    pub analysis_timeout: Duration,
    /// Default page size for report listings.
    pub list_limit: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            aggregation_timeout: Duration::from_secs(120),
            analysis_timeout: Duration::from_secs(300),
            list_limit: 50,
        }
    }
}
