pub mod alert;
pub mod enums;
pub mod report;
pub mod subject;

pub use alert::{Alert, RELATED_ENTITY_REPORT};
pub use report::{DataCompleteness, Report, ReportComment};
pub use subject::SubjectProfile;
