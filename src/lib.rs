//! Cardia: report orchestration for post-surgical cardiac recovery.
//!
//! The crate owns the lifecycle of monthly recovery reports: the eligibility
//! gate, the generation pipeline over external aggregation and analysis
//! collaborators, and the derivation of actionable alerts (with SMS/email
//! fan-out) from the findings. Persistence and messaging are consumed
//! through the narrow traits in [`store`] and [`collab`]; embedders plug in
//! their own adapters or use the in-memory store.

pub mod alerts;
pub mod classify;
pub mod clock;
pub mod collab;
pub mod config;
pub mod eligibility;
pub mod models;
pub mod normalize;
pub mod policy;
pub mod service;
pub mod store;

pub use eligibility::Eligibility;
pub use service::{ReportService, ReportWithComments, ServiceError};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Call once at startup; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
