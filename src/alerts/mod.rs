//! Alert derivation and notification dispatch.

pub mod derive;
pub mod notify;

pub use derive::derive_and_dispatch;
