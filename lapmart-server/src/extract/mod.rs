//! Custom [axum::extract] Extractors.

pub mod bearer_addon;
pub mod json;
pub mod session;
