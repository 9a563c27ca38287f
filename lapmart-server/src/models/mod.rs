//! Models

pub mod account;
pub mod pending_verification;
pub mod revoked_session;
