#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms)]
#![deny(unreachable_pub)]

//! lapmart-server

pub mod app_state;
pub mod db;
pub mod docs;
pub mod error;
pub mod extract;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod settings;
pub mod setups;

#[cfg(test)]
mod test_utils;
