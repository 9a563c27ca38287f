//! Server setup for local development & easier integration testing

use anyhow::Result;
use async_trait::async_trait;

use super::{NotificationSender, ServerSetup};
use crate::db::PgStore;

/// Implementation of `ServerSetup` for local environments.
/// Uses the real database, but never sends emails.
#[derive(Debug, Clone)]
pub struct LocalSetup;

impl ServerSetup for LocalSetup {
    type Store = PgStore;
    type NotificationSender = LogNotificationSender;
}

/// A `NotificationSender` that doesn't actually send emails,
/// but instead logs them via tracing.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        tracing::info!(to, subject, html_body, "email (not sent in local environment)");
        Ok(())
    }
}
