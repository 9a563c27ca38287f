//! Production server setup code

use crate::{
    db::PgStore,
    settings,
    setups::{NotificationSender, ServerSetup},
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use mailgun_rs::{EmailAddress, Mailgun, MailgunRegion, Message};
use retry_policies::{
    policies::{ExponentialBackoff, ExponentialBackoffBuilder},
    RetryDecision, RetryPolicy,
};

/// Production implementation of `ServerSetup`.
/// Actually calls out to other HTTP services configured in `settings.toml`.
#[derive(Clone, Debug, Default)]
pub struct ProdSetup;

impl ServerSetup for ProdSetup {
    type Store = PgStore;
    type NotificationSender = EmailNotificationSender;
}

#[derive(Debug, Clone)]
/// Sends notifications over email
pub struct EmailNotificationSender {
    settings: settings::Mailgun,
    retry_policy: ExponentialBackoff,
}

impl EmailNotificationSender {
    /// Create a new EmailNotificationSender
    pub fn new(settings: settings::Mailgun) -> Self {
        let retry_policy =
            ExponentialBackoffBuilder::default().build_with_max_retries(settings.max_retries);
        Self {
            settings,
            retry_policy,
        }
    }

    fn sender(&self) -> EmailAddress {
        EmailAddress::name_address(&self.settings.from_name, &self.settings.from_address)
    }

    fn message(&self, to: &str, subject: &str, html_body: &str) -> Message {
        Message {
            to: vec![EmailAddress::address(to)],
            subject: subject.to_string(),
            html: html_body.to_string(),
            ..Default::default()
        }
    }

    fn client(&self, message: Message) -> Mailgun {
        Mailgun {
            message,
            api_key: self.settings.api_key.clone(),
            domain: self.settings.domain.clone(),
        }
    }
}

#[async_trait]
impl NotificationSender for EmailNotificationSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        tracing::debug!(to, subject, "Sending email");

        let mut n_past_retries = 0;
        loop {
            let client = self.client(self.message(to, subject, html_body));

            let err = match client.async_send(MailgunRegion::US, &self.sender()).await {
                Ok(_) => return Ok(()),
                Err(err) => err,
            };

            match self.retry_policy.should_retry(n_past_retries) {
                RetryDecision::Retry { execute_after } => {
                    let wait = (execute_after - Utc::now()).to_std().unwrap_or_default();
                    tracing::warn!(
                        to,
                        error = %err,
                        retry_in_ms = wait.as_millis() as u64,
                        "Email delivery failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    n_past_retries += 1;
                }
                RetryDecision::DoNotRetry => return Err(err.into()),
            }
        }
    }
}
