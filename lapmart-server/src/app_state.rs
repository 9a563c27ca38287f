//! The Axum Application State

use crate::{identity::session::SessionKeys, settings, setups::ServerSetup};
use anyhow::{anyhow, Result};
use std::sync::Arc;

#[derive(Clone)]
/// Global application route state.
pub struct AppState<S: ServerSetup> {
    /// Accounts, pending verifications and revoked sessions
    pub store: S::Store,
    /// The service that delivers one-time codes
    pub notification_sender: S::NotificationSender,
    /// Keys for signing and checking session tokens
    pub session_keys: Arc<SessionKeys>,
    /// Lifetime and attempt limit of one-time codes
    pub verification: Arc<settings::Verification>,
}

/// Builder for [`AppState`]
#[derive(Debug)]
pub struct AppStateBuilder<S: ServerSetup> {
    store: Option<S::Store>,
    notification_sender: Option<S::NotificationSender>,
    session_keys: Option<SessionKeys>,
    verification: settings::Verification,
}

impl<S: ServerSetup> Default for AppStateBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            notification_sender: None,
            session_keys: None,
            verification: Default::default(),
        }
    }
}

impl<S: ServerSetup> AppStateBuilder<S> {
    /// Finalize the builder and return the [`AppState`]
    pub fn finalize(self) -> Result<AppState<S>> {
        let store = self.store.ok_or_else(|| anyhow!("store is required"))?;

        let notification_sender = self
            .notification_sender
            .ok_or_else(|| anyhow!("notification_sender is required"))?;

        let session_keys = self
            .session_keys
            .ok_or_else(|| anyhow!("session_keys are required"))?;

        Ok(AppState {
            store,
            notification_sender,
            session_keys: Arc::new(session_keys),
            verification: Arc::new(self.verification),
        })
    }

    /// Set the store
    pub fn with_store(mut self, store: S::Store) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the service that delivers one-time codes
    pub fn with_notification_sender(mut self, notification_sender: S::NotificationSender) -> Self {
        self.notification_sender = Some(notification_sender);
        self
    }

    /// Set the session token keys
    pub fn with_session_keys(mut self, session_keys: SessionKeys) -> Self {
        self.session_keys = Some(session_keys);
        self
    }

    /// Set one-time code lifetime and attempt limit
    pub fn with_verification(mut self, verification: settings::Verification) -> Self {
        self.verification = verification;
        self
    }
}

impl<S> std::fmt::Debug for AppState<S>
where
    S: ServerSetup,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session_keys", &self.session_keys)
            .field("verification", &self.verification)
            .finish()
    }
}
