//! Helpers for running isolated webserver instances
use crate::{
    app_state::{AppState, AppStateBuilder},
    identity::{session::SessionKeys, Session},
    router::setup_app_router,
    setups::test::{MemoryStore, TestNotificationSender, TestSetup},
};
use anyhow::{anyhow, Result};
use axum::Router;
use chrono::{Duration, Utc};
use lapmart_core::role::Role;

/// An in-memory lapmart server, isolated per test
#[derive(Debug)]
pub(crate) struct TestContext {
    app: Router,
    app_state: AppState<TestSetup>,
}

impl TestContext {
    /// Create a new test context
    pub(crate) fn new() -> Self {
        Self::new_with_state(|builder| builder)
    }

    pub(crate) fn new_with_state<F>(f: F) -> Self
    where
        F: FnOnce(AppStateBuilder<TestSetup>) -> AppStateBuilder<TestSetup>,
    {
        let builder = AppStateBuilder::default()
            .with_store(MemoryStore::default())
            .with_notification_sender(TestNotificationSender::default())
            .with_session_keys(SessionKeys::from_secret(
                b"test-secret",
                std::time::Duration::from_secs(7 * 24 * 60 * 60),
            ));

        let app_state = f(builder).finalize().unwrap();

        let app = setup_app_router(app_state.clone());

        Self { app, app_state }
    }

    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    pub(crate) fn app_state(&self) -> &AppState<TestSetup> {
        &self.app_state
    }

    pub(crate) fn store(&self) -> &MemoryStore {
        &self.app_state.store
    }

    pub(crate) fn notification_sender(&self) -> &TestNotificationSender {
        &self.app_state.notification_sender
    }

    /// The code most recently emailed to `email`
    pub(crate) fn last_code(&self, email: &str) -> Result<String> {
        self.notification_sender()
            .last_code(email)
            .ok_or_else(|| anyhow!("No code was sent to {email}"))
    }

    /// A session as if `account_id` had just logged in
    pub(crate) fn session_for(&self, account_id: i32, role: Role) -> Session {
        Session {
            account_id,
            role,
            jti: uuid::Uuid::new_v4().to_string(),
            expires_at: (Utc::now() + Duration::days(7)).naive_utc(),
        }
    }
}
