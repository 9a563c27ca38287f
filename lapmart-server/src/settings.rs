//! Settings / Configuration.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Names of environments for lapmart-server.
/// Overrides serialization to force lower case in settings and
/// environment variables
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    /// Local environment (local testing).
    Local,
    /// Official Develop environment.
    Dev,
    /// Official environment.
    Staging,
    /// Official Production environment.
    Prod,
}

/// Implement display to force environment to lower case
impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("{self:?}").to_lowercase())
    }
}

/// Database settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Database {
    /// Database URL
    pub url: String,
    /// Connect Timeout
    pub connect_timeout: u64,
}

/// Server settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    /// Server [AppEnvironment].
    pub environment: AppEnvironment,
    /// Server port.
    pub port: u16,
    /// Server metrics port.
    pub metrics_port: u16,
    /// Server timeout in milliseconds.
    pub timeout_ms: u64,
}

/// [Mailgun] settings.
///
/// [Mailgun]: https://www.mailgun.com/
#[derive(Clone, Deserialize)]
pub struct Mailgun {
    /// Mailgun API key.
    pub api_key: String,
    /// Mailgun domain.
    pub domain: String,
    /// Mailgun From Address
    pub from_address: String,
    /// Mailgun From Name
    pub from_name: String,
    /// Retries on transient delivery failures
    #[serde(default = "default_delivery_retries")]
    pub max_retries: u32,
}

fn default_delivery_retries() -> u32 {
    3
}

impl std::fmt::Debug for Mailgun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailgun")
            .field("api_key", &"<redacted>")
            .field("domain", &self.domain)
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Secret committed in the bundled settings, only accepted in [AppEnvironment::Local]
pub const LOCAL_SESSION_SECRET: &str = "local-development-secret-change-me";

/// Session token settings.
#[derive(Clone, Deserialize)]
pub struct Session {
    /// HMAC secret used to sign session tokens
    pub secret: String,
    /// How long a session token stays valid, in seconds
    pub ttl_seconds: u64,
}

impl Session {
    /// Session lifetime as a [Duration].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Refuse an empty secret anywhere, and the bundled one outside local.
    pub fn check_secret(&self, environment: AppEnvironment) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "session.secret must not be empty".to_string(),
            ));
        }

        if environment != AppEnvironment::Local && self.secret == LOCAL_SESSION_SECRET {
            return Err(ConfigError::Message(format!(
                "session.secret is the bundled development secret, set LAPMART_SESSION__SECRET for the {environment} environment"
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// One-time code settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Verification {
    /// How long an issued code stays valid, in seconds
    pub code_ttl_seconds: u64,
    /// Failed attempts after which a code is locked until resent
    pub max_attempts: i32,
}

impl Verification {
    /// Code lifetime as a [chrono::Duration].
    pub fn code_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.code_ttl_seconds as i64)
    }
}

impl Default for Verification {
    fn default() -> Self {
        Self {
            code_ttl_seconds: 10 * 60,
            max_attempts: 5,
        }
    }
}

/// Background healthcheck settings
#[derive(Clone, Debug, Deserialize)]
pub struct Healthcheck {
    /// Is background healthcheck enabled?
    #[serde(rename = "enabled")]
    pub is_enabled: bool,
    /// Healthcheck interval in milliseconds.
    pub interval_ms: u64,
    /// Healthcheck max retries.
    pub max_retries: u32,
}

#[derive(Clone, Debug, Deserialize)]
/// Application settings.
pub struct Settings {
    /// Database settings
    pub database: Database,
    /// Server settings
    pub server: Server,
    /// Mailgun settings
    pub mailgun: Mailgun,
    /// Session token settings
    pub session: Session,
    /// One-time code settings
    #[serde(default)]
    pub verification: Verification,
    /// Healthcheck settings
    pub healthcheck: Healthcheck,
    /// The path where the settings file resides.
    /// This can't actually be configured in the settings file itself, for obvious reasons.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load settings.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path
            .unwrap_or(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/settings.toml"));
        // inject environment variables naming them properly on the settings
        // e.g. [database] url="foo"
        // would be injected with environment variable LAPMART_DATABASE__URL="foo"
        let s = Config::builder()
            .add_source(File::with_name(&path.as_path().display().to_string()))
            .add_source(
                Environment::with_prefix("LAPMART")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings
            .session
            .check_secret(settings.server.environment)?;
        settings.path = Some(path);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_bundled_settings() {
        let settings = Settings::load(None).unwrap();

        assert_eq!(settings.server.environment, AppEnvironment::Local);
        assert_eq!(settings.verification.code_ttl_seconds, 600);
        assert_eq!(settings.verification.max_attempts, 5);
        assert_eq!(settings.session.ttl(), Duration::from_secs(7 * 24 * 60 * 60));
        assert!(settings.path.is_some());
    }

    #[test]
    fn test_default_verification_settings() {
        let verification = Verification::default();

        assert_eq!(verification.code_ttl(), chrono::Duration::minutes(10));
        assert_eq!(verification.max_attempts, 5);
    }

    #[test]
    fn test_secrets_are_not_logged() {
        let session = Session {
            secret: "hunter2".to_string(),
            ttl_seconds: 60,
        };

        assert!(!format!("{session:?}").contains("hunter2"));
    }

    #[test]
    fn test_bundled_secret_only_accepted_locally() {
        let session = Session {
            secret: LOCAL_SESSION_SECRET.to_string(),
            ttl_seconds: 60,
        };

        assert!(session.check_secret(AppEnvironment::Local).is_ok());
        for environment in [
            AppEnvironment::Dev,
            AppEnvironment::Staging,
            AppEnvironment::Prod,
        ] {
            assert!(session.check_secret(environment).is_err());
        }

        let configured = Session {
            secret: "a-real-secret".to_string(),
            ..session
        };
        assert!(configured.check_secret(AppEnvironment::Prod).is_ok());

        let empty = Session {
            secret: "  ".to_string(),
            ..configured
        };
        assert!(empty.check_secret(AppEnvironment::Local).is_err());
    }

    #[test]
    fn test_environment_display_is_lowercase() {
        assert_eq!(AppEnvironment::Staging.to_string(), "staging");
    }
}
