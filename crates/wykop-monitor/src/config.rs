//! Monitor configuration.

use std::time::Duration;

use crate::error::MonitorError;

/// Default polling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Credentials handed to the API client. Opaque to the monitor itself.
#[derive(Clone, Default)]
pub struct Credentials {
    pub appkey: Option<String>,
    pub secret: Option<String>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    /// API root URL; defaults to the production API.
    pub environment: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: Option<&String>| value.map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("appkey", &self.appkey)
            .field("secret", &redact(self.secret.as_ref()))
            .field("token", &redact(self.token.as_ref()))
            .field("refresh_token", &redact(self.refresh_token.as_ref()))
            .field("environment", &self.environment)
            .finish()
    }
}

/// Username and password for an optional user login.
#[derive(Clone)]
pub struct Login {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a tick does when a registration's fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Skip the remaining registrations of the tick.
    AbortTick,
    /// Log the failure and continue with the next registration.
    #[default]
    Isolate,
}

/// Configuration for [`Monitor::start`](crate::Monitor::start).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between the end of one tick and the start of the next.
    pub interval: Duration,
    pub credentials: Credentials,
    pub login: Option<Login>,
    /// Log every tick at info level.
    pub debug: bool,
    /// Log every API request.
    pub debug_api: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            credentials: Credentials::default(),
            login: None,
            debug: false,
            debug_api: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `WYKOP_APPKEY`, `WYKOP_SECRET`: application credentials
    /// - `WYKOP_TOKEN`, `WYKOP_RTOKEN`: pre-issued access and refresh tokens
    /// - `WYKOP_ENVIRONMENT`: API root URL
    /// - `WYKOP_USERNAME`, `WYKOP_PASSWORD`: log in as this user (both required)
    /// - `WYKOP_INTERVAL`: polling interval in seconds (default: 60)
    /// - `WYKOP_DEBUG`: set to "true" or "1" for per-tick logging
    pub fn from_env() -> Result<Self, MonitorError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let interval = match var("WYKOP_INTERVAL") {
            Some(raw) => raw
                .parse()
                .map_err(|_| MonitorError::Config(format!("WYKOP_INTERVAL is not a number: {raw}")))?,
            None => DEFAULT_INTERVAL_SECS,
        };

        let login = match (var("WYKOP_USERNAME"), var("WYKOP_PASSWORD")) {
            (Some(username), Some(password)) => Some(Login { username, password }),
            (None, None) => None,
            _ => {
                return Err(MonitorError::Config(
                    "WYKOP_USERNAME and WYKOP_PASSWORD must be set together".to_string(),
                ))
            }
        };

        let debug = var("WYKOP_DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let config = Self {
            interval: Duration::from_secs(interval),
            credentials: Credentials {
                appkey: var("WYKOP_APPKEY"),
                secret: var("WYKOP_SECRET"),
                token: var("WYKOP_TOKEN"),
                refresh_token: var("WYKOP_RTOKEN"),
                environment: var("WYKOP_ENVIRONMENT"),
            },
            login,
            debug,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before monitoring starts.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.interval.is_zero() {
            return Err(MonitorError::Config(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
