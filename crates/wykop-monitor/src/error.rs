//! Error types surfaced by the monitor.

use thiserror::Error;

use crate::client::ClientError;

/// Errors returned from the monitor's public entry points.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The API client could not be constructed.
    #[error("Failed to initialize Wykop client: {0}")]
    Init(#[source] ClientError),

    /// Logging in with username and password failed.
    #[error("Login failed: {0}")]
    Auth(#[source] ClientError),

    /// A registration's fetch failed.
    #[error("Failed to fetch '{feed}': {source}")]
    Fetch {
        feed: String,
        #[source]
        source: ClientError,
    },

    /// A required registration parameter was missing or blank.
    #[error("No value specified for '{0}'")]
    MissingParameter(&'static str),

    /// Invalid monitor configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// `start` was called without any registrations.
    #[error("Nothing found to monitor")]
    NothingToMonitor,

    /// `start` was called while monitoring is already running.
    #[error("Monitoring is already running")]
    AlreadyRunning,
}
