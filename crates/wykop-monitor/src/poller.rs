//! One polling pass over every registration.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, info, warn};

use crate::client::{ClientError, SharedClient};
use crate::config::FailurePolicy;
use crate::feed::{apply, FeedRegistry, RegistrationKey, WatermarkStore};

/// Registry shared between the monitor (registration) and the poller.
pub type SharedRegistry = Arc<RwLock<FeedRegistry>>;

/// Whether a tick delivers events or only seeds watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// First run: record the newest item of every feed, deliver nothing.
    Baseline,
    /// Scheduled run: deliver everything newer than the watermarks.
    Live,
}

/// A registration whose fetch failed during a tick.
#[derive(Debug)]
pub struct FetchFailure {
    pub feed: String,
    pub key: RegistrationKey,
    pub error: ClientError,
}

/// Result of a single tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Registrations known when the tick started.
    pub registrations: usize,
    /// Registrations fetched successfully.
    pub polled: usize,
    /// Callbacks invoked.
    pub delivered: usize,
    /// Callbacks that failed or panicked.
    pub callback_failures: usize,
    /// Fetch failures.
    pub failures: Vec<FetchFailure>,
    /// Remaining registrations were skipped after a fetch failure.
    pub aborted: bool,
}

impl TickReport {
    fn log(&self, mode: TickMode) {
        if self.aborted {
            warn!(
                polled = self.polled,
                registrations = self.registrations,
                "Tick aborted after fetch failure"
            );
        }
        let message = match mode {
            TickMode::Baseline => "Baseline tick complete",
            TickMode::Live => "Tick complete",
        };
        if self.delivered > 0 || !self.failures.is_empty() {
            info!(
                registrations = self.registrations,
                polled = self.polled,
                delivered = self.delivered,
                callback_failures = self.callback_failures,
                fetch_failures = self.failures.len(),
                "{message}"
            );
        } else {
            debug!(
                registrations = self.registrations,
                polled = self.polled,
                "{message}"
            );
        }
    }
}

/// Fetches and diffs registrations; owns the watermarks.
pub struct Poller {
    registry: SharedRegistry,
    watermarks: WatermarkStore,
    client: SharedClient,
    policy: FailurePolicy,
}

impl Poller {
    /// Create a poller with empty watermarks.
    #[must_use]
    pub fn new(registry: SharedRegistry, client: SharedClient, policy: FailurePolicy) -> Self {
        Self {
            registry,
            watermarks: WatermarkStore::new(),
            client,
            policy,
        }
    }

    /// Current watermarks.
    #[must_use]
    pub fn watermarks(&self) -> &WatermarkStore {
        &self.watermarks
    }

    /// Poll every registration once, sequentially, in registry order.
    pub async fn tick(&mut self, mode: TickMode) -> TickReport {
        let registrations = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        let mut report = TickReport {
            registrations: registrations.len(),
            ..TickReport::default()
        };

        for registration in &registrations {
            let result = match registration.fetch(Arc::clone(&self.client)).await {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        feed = %registration.label,
                        key = %registration.key,
                        error = %e,
                        "Failed to fetch the latest content"
                    );
                    report.failures.push(FetchFailure {
                        feed: registration.label.clone(),
                        key: registration.key.clone(),
                        error: e,
                    });
                    if self.policy == FailurePolicy::AbortTick {
                        report.aborted = true;
                        break;
                    }
                    continue;
                }
            };
            report.polled += 1;

            let outcome = apply(
                registration,
                &result,
                &mut self.watermarks,
                mode == TickMode::Baseline,
                &self.client,
            );
            report.delivered += outcome.delivered;
            report.callback_failures += outcome.callback_failures;
        }

        report.log(mode);
        report
    }
}
