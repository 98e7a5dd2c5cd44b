//! Start/stop lifecycle and the polling loop.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::{ClientError, Connector, HttpConnector, SharedClient};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::feed::{Event, FeedKind, FeedOptions, FeedRegistry, FeedResult, Registration, RegistrationKey};
use crate::poller::{Poller, SharedRegistry, TickMode};

/// A claimed start: seeding while `handle` is `None`, polling afterwards.
struct Running {
    id: u64,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Running {
    fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.as_ref().is_some_and(JoinHandle::is_finished)
    }
}

/// Polls registered feeds and delivers new items to callbacks.
///
/// Register feeds first, then [`start`](Self::start). The first pass only
/// records the newest item of every feed; later passes run every
/// `interval` and deliver whatever is newer.
pub struct Monitor {
    registry: SharedRegistry,
    connector: Arc<dyn Connector>,
    running: Mutex<Option<Running>>,
    starts: AtomicU64,
}

impl Monitor {
    /// Create a monitor that talks to the API over HTTP.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(Arc::new(HttpConnector))
    }

    /// Create a monitor with a custom client connector.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(FeedRegistry::new())),
            connector,
            running: Mutex::new(None),
            starts: AtomicU64::new(0),
        }
    }

    /// Register a feed.
    ///
    /// `fetch` receives the client handle and returns the feed's latest
    /// items; `callback` runs inline in the polling loop for every new item.
    pub fn register<F, Fut, C>(
        &self,
        kind: FeedKind,
        label: &str,
        fetch: F,
        callback: C,
        options: FeedOptions,
    ) -> RegistrationKey
    where
        F: Fn(SharedClient) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FeedResult, ClientError>> + Send + 'static,
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let registration = Registration::new(kind, label, fetch, callback, options);
        debug!(feed = label, kind = %kind, key = %registration.key, "Registered feed");
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(registration)
    }

    /// Number of registered feeds.
    #[must_use]
    pub fn registrations(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether monitoring is running, or starting.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running().as_ref().is_some_and(Running::is_active)
    }

    fn running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect, seed watermarks and start polling.
    ///
    /// Monitoring does not start when this returns an error. A [`stop`]
    /// issued before seeding finishes cancels the start; this then returns
    /// `Ok(())` without polling.
    ///
    /// [`stop`]: Self::stop
    pub async fn start(&self, config: MonitorConfig) -> Result<(), MonitorError> {
        config.validate()?;
        let (id, cancel) = self.claim()?;

        let poller = match self.seed(&config).await {
            Ok(poller) => poller,
            Err(e) => {
                self.release(id);
                return Err(e);
            }
        };

        let mut running = self.running();
        if cancel.is_cancelled() {
            if running.as_ref().is_some_and(|r| r.id == id) {
                *running = None;
            }
            info!("Monitoring stopped before polling started");
            return Ok(());
        }
        let handle = tokio::spawn(poll_loop(poller, config.interval, config.debug, cancel.clone()));
        *running = Some(Running {
            id,
            cancel,
            handle: Some(handle),
        });

        info!(interval_secs = config.interval.as_secs(), "Monitoring started");
        Ok(())
    }

    /// Reserve the running slot before the first await, so `stop` can
    /// cancel a start in progress.
    fn claim(&self) -> Result<(u64, CancellationToken), MonitorError> {
        let mut running = self.running();
        if running.as_ref().is_some_and(Running::is_active) {
            return Err(MonitorError::AlreadyRunning);
        }
        let id = self.starts.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        *running = Some(Running {
            id,
            cancel: cancel.clone(),
            handle: None,
        });
        Ok((id, cancel))
    }

    /// Drop the slot claimed by start `id`, if it still holds it.
    fn release(&self, id: u64) {
        let mut running = self.running();
        if running.as_ref().is_some_and(|r| r.id == id) {
            *running = None;
        }
    }

    /// Connect, log in and run the baseline tick.
    async fn seed(&self, config: &MonitorConfig) -> Result<Poller, MonitorError> {
        info!("Initializing Wykop client");
        let client = self
            .connector
            .connect(&config.credentials, config.debug_api)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to initialize Wykop client");
                MonitorError::Init(e)
            })?;
        info!("Wykop client initialized");

        if let Some(login) = &config.login {
            info!(username = %login.username, "Logging in");
            client
                .login(&login.username, &login.password)
                .await
                .map_err(|e| {
                    error!(username = %login.username, error = %e, "Login failed");
                    MonitorError::Auth(e)
                })?;
            info!("Login successful");
        }

        if self.registrations() == 0 {
            error!("Nothing found to monitor");
            return Err(MonitorError::NothingToMonitor);
        }

        let mut poller = Poller::new(Arc::clone(&self.registry), client, config.failure_policy);

        info!("Saving latest content");
        let report = poller.tick(TickMode::Baseline).await;
        if report.aborted {
            if let Some(failure) = report.failures.into_iter().next() {
                error!(feed = %failure.feed, "Failed while saving the latest content");
                return Err(MonitorError::Fetch {
                    feed: failure.feed,
                    source: failure.error,
                });
            }
        }
        info!(seeded = poller.watermarks().len(), "Latest content saved");
        Ok(poller)
    }

    /// Stop polling. An in-flight tick completes; no further ticks run.
    ///
    /// Also cancels a [`start`](Self::start) that is still seeding. Calling
    /// this when not running is a no-op.
    pub fn stop(&self) {
        info!("Stopping monitoring");
        if let Some(running) = self.running().take() {
            running.cancel.cancel();
        }
        info!("Monitoring ended");
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(running) = self.running().take() {
            running.cancel.cancel();
        }
    }
}

/// Tick every `interval`, measured from the end of the previous tick.
async fn poll_loop(mut poller: Poller, interval: Duration, debug: bool, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }

        if debug {
            info!("Checking for new content");
        } else {
            debug!("Checking for new content");
        }
        poller.tick(TickMode::Live).await;
    }
    debug!("Polling loop exited");
}
