//! Feed registrations, grouped by kind.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::client::{ClientError, SharedClient};

use super::types::{Event, FeedKind, FeedResult};

/// Fetch capability of a registration.
pub type FetchFn =
    Arc<dyn Fn(SharedClient) -> BoxFuture<'static, Result<FeedResult, ClientError>> + Send + Sync>;

/// User callback invoked once per new item.
pub type Callback = Arc<dyn Fn(Event) -> anyhow::Result<()> + Send + Sync>;

/// Opaque, process-unique registration key (160 random bits, hex encoded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationKey(String);

impl RegistrationKey {
    /// Generate a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 20] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind-specific filter options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedOptions {
    /// Notification types to deliver; `None` delivers every type.
    pub filter: Option<HashSet<String>>,
    /// Skip messages written by the logged-in user.
    pub exclude_self: bool,
}

impl FeedOptions {
    /// Options delivering only the given notification types.
    #[must_use]
    pub fn with_filter<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filter: Some(types.into_iter().map(Into::into).collect()),
            exclude_self: false,
        }
    }

    /// Options skipping self-authored messages.
    #[must_use]
    pub fn excluding_self(exclude_self: bool) -> Self {
        Self {
            filter: None,
            exclude_self,
        }
    }

    /// Whether a notification type passes the filter.
    #[must_use]
    pub fn accepts_type(&self, kind: Option<&str>) -> bool {
        match (&self.filter, kind) {
            (None, _) => true,
            (Some(filter), Some(kind)) => filter.contains(kind),
            (Some(_), None) => false,
        }
    }
}

/// One feed subscription. Immutable once registered.
#[derive(Clone)]
pub struct Registration {
    pub kind: FeedKind,
    /// Name of the registration function, used in logs.
    pub label: String,
    pub key: RegistrationKey,
    pub options: FeedOptions,
    fetch: FetchFn,
    callback: Callback,
}

impl Registration {
    /// Create a registration with a fresh key.
    pub fn new<F, Fut, C>(
        kind: FeedKind,
        label: impl Into<String>,
        fetch: F,
        callback: C,
        options: FeedOptions,
    ) -> Self
    where
        F: Fn(SharedClient) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<FeedResult, ClientError>> + Send + 'static,
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            kind,
            label: label.into(),
            key: RegistrationKey::generate(),
            options,
            fetch: Arc::new(move |client| fetch(client).boxed()),
            callback: Arc::new(callback),
        }
    }

    /// Run the fetch capability.
    pub async fn fetch(&self, client: SharedClient) -> Result<FeedResult, ClientError> {
        (self.fetch)(client).await
    }

    /// Invoke the callback for one event.
    pub fn deliver(&self, event: Event) -> anyhow::Result<()> {
        (self.callback)(event)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// All registrations, bucketed by kind. Only grows.
#[derive(Debug, Default)]
pub struct FeedRegistry {
    buckets: BTreeMap<FeedKind, Vec<Registration>>,
}

impl FeedRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration, returning its key.
    pub fn register(&mut self, registration: Registration) -> RegistrationKey {
        let key = registration.key.clone();
        self.buckets
            .entry(registration.kind)
            .or_default()
            .push(registration);
        key
    }

    /// Registrations in polling order: bucket by bucket, then in
    /// registration order within a bucket.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Registration> {
        self.buckets.values().flatten().cloned().collect()
    }

    /// Total number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
