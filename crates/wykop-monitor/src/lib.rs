//! Change notifications for the Wykop API.
//!
//! The monitor periodically re-fetches a set of registered feeds (links,
//! entries, comments, notifications, private messages), works out which
//! items are new since the previous pass and invokes a callback for each of
//! them, once, oldest first.
//!
//! # Usage
//!
//! ```no_run
//! use wykop_monitor::{Listing, Monitor, MonitorConfig};
//!
//! # async fn run() -> Result<(), wykop_monitor::MonitorError> {
//! let monitor = Monitor::new();
//!
//! monitor.entries(Listing::default(), |event| {
//!     println!("{:?}", event.payload);
//!     Ok(())
//! })?;
//! monitor.tags("rust", None, |event| {
//!     println!("{:?}", event.payload);
//!     Ok(())
//! })?;
//!
//! monitor.start(MonitorConfig::from_env()?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`feed::FeedRegistry`] holds registrations bucketed by [`FeedKind`]
//! - [`feed::WatermarkStore`] remembers the newest item seen per registration
//! - [`feed::apply`] diffs one fetch result against a watermark and dispatches
//! - [`Poller`] runs one pass over all registrations
//! - [`Monitor`] owns the client and the polling loop
//!
//! Nothing is persisted: every start establishes a fresh baseline and
//! delivers nothing for content that existed before it.

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod poller;

mod monitor;
mod subscriptions;

pub use client::{
    ClientError, Connector, HttpClient, HttpConnector, Listing, ProfileFeed, SharedClient,
    TagContent, WykopApi,
};
pub use config::{Credentials, FailurePolicy, Login, MonitorConfig};
pub use error::MonitorError;
pub use feed::{Event, FeedKind, FeedOptions, FeedResult, Item, NotificationType, Payload, RegistrationKey};
pub use monitor::Monitor;
pub use poller::{Poller, TickMode, TickReport};
