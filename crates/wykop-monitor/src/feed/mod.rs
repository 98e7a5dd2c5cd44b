//! Feed registrations, watermarks and the incremental diff engine.

mod diff;
mod registry;
mod types;
mod watermark;

pub use diff::{apply, DiffOutcome};
pub use registry::{Callback, FeedOptions, FeedRegistry, FetchFn, Registration, RegistrationKey};
pub use types::{ContentId, ContentType, Event, FeedKind, FeedResult, Item, NotificationType, Payload};
pub use watermark::WatermarkStore;
