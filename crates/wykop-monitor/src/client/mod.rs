//! Wykop API client boundary.
//!
//! The monitor never talks HTTP itself. Registrations fetch through the
//! [`WykopApi`] trait; [`HttpClient`] is the production implementation and
//! tests substitute scripted fakes.

mod error;
mod http;

pub use error::ClientError;
pub use http::{HttpClient, HttpConnector, DEFAULT_ENVIRONMENT};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Credentials;
use crate::feed::FeedResult;

/// Shared handle to the API client, passed along with every event.
pub type SharedClient = Arc<dyn WykopApi>;

/// Listing parameters for the link and microblog streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub category: Option<String>,
    pub bucket: Option<String>,
}

/// Which content a tag stream returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagContent {
    All,
    Link,
    Entry,
}

impl TagContent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Link => "link",
            Self::Entry => "entry",
        }
    }
}

/// Activity feeds of a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFeed {
    LinksAdded,
    LinksCommented,
    LinksVoted,
    EntriesAdded,
    EntriesCommented,
    EntriesVoted,
}

impl ProfileFeed {
    /// Route suffix below `/profile/users/{username}`.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::LinksAdded => "links/added",
            Self::LinksCommented => "links/commented",
            Self::LinksVoted => "links/up",
            Self::EntriesAdded => "entries/added",
            Self::EntriesCommented => "entries/commented",
            Self::EntriesVoted => "entries/voted",
        }
    }
}

/// Remote feeds the monitor can poll.
#[async_trait]
pub trait WykopApi: Send + Sync {
    /// Exchange username and password for a user token.
    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError>;

    /// Upcoming links, newest first.
    async fn links(&self, listing: &Listing) -> Result<FeedResult, ClientError>;

    /// Microblog entries, newest first.
    async fn entries(&self, listing: &Listing) -> Result<FeedResult, ClientError>;

    /// Comments under a link.
    async fn link_comments(&self, link_id: u64) -> Result<FeedResult, ClientError>;

    /// Links attached as related to a link.
    async fn related_links(&self, link_id: u64) -> Result<FeedResult, ClientError>;

    /// Comments under a microblog entry.
    async fn entry_comments(&self, entry_id: u64) -> Result<FeedResult, ClientError>;

    /// Content published in a tag.
    async fn tag_stream(
        &self,
        tag: &str,
        content: Option<TagContent>,
    ) -> Result<FeedResult, ClientError>;

    /// One of a user's activity feeds.
    async fn profile(&self, username: &str, feed: ProfileFeed) -> Result<FeedResult, ClientError>;

    /// Personal notifications of the logged-in user.
    async fn notifications(&self) -> Result<FeedResult, ClientError>;

    /// Private-message conversations of the logged-in user.
    async fn conversations(&self) -> Result<FeedResult, ClientError>;

    /// Messages exchanged with one user.
    async fn conversation(&self, username: &str) -> Result<FeedResult, ClientError>;
}

/// Builds a client from credentials.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        credentials: &Credentials,
        debug_api: bool,
    ) -> Result<SharedClient, ClientError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Client stand-in for unit tests that never reach the network.

    use super::*;

    pub(crate) struct NullClient;

    impl NullClient {
        pub(crate) fn shared() -> SharedClient {
            Arc::new(Self)
        }
    }

    fn unused() -> ClientError {
        ClientError::Other("not available in tests".to_string())
    }

    #[async_trait]
    impl WykopApi for NullClient {
        async fn login(&self, _username: &str, _password: &str) -> Result<(), ClientError> {
            Err(unused())
        }
        async fn links(&self, _listing: &Listing) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn entries(&self, _listing: &Listing) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn link_comments(&self, _link_id: u64) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn related_links(&self, _link_id: u64) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn entry_comments(&self, _entry_id: u64) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn tag_stream(
            &self,
            _tag: &str,
            _content: Option<TagContent>,
        ) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn profile(
            &self,
            _username: &str,
            _feed: ProfileFeed,
        ) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn notifications(&self) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn conversations(&self) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
        async fn conversation(&self, _username: &str) -> Result<FeedResult, ClientError> {
            Err(unused())
        }
    }
}
