//! Registration functions, one per monitored feed.
//!
//! Each is a thin adapter that validates its parameters and registers a
//! fetch against the matching [`WykopApi`](crate::client::WykopApi) call.

use crate::client::{Listing, ProfileFeed, SharedClient, TagContent};
use crate::error::MonitorError;
use crate::feed::{Event, FeedKind, FeedOptions, RegistrationKey};
use crate::Monitor;

fn required(name: &'static str, value: &str) -> Result<String, MonitorError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MonitorError::MissingParameter(name));
    }
    Ok(value.to_string())
}

fn required_id(name: &'static str, id: u64) -> Result<u64, MonitorError> {
    if id == 0 {
        return Err(MonitorError::MissingParameter(name));
    }
    Ok(id)
}

impl Monitor {
    /// New links in the upcoming section.
    pub fn links<C>(&self, listing: Listing, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(self.register(
            FeedKind::Content,
            "links",
            move |client: SharedClient| {
                let listing = listing.clone();
                async move { client.links(&listing).await }
            },
            callback,
            FeedOptions::default(),
        ))
    }

    /// New microblog entries.
    pub fn entries<C>(&self, listing: Listing, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(self.register(
            FeedKind::Content,
            "entries",
            move |client: SharedClient| {
                let listing = listing.clone();
                async move { client.entries(&listing).await }
            },
            callback,
            FeedOptions::default(),
        ))
    }

    /// New comments under a link.
    pub fn link_comments<C>(&self, link_id: u64, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let link_id = required_id("link_id", link_id)?;
        Ok(self.register(
            FeedKind::Content,
            "link_comments",
            move |client: SharedClient| async move { client.link_comments(link_id).await },
            callback,
            FeedOptions::default(),
        ))
    }

    /// New related links of a link.
    pub fn related_links<C>(&self, link_id: u64, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let link_id = required_id("link_id", link_id)?;
        Ok(self.register(
            FeedKind::Content,
            "related_links",
            move |client: SharedClient| async move { client.related_links(link_id).await },
            callback,
            FeedOptions::default(),
        ))
    }

    /// New comments under a microblog entry.
    pub fn entry_comments<C>(&self, entry_id: u64, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let entry_id = required_id("entry_id", entry_id)?;
        Ok(self.register(
            FeedKind::Content,
            "entry_comments",
            move |client: SharedClient| async move { client.entry_comments(entry_id).await },
            callback,
            FeedOptions::default(),
        ))
    }

    /// New links or entries in a tag. A leading `#` is ignored.
    pub fn tags<C>(
        &self,
        tag: &str,
        content: Option<TagContent>,
        callback: C,
    ) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let tag = required("tag", tag.trim().trim_start_matches('#'))?;
        Ok(self.register(
            FeedKind::Content,
            "tags",
            move |client: SharedClient| {
                let tag = tag.clone();
                async move { client.tag_stream(&tag, content).await }
            },
            callback,
            FeedOptions::default(),
        ))
    }

    /// Links added by a user.
    pub fn user_links<C>(&self, username: &str, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.profile_feed("user_links", username, ProfileFeed::LinksAdded, callback)
    }

    /// Links commented by a user.
    pub fn user_link_comments<C>(&self, username: &str, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.profile_feed("user_link_comments", username, ProfileFeed::LinksCommented, callback)
    }

    /// Links upvoted by a user.
    pub fn user_link_votes<C>(&self, username: &str, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.profile_feed("user_link_votes", username, ProfileFeed::LinksVoted, callback)
    }

    /// Entries added by a user.
    pub fn user_entries<C>(&self, username: &str, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.profile_feed("user_entries", username, ProfileFeed::EntriesAdded, callback)
    }

    /// Entries commented by a user.
    pub fn user_entry_comments<C>(&self, username: &str, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.profile_feed("user_entry_comments", username, ProfileFeed::EntriesCommented, callback)
    }

    /// Entries upvoted by a user.
    pub fn user_entry_votes<C>(&self, username: &str, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.profile_feed("user_entry_votes", username, ProfileFeed::EntriesVoted, callback)
    }

    fn profile_feed<C>(
        &self,
        label: &str,
        username: &str,
        feed: ProfileFeed,
        callback: C,
    ) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let username = required("username", username)?;
        Ok(self.register(
            FeedKind::Content,
            label,
            move |client: SharedClient| {
                let username = username.clone();
                async move { client.profile(&username, feed).await }
            },
            callback,
            FeedOptions::default(),
        ))
    }

    /// New personal notifications. Requires login.
    ///
    /// `types` limits delivery to those notification types (see
    /// [`NotificationType`](crate::feed::NotificationType)); `None` delivers
    /// every type.
    pub fn notifications<C>(
        &self,
        types: Option<Vec<String>>,
        callback: C,
    ) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let options = match types {
            Some(types) if types.is_empty() => return Err(MonitorError::MissingParameter("types")),
            Some(types) => FeedOptions::with_filter(types),
            None => FeedOptions::default(),
        };
        Ok(self.register(
            FeedKind::Notification,
            "notifications",
            |client: SharedClient| async move { client.notifications().await },
            callback,
            options,
        ))
    }

    /// Conversations with a new last message. Requires login.
    pub fn pms<C>(&self, exclude_self: bool, callback: C) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(self.register(
            FeedKind::PrivateMessageList,
            "pms",
            |client: SharedClient| async move { client.conversations().await },
            callback,
            FeedOptions::excluding_self(exclude_self),
        ))
    }

    /// New messages in the conversation with one user. Requires login.
    pub fn conversation<C>(
        &self,
        username: &str,
        exclude_self: bool,
        callback: C,
    ) -> Result<RegistrationKey, MonitorError>
    where
        C: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let username = required("username", username)?;
        Ok(self.register(
            FeedKind::ConversationMessages,
            "conversation",
            move |client: SharedClient| {
                let username = username.clone();
                async move { client.conversation(&username).await }
            },
            callback,
            FeedOptions::excluding_self(exclude_self),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignore(_event: Event) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_required_parameters() {
        let monitor = Monitor::new();

        assert!(matches!(
            monitor.tags("  ", None, ignore),
            Err(MonitorError::MissingParameter("tag"))
        ));
        assert!(matches!(
            monitor.tags("#", None, ignore),
            Err(MonitorError::MissingParameter("tag"))
        ));
        assert!(matches!(
            monitor.user_links("", ignore),
            Err(MonitorError::MissingParameter("username"))
        ));
        assert!(matches!(
            monitor.user_entry_votes(" ", ignore),
            Err(MonitorError::MissingParameter("username"))
        ));
        assert!(matches!(
            monitor.conversation("", true, ignore),
            Err(MonitorError::MissingParameter("username"))
        ));
        assert!(matches!(
            monitor.link_comments(0, ignore),
            Err(MonitorError::MissingParameter("link_id"))
        ));
        assert!(matches!(
            monitor.entry_comments(0, ignore),
            Err(MonitorError::MissingParameter("entry_id"))
        ));
        assert!(matches!(
            monitor.notifications(Some(vec![]), ignore),
            Err(MonitorError::MissingParameter("types"))
        ));
        assert_eq!(monitor.registrations(), 0);
    }

    #[test]
    fn test_every_registration_function_registers() {
        let monitor = Monitor::new();

        monitor.links(Listing::default(), ignore).unwrap();
        monitor.entries(Listing::default(), ignore).unwrap();
        monitor.link_comments(1, ignore).unwrap();
        monitor.related_links(1, ignore).unwrap();
        monitor.entry_comments(1, ignore).unwrap();
        monitor.tags("#rust", Some(TagContent::Entry), ignore).unwrap();
        monitor.user_links("alice", ignore).unwrap();
        monitor.user_link_comments("alice", ignore).unwrap();
        monitor.user_link_votes("alice", ignore).unwrap();
        monitor.user_entries("alice", ignore).unwrap();
        monitor.user_entry_comments("alice", ignore).unwrap();
        monitor.user_entry_votes("alice", ignore).unwrap();
        monitor
            .notifications(Some(vec!["new_follower".to_string()]), ignore)
            .unwrap();
        monitor.pms(true, ignore).unwrap();
        monitor.conversation("bob", false, ignore).unwrap();

        assert_eq!(monitor.registrations(), 15);
    }
}
