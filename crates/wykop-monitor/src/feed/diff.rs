//! Incremental diff: turns a "latest N items" response into the items that
//! are new since the registration's watermark, and dispatches them.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, warn};

use crate::client::SharedClient;

use super::registry::Registration;
use super::types::{ContentId, ContentType, Event, FeedKind, FeedResult, Item, Payload};
use super::watermark::WatermarkStore;

/// Result of diffing one fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Callbacks invoked.
    pub delivered: usize,
    /// Callbacks that returned an error or panicked.
    pub callback_failures: usize,
    /// Watermark after the diff.
    pub watermark: Option<ContentId>,
}

/// How the walk treats one item.
enum Verdict {
    /// Filtered out; the walk continues past it.
    Skip,
    /// Subject to the stop rule, with this identifier.
    Candidate(ContentId),
}

/// The item list of a result, newest first.
fn newest_first(kind: FeedKind, result: &FeedResult) -> Vec<&Item> {
    match kind {
        FeedKind::Content | FeedKind::Notification | FeedKind::PrivateMessageList => {
            result.items.iter().collect()
        }
        FeedKind::ConversationMessages => result.messages.iter().rev().collect(),
    }
}

/// Identifier used for ordering: a conversation is as new as its last message.
fn identifier(kind: FeedKind, item: &Item) -> Option<ContentId> {
    match kind {
        FeedKind::PrivateMessageList => item.last_message().and_then(|m| m.content_id()),
        _ => item.content_id(),
    }
}

fn classify(registration: &Registration, item: &Item) -> Verdict {
    let options = &registration.options;
    let passes = match registration.kind {
        FeedKind::Content => true,
        FeedKind::Notification => options.accepts_type(item.notification_type()),
        FeedKind::PrivateMessageList => !(options.exclude_self
            && item.last_message().is_some_and(|m| m.is_self_authored())),
        FeedKind::ConversationMessages => !(options.exclude_self && item.is_self_authored()),
    };
    if !passes {
        return Verdict::Skip;
    }

    match identifier(registration.kind, item) {
        Some(id) => Verdict::Candidate(id),
        None => {
            warn!(
                feed = %registration.label,
                key = %registration.key,
                "Item has no usable created_at, skipping"
            );
            Verdict::Skip
        }
    }
}

/// Items newer than `watermark`, newest first.
///
/// The walk stops at the first candidate that is not newer than the
/// watermark; filtered items never stop it. Without a watermark every
/// candidate is new.
fn collect_new<'a>(
    registration: &Registration,
    items: &[&'a Item],
    watermark: Option<ContentId>,
) -> Vec<&'a Item> {
    let mut fresh = Vec::new();
    for &item in items {
        match classify(registration, item) {
            Verdict::Skip => continue,
            Verdict::Candidate(id) if watermark.is_some_and(|mark| id <= mark) => break,
            Verdict::Candidate(_) => fresh.push(item),
        }
    }
    fresh
}

fn payload(kind: FeedKind, item: &Item, result: &FeedResult) -> Payload {
    let item = item.clone();
    match kind {
        FeedKind::Content => match item.content_type() {
            ContentType::Link => Payload::Link(item),
            ContentType::Entry => Payload::Entry(item),
            ContentType::Comment => Payload::Comment(item),
        },
        FeedKind::Notification => Payload::Notification(item),
        FeedKind::PrivateMessageList => Payload::Conversation(item),
        FeedKind::ConversationMessages => Payload::Message {
            message: item,
            conversation: result.clone(),
        },
    }
}

/// Invoke the callback, containing errors and panics.
fn dispatch(registration: &Registration, event: Event) -> bool {
    match catch_unwind(AssertUnwindSafe(|| registration.deliver(event))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(
                feed = %registration.label,
                key = %registration.key,
                error = %e,
                "Callback failed"
            );
            false
        }
        Err(_) => {
            error!(
                feed = %registration.label,
                key = %registration.key,
                "Callback panicked"
            );
            false
        }
    }
}

/// Diff one successful fetch result against the registration's watermark.
///
/// With `save_only`, or on the registration's first successful fetch,
/// nothing is delivered. A registration seeded by an earlier fetch but
/// still without a watermark (its feed was empty) gets every item. New
/// items are delivered oldest first. Afterwards the watermark moves to the
/// newest fetched item, whether or not it passed the filters. An empty
/// result leaves the watermark unchanged.
pub fn apply(
    registration: &Registration,
    result: &FeedResult,
    watermarks: &mut WatermarkStore,
    save_only: bool,
    client: &SharedClient,
) -> DiffOutcome {
    let items = newest_first(registration.kind, result);
    let previous = watermarks.get(&registration.key);
    let seeded = watermarks.is_seeded(&registration.key);
    watermarks.mark_seeded(&registration.key);
    let mut outcome = DiffOutcome {
        watermark: previous,
        ..DiffOutcome::default()
    };

    if items.is_empty() {
        debug!(feed = %registration.label, "Empty result, watermark unchanged");
        return outcome;
    }

    let fresh = if seeded && !save_only {
        collect_new(registration, &items, previous)
    } else {
        Vec::new()
    };

    for item in fresh.into_iter().rev() {
        let event = Event {
            payload: payload(registration.kind, item, result),
            client: SharedClient::clone(client),
        };
        outcome.delivered += 1;
        if !dispatch(registration, event) {
            outcome.callback_failures += 1;
        }
    }

    if let Some(newest) = items.iter().find_map(|item| identifier(registration.kind, item)) {
        outcome.watermark = Some(watermarks.set(&registration.key, newest));
    }

    outcome
}
