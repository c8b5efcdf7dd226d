//! Visual grouping of consecutive messages.
//!
//! A run of messages from the same sender collapses under a single header
//! until the sender changes or the conversation goes quiet for longer than
//! the configured gap.

use chrono::Duration;

use crate::message::{Message, MessageList};

/// One flag per message; `true` means the message starts a new group.
///
/// Pure and deterministic: the first message always starts a group, and a
/// later one does iff the sender changed or the time since the previous
/// message exceeds `gap`. Timestamps are compared as signed deltas, so an
/// out-of-order message (clock skew) continues the previous group rather
/// than breaking it.
pub fn group_boundaries(messages: &MessageList, gap: Duration) -> Vec<bool> {
    let mut flags = Vec::with_capacity(messages.len());
    let mut previous: Option<&Message> = None;
    for message in messages.iter() {
        flags.push(starts_group(previous, message, gap));
        previous = Some(message);
    }
    flags
}

/// The single-step rule behind [`group_boundaries`], for callers that keep
/// an incrementally appended boundary cache.
pub fn starts_group(previous: Option<&Message>, message: &Message, gap: Duration) -> bool {
    match previous {
        None => true,
        Some(previous) => {
            previous.sender.id != message.sender.id
                || message.created_at.signed_duration_since(previous.created_at) > gap
        }
    }
}
