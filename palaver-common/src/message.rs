use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Server-assigned message identifier. Ids are unique and increase
/// monotonically in the order messages were created.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: u64,
    pub display_name: Arc<str>,
}

#[derive(Clone, Debug)]
pub struct Attachment {
    pub filename: Arc<str>,
    pub url: Arc<str>,
}

/// A single chat message. Messages are immutable once created; edits are
/// not modeled.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: MessageId,
    pub sender: User,
    pub body: Arc<str>,
    pub created_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
}

/// The currently loaded window of a conversation, in chronological order.
///
/// Append-only: the view never edits or removes messages, and search match
/// positions are indices into this list.
#[derive(Clone, Debug, Default)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Index of the message with the given id, if it is currently loaded.
    /// Older messages may have scrolled out of the window, so `None` is an
    /// ordinary outcome.
    pub fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|message| message.id == id)
    }
}
