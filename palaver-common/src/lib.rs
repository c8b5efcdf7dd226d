//! Platform-agnostic core of the conversation view: the message model, the
//! inline reply convention, grouping, in-conversation search, and the
//! highlight lifecycle. Everything here is synchronous and side-effect
//! free; rendering surfaces consume the [`ViewCommand`]s the core emits.

pub mod command;
pub mod group;
pub mod highlight;
pub mod message;
pub mod reply;
pub mod search;

pub use command::ViewCommand;
pub use highlight::{HighlightState, HighlightToken};
pub use message::{Attachment, Message, MessageId, MessageList, User};
pub use reply::{encode_reply, parse_reply, ParsedBody, Quoted};
pub use search::{Direction, SearchState};

/// Tunables for a conversation view.
#[derive(Clone, Copy, Debug)]
pub struct ViewConfig {
    /// Quiet time after which the next message starts a new visual group.
    pub group_gap: chrono::Duration,
    /// How long a jumped-to message stays highlighted.
    pub highlight_clear: std::time::Duration,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            group_gap: chrono::Duration::minutes(5),
            highlight_clear: std::time::Duration::from_secs(2),
        }
    }
}
