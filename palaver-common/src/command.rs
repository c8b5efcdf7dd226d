use std::time::Duration;

use crate::highlight::HighlightToken;
use crate::message::MessageId;

/// An intent emitted by the core toward whatever is rendering the
/// conversation. The core never touches the screen itself; an adapter (a
/// terminal UI here, a DOM or native view elsewhere) fulfills these.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ViewCommand {
    /// Bring the message into view, centered if the surface allows it.
    /// Idempotent; a later request supersedes an in-flight one.
    ScrollToMessage(MessageId),
    /// Follow-mode scroll to the newest message.
    ScrollToBottom,
    /// Apply the highlight treatment to a message. When `clear_after` is
    /// set the adapter schedules an expiry and reports the token back; the
    /// core ignores tokens that have since been superseded.
    Highlight {
        id: MessageId,
        token: HighlightToken,
        clear_after: Option<Duration>,
    },
    /// Remove the highlight treatment, if the message still carries it.
    ClearHighlight(MessageId),
    /// A user-visible, non-fatal notice ("message not found", etc.).
    Notice(String),
}
