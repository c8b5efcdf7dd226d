//! Highlight lifecycle.
//!
//! At most one message carries the highlight treatment at a time. Jump
//! highlights auto-clear after a configurable delay, and the delay timer
//! races against newer highlight requests: a token minted per highlight
//! lets the expiry of a superseded highlight be told apart from the expiry
//! of the current one.

use std::time::Duration;

use crate::command::ViewCommand;
use crate::message::MessageId;

/// Handle identifying one particular highlight. Tokens are assigned
/// monotonically and never reused within a session.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HighlightToken(u64);

#[derive(Debug, Default)]
pub struct HighlightState {
    next_token: u64,
    current: Option<(MessageId, HighlightToken)>,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The message currently highlighted, if any.
    pub fn current(&self) -> Option<MessageId> {
        self.current.map(|(id, _)| id)
    }

    /// Start highlighting `id`, superseding any current highlight.
    ///
    /// Emits the clear for the old highlight before the new highlight so
    /// the adapter never shows two at once. `clear_after` asks the adapter
    /// to schedule an expiry for the returned token.
    pub fn begin(&mut self, id: MessageId, clear_after: Option<Duration>) -> Vec<ViewCommand> {
        let token = HighlightToken(self.next_token);
        self.next_token += 1;
        let mut commands = Vec::with_capacity(2);
        if let Some((old, _)) = self.current.take() {
            commands.push(ViewCommand::ClearHighlight(old));
        }
        self.current = Some((id, token));
        commands.push(ViewCommand::Highlight {
            id,
            token,
            clear_after,
        });
        commands
    }

    /// An expiry timer fired. Clears the highlight only if `token` still
    /// names the current one; a stale timer is a no-op.
    pub fn expire(&mut self, token: HighlightToken) -> Option<ViewCommand> {
        match self.current {
            Some((id, current)) if current == token => {
                self.current = None;
                Some(ViewCommand::ClearHighlight(id))
            }
            _ => None,
        }
    }

    /// Drop the current highlight, if any.
    pub fn clear(&mut self) -> Option<ViewCommand> {
        self.current
            .take()
            .map(|(id, _)| ViewCommand::ClearHighlight(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_of(commands: &[ViewCommand]) -> HighlightToken {
        commands
            .iter()
            .find_map(|command| match command {
                ViewCommand::Highlight { token, .. } => Some(*token),
                _ => None,
            })
            .expect("begin emits a highlight")
    }

    #[test]
    fn begin_clears_the_previous_highlight_first() {
        let mut state = HighlightState::new();
        state.begin(MessageId(1), None);
        let commands = state.begin(MessageId(2), None);
        assert_eq!(commands[0], ViewCommand::ClearHighlight(MessageId(1)));
        assert!(matches!(
            commands[1],
            ViewCommand::Highlight {
                id: MessageId(2),
                ..
            }
        ));
        assert_eq!(state.current(), Some(MessageId(2)));
    }

    #[test]
    fn stale_timer_does_not_clear_a_newer_highlight() {
        let mut state = HighlightState::new();
        let first = token_of(&state.begin(MessageId(1), Some(Duration::from_secs(2))));
        let second = token_of(&state.begin(MessageId(2), Some(Duration::from_secs(2))));
        // The first timer fires late, after its highlight was superseded.
        assert_eq!(state.expire(first), None);
        assert_eq!(state.current(), Some(MessageId(2)));
        assert_eq!(
            state.expire(second),
            Some(ViewCommand::ClearHighlight(MessageId(2)))
        );
        assert_eq!(state.current(), None);
    }

    #[test]
    fn expire_after_clear_is_a_no_op() {
        let mut state = HighlightState::new();
        let token = token_of(&state.begin(MessageId(1), Some(Duration::from_secs(2))));
        assert_eq!(
            state.clear(),
            Some(ViewCommand::ClearHighlight(MessageId(1)))
        );
        assert_eq!(state.expire(token), None);
    }
}
