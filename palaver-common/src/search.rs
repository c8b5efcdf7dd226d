//! In-conversation substring search.
//!
//! The match set is recomputed in full whenever the query or the message
//! list changes; per keystroke this is O(messages × query), which is fine
//! for the bounded windows a conversation view actually holds. An
//! unbounded history would want an incremental index instead.

use crate::message::MessageList;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Next,
    Previous,
}

/// Live search state: the query, the ordered match set (indices into the
/// message list), and the cursor within it.
///
/// `Idle` is simply an empty (after trimming) query; there are no failure
/// states, and an empty match set is a valid place to rest.
#[derive(Clone, Debug, Default)]
pub struct SearchState {
    query: String,
    matches: Vec<usize>,
    cursor: Option<usize>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether a search is in progress (non-whitespace query).
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Message indices matching the current query, in chronological order.
    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// One-based cursor position and total, for a "3/7" style counter.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.cursor.map(|cursor| (cursor + 1, self.matches.len()))
    }

    /// The message index of the currently selected match.
    pub fn selected(&self) -> Option<usize> {
        self.cursor.map(|cursor| self.matches[cursor])
    }

    /// Replace the query and recompute. Returns the message index to focus
    /// (the first match), or `None` when the search is idle or empty.
    pub fn set_query(&mut self, query: impl Into<String>, messages: &MessageList) -> Option<usize> {
        self.query = query.into();
        self.recompute(messages);
        self.selected()
    }

    /// The message list changed; recompute with the same query. The cursor
    /// always resets to the first match, even if its old value would still
    /// be in range.
    pub fn refresh(&mut self, messages: &MessageList) -> Option<usize> {
        self.recompute(messages);
        self.selected()
    }

    /// Move the cursor circularly through the match set. A no-op while the
    /// match set is empty.
    pub fn advance(&mut self, direction: Direction) -> Option<usize> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let cursor = self.cursor.unwrap_or(0);
        self.cursor = Some(match direction {
            Direction::Next => (cursor + 1) % len,
            Direction::Previous => (cursor + len - 1) % len,
        });
        self.selected()
    }

    /// Drop the query and all results.
    pub fn reset(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.cursor = None;
    }

    fn recompute(&mut self, messages: &MessageList) {
        self.matches.clear();
        if self.is_active() {
            // Emptiness is judged on the trimmed query, but matching uses
            // the query as typed.
            let needle = self.query.to_lowercase();
            self.matches.extend(
                messages
                    .iter()
                    .enumerate()
                    .filter(|(_, message)| message.body.to_lowercase().contains(&needle))
                    .map(|(index, _)| index),
            );
        }
        self.cursor = if self.matches.is_empty() { None } else { Some(0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, MessageId, User};
    use chrono::Utc;
    use std::sync::Arc;

    fn list(bodies: &[&str]) -> MessageList {
        let mut messages = MessageList::new();
        for (i, body) in bodies.iter().enumerate() {
            messages.push(Message {
                id: MessageId(i as u64 + 1),
                sender: User {
                    id: 1,
                    display_name: Arc::from("alice"),
                },
                body: Arc::from(*body),
                created_at: Utc::now(),
                attachments: Vec::new(),
            });
        }
        messages
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let messages = list(&["Hello World", "goodbye", "HELLO there"]);
        let mut search = SearchState::new();
        let focus = search.set_query("hello", &messages);
        assert_eq!(search.matches(), &[0, 2]);
        assert_eq!(focus, Some(0));
        assert_eq!(search.position(), Some((1, 2)));
    }

    #[test]
    fn whitespace_query_goes_idle() {
        let messages = list(&["Hello World"]);
        let mut search = SearchState::new();
        search.set_query("hello", &messages);
        let focus = search.set_query("   ", &messages);
        assert!(!search.is_active());
        assert!(search.matches().is_empty());
        assert_eq!(search.cursor(), None);
        assert_eq!(focus, None);
    }

    #[test]
    fn cursor_wraps_in_both_directions() {
        let messages = list(&["x a", "b", "x c", "d", "e", "x f"]);
        let mut search = SearchState::new();
        search.set_query("x", &messages);
        assert_eq!(search.matches(), &[0, 2, 5]);
        // Walk to the last match, then wrap forward.
        assert_eq!(search.advance(Direction::Next), Some(2));
        assert_eq!(search.advance(Direction::Next), Some(5));
        assert_eq!(search.advance(Direction::Next), Some(0));
        // And wrap backward from the first.
        assert_eq!(search.advance(Direction::Previous), Some(5));
    }

    #[test]
    fn advance_on_empty_matches_is_a_no_op() {
        let messages = list(&["a", "b"]);
        let mut search = SearchState::new();
        search.set_query("zzz", &messages);
        assert_eq!(search.advance(Direction::Next), None);
        assert_eq!(search.advance(Direction::Previous), None);
        assert_eq!(search.cursor(), None);
    }

    #[test]
    fn recompute_resets_the_cursor_even_when_still_in_range() {
        let mut messages = list(&["x a", "x b", "x c"]);
        let mut search = SearchState::new();
        search.set_query("x", &messages);
        search.advance(Direction::Next);
        search.advance(Direction::Next);
        assert_eq!(search.cursor(), Some(2));
        // A new arrival triggers a refresh; cursor 2 would still be valid
        // but must reset to the first match.
        messages.push(Message {
            id: MessageId(99),
            sender: User {
                id: 1,
                display_name: Arc::from("alice"),
            },
            body: Arc::from("x d"),
            created_at: Utc::now(),
            attachments: Vec::new(),
        });
        let focus = search.refresh(&messages);
        assert_eq!(search.matches(), &[0, 1, 2, 3]);
        assert_eq!(search.cursor(), Some(0));
        assert_eq!(focus, Some(0));
    }

    #[test]
    fn refresh_with_no_matches_parks_the_cursor() {
        let messages = list(&["a"]);
        let mut search = SearchState::new();
        search.set_query("a", &messages);
        assert_eq!(search.cursor(), Some(0));
        search.set_query("ab", &messages);
        assert_eq!(search.cursor(), None);
        assert_eq!(search.selected(), None);
    }
}
