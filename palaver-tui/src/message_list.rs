use palaver_common::{
    group, parse_reply, Direction, HighlightState, HighlightToken, Message, MessageId,
    MessageList, SearchState, ViewCommand, ViewConfig,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};
use tokio::sync::mpsc;

/// Channel on which scheduled highlight expiries report back.
pub type ClearSender = mpsc::UnboundedSender<HighlightToken>;

/// The conversation surface: owns the loaded message window plus the
/// derived view state (group boundaries, search, highlight, selection) and
/// fulfills the [`ViewCommand`]s the core emits.
#[derive(Debug)]
pub struct ConversationView {
    config: ViewConfig,
    messages: MessageList,
    // One flag per message, appended as messages arrive.
    boundaries: Vec<bool>,
    search: SearchState,
    highlight: HighlightState,
    highlighted: Option<MessageId>,
    list_state: ListState,
    search_open: bool,
    follow: bool,
    unseen: usize,
    notice: Option<String>,
}

impl ConversationView {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            messages: MessageList::new(),
            boundaries: Vec::new(),
            search: SearchState::new(),
            highlight: HighlightState::new(),
            highlighted: None,
            list_state: ListState::default(),
            search_open: false,
            follow: true,
            unseen: 0,
            notice: None,
        }
    }

    pub fn messages(&self) -> &MessageList {
        &self.messages
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn highlighted(&self) -> Option<MessageId> {
        self.highlighted
    }

    pub fn selected(&self) -> Option<usize> {
        self.list_state.selected()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn unseen(&self) -> usize {
        self.unseen
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn set_search_open(&mut self, open: bool) {
        self.search_open = open;
    }

    /// A new message arrived. Extends the boundary cache, re-runs any live
    /// search (the cursor resets to the first match), and either follows
    /// the tail or counts the arrival as unseen.
    pub fn insert(&mut self, message: Message, clear_tx: &ClearSender) {
        let starts = group::starts_group(self.messages.last(), &message, self.config.group_gap);
        self.boundaries.push(starts);
        self.messages.push(message);
        if self.search.is_active() {
            match self.search.refresh(&self.messages) {
                Some(index) => self.focus_match(index, clear_tx),
                None => {
                    let commands = self.highlight.clear().into_iter().collect();
                    self.apply(commands, clear_tx);
                }
            }
        } else if self.follow {
            self.apply(vec![ViewCommand::ScrollToBottom], clear_tx);
        } else {
            self.unseen += 1;
        }
    }

    /// Replace the search query (called per keystroke).
    pub fn edit_search(&mut self, query: String, clear_tx: &ClearSender) {
        match self.search.set_query(query, &self.messages) {
            Some(index) => self.focus_match(index, clear_tx),
            None => {
                let commands = self.highlight.clear().into_iter().collect();
                self.apply(commands, clear_tx);
            }
        }
    }

    pub fn push_search_char(&mut self, c: char, clear_tx: &ClearSender) {
        let mut query = self.search.query().to_owned();
        query.push(c);
        self.edit_search(query, clear_tx);
    }

    pub fn pop_search_char(&mut self, clear_tx: &ClearSender) {
        let mut query = self.search.query().to_owned();
        query.pop();
        self.edit_search(query, clear_tx);
    }

    /// Drop the query, its results, and any search highlight.
    pub fn clear_search(&mut self, clear_tx: &ClearSender) {
        self.search.reset();
        self.search_open = false;
        let commands = self.highlight.clear().into_iter().collect();
        self.apply(commands, clear_tx);
    }

    /// Step to the next or previous match, wrapping circularly.
    pub fn advance_search(&mut self, direction: Direction, clear_tx: &ClearSender) {
        if let Some(index) = self.search.advance(direction) {
            self.focus_match(index, clear_tx);
        }
    }

    /// Jump to the message the selected reply quotes, if it is loaded.
    /// A missing target is an expected outcome and surfaces as a notice.
    pub fn follow_reply(&mut self, clear_tx: &ClearSender) {
        let Some(index) = self.list_state.selected() else {
            return;
        };
        let Some(message) = self.messages.get(index) else {
            return;
        };
        let referenced = parse_reply(&message.body)
            .quoted
            .and_then(|quoted| quoted.referenced);
        // A quote without a resolvable id offers no jump.
        let Some(id) = referenced else {
            return;
        };
        if self.messages.position(id).is_some() {
            let mut commands = self.highlight.begin(id, Some(self.config.highlight_clear));
            commands.push(ViewCommand::ScrollToMessage(id));
            self.apply(commands, clear_tx);
        } else {
            tracing::debug!("reply target {id} is not loaded");
            self.apply(
                vec![ViewCommand::Notice(
                    "Original message not found. It may have been removed or not yet loaded."
                        .to_owned(),
                )],
                clear_tx,
            );
        }
    }

    /// A highlight expiry timer fired; stale tokens are ignored.
    pub fn expire_highlight(&mut self, token: HighlightToken, clear_tx: &ClearSender) {
        let commands = self.highlight.expire(token).into_iter().collect();
        self.apply(commands, clear_tx);
    }

    pub fn select_next(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        let last = self.messages.len() - 1;
        let next = match self.list_state.selected() {
            Some(index) => (index + 1).min(last),
            None => last,
        };
        self.list_state.select(Some(next));
        self.set_follow(next == last);
    }

    pub fn select_previous(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        let previous = match self.list_state.selected() {
            Some(index) => index.saturating_sub(1),
            None => self.messages.len() - 1,
        };
        self.list_state.select(Some(previous));
        self.set_follow(previous + 1 == self.messages.len());
    }

    pub fn jump_first(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        self.list_state.select(Some(0));
        self.set_follow(self.messages.len() == 1);
    }

    pub fn jump_latest(&mut self, clear_tx: &ClearSender) {
        self.apply(vec![ViewCommand::ScrollToBottom], clear_tx);
    }

    fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
        if follow {
            self.unseen = 0;
        }
    }

    fn focus_match(&mut self, index: usize, clear_tx: &ClearSender) {
        let Some(id) = self.messages.get(index).map(|message| message.id) else {
            return;
        };
        // Search highlights persist until replaced or the search is
        // cleared; only reply jumps carry an auto-clear.
        let mut commands = self.highlight.begin(id, None);
        commands.push(ViewCommand::ScrollToMessage(id));
        self.apply(commands, clear_tx);
    }

    /// Fulfill core-emitted commands against this surface.
    fn apply(&mut self, commands: Vec<ViewCommand>, clear_tx: &ClearSender) {
        for command in commands {
            match command {
                ViewCommand::ScrollToMessage(id) => {
                    if let Some(index) = self.messages.position(id) {
                        self.list_state.select(Some(index));
                        self.set_follow(index + 1 == self.messages.len());
                    }
                }
                ViewCommand::ScrollToBottom => {
                    if !self.messages.is_empty() {
                        self.list_state.select(Some(self.messages.len() - 1));
                    }
                    self.set_follow(true);
                }
                ViewCommand::Highlight {
                    id,
                    token,
                    clear_after,
                } => {
                    self.highlighted = Some(id);
                    if let Some(after) = clear_after {
                        let clear_tx = clear_tx.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(after).await;
                            let _ = clear_tx.send(token);
                        });
                    }
                }
                ViewCommand::ClearHighlight(id) => {
                    if self.highlighted == Some(id) {
                        self.highlighted = None;
                    }
                }
                ViewCommand::Notice(text) => self.notice = Some(text),
            }
        }
    }

    fn search_bar(&self) -> Line<'_> {
        let counter = match self.search.position() {
            Some((current, total)) => format!("  {current}/{total}"),
            None if self.search.is_active() => "  no matches".to_owned(),
            None => String::new(),
        };
        Line::from(vec![
            Span::styled("/", Style::new().fg(Color::Yellow)),
            Span::raw(self.search.query().to_owned()),
            Span::styled(counter, Style::new().add_modifier(Modifier::DIM)),
        ])
    }

    fn status_line(&self) -> Line<'_> {
        if let Some(notice) = &self.notice {
            Line::styled(notice.clone(), Style::new().fg(Color::Yellow))
        } else if !self.follow && self.unseen > 0 {
            Line::styled(
                format!("{} new messages (G to follow)", self.unseen),
                Style::new().add_modifier(Modifier::DIM),
            )
        } else {
            Line::raw("")
        }
    }

    fn message_item(&self, index: usize, message: &Message) -> ListItem<'static> {
        let mut lines = Vec::new();
        if self.boundaries.get(index).copied().unwrap_or(true) {
            lines.push(Line::from(vec![
                Span::styled(
                    message.sender.display_name.to_string(),
                    Style::new().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {}", message.created_at.format("%H:%M")),
                    Style::new().add_modifier(Modifier::DIM),
                ),
            ]));
        }
        let parsed = parse_reply(&message.body);
        if let Some(quoted) = &parsed.quoted {
            lines.push(Line::styled(
                format!("> {}", quoted.excerpt),
                Style::new().add_modifier(Modifier::DIM | Modifier::ITALIC),
            ));
        }
        for line in parsed.main.lines() {
            lines.push(Line::raw(line.to_owned()));
        }
        for attachment in &message.attachments {
            lines.push(Line::styled(
                format!("[file] {} <{}>", attachment.filename, attachment.url),
                Style::new().fg(Color::Cyan),
            ));
        }
        let mut item = ListItem::new(Text::from(lines));
        if self.highlighted == Some(message.id) {
            item = item.style(Style::new().bg(Color::Yellow).fg(Color::Black));
        }
        item
    }
}

impl Widget for &mut ConversationView {
    fn render(self, area: Rect, buffer: &mut Buffer) {
        let search_height = u16::from(self.search_open || self.search.is_active());
        let [search_area, list_area, status_area] = Layout::vertical([
            Constraint::Length(search_height),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if search_height > 0 {
            Paragraph::new(self.search_bar()).render(search_area, buffer);
        }

        if self.messages.is_empty() {
            Paragraph::new("No messages yet")
                .alignment(Alignment::Center)
                .render(list_area, buffer);
        } else {
            let items = self
                .messages
                .iter()
                .enumerate()
                .map(|(index, message)| self.message_item(index, message))
                .collect::<Vec<_>>();
            let list = List::new(items).highlight_symbol("> ");
            StatefulWidget::render(list, list_area, buffer, &mut self.list_state);
        }

        Paragraph::new(self.status_line()).render(status_area, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn message(id: u64, sender: u64, at_secs: i64, body: &str) -> Message {
        Message {
            id: MessageId(id),
            sender: palaver_common::User {
                id: sender,
                display_name: Arc::from(if sender == 1 { "alice" } else { "bob" }),
            },
            body: Arc::from(body),
            created_at: Utc.timestamp_opt(at_secs, 0).unwrap(),
            attachments: Vec::new(),
        }
    }

    fn view_with(
        bodies: &[(u64, u64, i64, &str)],
    ) -> (
        ConversationView,
        ClearSender,
        mpsc::UnboundedReceiver<HighlightToken>,
    ) {
        let (clear_tx, clear_rx) = mpsc::unbounded_channel();
        let mut view = ConversationView::new(ViewConfig::default());
        for &(id, sender, at, body) in bodies {
            view.insert(message(id, sender, at, body), &clear_tx);
        }
        (view, clear_tx, clear_rx)
    }

    #[test]
    fn follows_the_tail_while_at_the_bottom() {
        let (view, _tx, _rx) = view_with(&[(1, 1, 0, "a"), (2, 1, 10, "b"), (3, 2, 20, "c")]);
        assert_eq!(view.selected(), Some(2));
        assert_eq!(view.unseen(), 0);
    }

    #[test]
    fn arrivals_while_scrolled_up_count_as_unseen() {
        let (mut view, tx, _rx) = view_with(&[(1, 1, 0, "a"), (2, 1, 10, "b")]);
        view.select_previous();
        assert_eq!(view.selected(), Some(0));
        view.insert(message(3, 2, 20, "c"), &tx);
        view.insert(message(4, 2, 30, "d"), &tx);
        // The view stays put and counts what arrived.
        assert_eq!(view.selected(), Some(0));
        assert_eq!(view.unseen(), 2);
        view.jump_latest(&tx);
        assert_eq!(view.selected(), Some(3));
        assert_eq!(view.unseen(), 0);
    }

    #[test]
    fn scrolling_to_the_same_message_twice_is_idempotent() {
        let (mut view, tx, _rx) = view_with(&[(1, 1, 0, "a"), (2, 1, 10, "b"), (3, 2, 20, "c")]);
        view.apply(vec![ViewCommand::ScrollToMessage(MessageId(2))], &tx);
        let first = view.selected();
        view.apply(vec![ViewCommand::ScrollToMessage(MessageId(2))], &tx);
        assert_eq!(view.selected(), first);
        assert_eq!(view.selected(), Some(1));
    }

    #[test]
    fn typing_a_query_highlights_and_scrolls_to_the_first_match() {
        let (mut view, tx, _rx) = view_with(&[
            (1, 1, 0, "Hello world"),
            (2, 2, 10, "nothing here"),
            (3, 1, 20, "HELLO again"),
        ]);
        view.set_search_open(true);
        for c in "hello".chars() {
            view.push_search_char(c, &tx);
        }
        assert_eq!(view.search().matches(), &[0, 2]);
        assert_eq!(view.selected(), Some(0));
        assert_eq!(view.highlighted(), Some(MessageId(1)));
        // Advancing moves the highlight to the next match.
        view.advance_search(Direction::Next, &tx);
        assert_eq!(view.selected(), Some(2));
        assert_eq!(view.highlighted(), Some(MessageId(3)));
    }

    #[test]
    fn clearing_the_search_drops_the_highlight() {
        let (mut view, tx, _rx) = view_with(&[(1, 1, 0, "Hello")]);
        view.push_search_char('h', &tx);
        assert_eq!(view.highlighted(), Some(MessageId(1)));
        view.clear_search(&tx);
        assert_eq!(view.highlighted(), None);
        assert!(!view.search().is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn reply_jump_highlights_then_expires() {
        let original = message(1, 1, 0, "Hello");
        let reply_body = palaver_common::encode_reply("Hi back", &original);
        let (clear_tx, mut clear_rx) = mpsc::unbounded_channel();
        let mut view = ConversationView::new(ViewConfig::default());
        view.insert(original, &clear_tx);
        view.insert(message(2, 2, 30, &reply_body), &clear_tx);

        // Selection follows the tail, so the reply is selected.
        view.follow_reply(&clear_tx);
        assert_eq!(view.selected(), Some(0));
        assert_eq!(view.highlighted(), Some(MessageId(1)));

        // Paused time fast-forwards through the auto-clear sleep.
        let token = clear_rx.recv().await.expect("expiry scheduled");
        view.expire_highlight(token, &clear_tx);
        assert_eq!(view.highlighted(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_expiry_leaves_a_newer_highlight_alone() {
        let first = message(1, 1, 0, "one");
        let second = message(2, 1, 10, "two");
        let reply_to_first = palaver_common::encode_reply("re", &first);
        let reply_to_second = palaver_common::encode_reply("re", &second);
        let (clear_tx, mut clear_rx) = mpsc::unbounded_channel();
        let mut view = ConversationView::new(ViewConfig::default());
        view.insert(first, &clear_tx);
        view.insert(second, &clear_tx);
        view.insert(message(3, 2, 20, &reply_to_first), &clear_tx);
        view.insert(message(4, 2, 30, &reply_to_second), &clear_tx);

        view.apply(vec![ViewCommand::ScrollToMessage(MessageId(3))], &clear_tx);
        view.follow_reply(&clear_tx);
        let stale = clear_rx.recv().await.expect("first expiry");

        view.apply(vec![ViewCommand::ScrollToMessage(MessageId(4))], &clear_tx);
        view.follow_reply(&clear_tx);
        assert_eq!(view.highlighted(), Some(MessageId(2)));

        // The first timer fires after its highlight was superseded.
        view.expire_highlight(stale, &clear_tx);
        assert_eq!(view.highlighted(), Some(MessageId(2)));
    }

    #[test]
    fn missing_reply_target_surfaces_a_notice() {
        let ghost = message(99, 1, 0, "long gone");
        let reply_body = palaver_common::encode_reply("re", &ghost);
        let (clear_tx, _clear_rx) = mpsc::unbounded_channel();
        let mut view = ConversationView::new(ViewConfig::default());
        view.insert(message(1, 1, 0, "hi"), &clear_tx);
        view.insert(message(2, 2, 10, &reply_body), &clear_tx);

        view.follow_reply(&clear_tx);
        assert!(view.notice().is_some());
        assert_eq!(view.highlighted(), None);
        // Still a handled outcome: the view keeps working.
        assert_eq!(view.selected(), Some(1));
    }

    #[test]
    fn consecutive_messages_from_one_sender_share_a_header() {
        let (mut view, _tx, _rx) = view_with(&[(1, 1, 0, "first"), (2, 1, 30, "second")]);
        let backend = ratatui::backend::TestBackend::new(40, 10);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| frame.render_widget(&mut view, frame.area()))
            .unwrap();
        let content = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert_eq!(content.matches("alice").count(), 1);
        assert!(content.contains("first"));
        assert!(content.contains("second"));
    }
}
