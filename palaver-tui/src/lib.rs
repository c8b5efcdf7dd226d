//! Terminal adapter for the conversation core: a single-threaded event
//! loop over terminal input, the message stream, and highlight expiries.

use crossterm::event::{Event, KeyEventKind};
use futures::StreamExt;
use palaver_common::{Direction, HighlightToken, Message, ViewConfig};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

pub mod keymap;
mod message_list;

pub use message_list::{ClearSender, ConversationView};

use keymap::{KeyCode, KeyEvent, Keymap, Resolution};

/// How long a prefix of a multi-key sequence may sit in the buffer before
/// it is discarded.
const PENDING_KEY_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug)]
enum Action {
    Quit,
    OpenSearch,
    ClearSearch,
    NextMatch,
    PreviousMatch,
    SelectNext,
    SelectPrevious,
    JumpFirst,
    JumpLatest,
    FollowReply,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Browse,
    Search,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

fn default_keymap() -> Keymap<Action> {
    let mut keymap = Keymap::new();
    for (sequence, action) in [
        ("q", Action::Quit),
        ("/", Action::OpenSearch),
        ("<Esc>", Action::ClearSearch),
        ("n", Action::NextMatch),
        ("N", Action::PreviousMatch),
        ("j", Action::SelectNext),
        ("k", Action::SelectPrevious),
        ("gg", Action::JumpFirst),
        ("G", Action::JumpLatest),
        ("<CR>", Action::FollowReply),
    ] {
        keymap
            .bind(sequence, action)
            .expect("static key sequence parses");
    }
    keymap
}

struct App {
    view: ConversationView,
    keymap: Keymap<Action>,
    mode: Mode,
    pending: Vec<KeyEvent>,
    pending_since: Option<Instant>,
}

impl App {
    fn new(config: ViewConfig) -> Self {
        Self {
            view: ConversationView::new(config),
            keymap: default_keymap(),
            mode: Mode::Browse,
            pending: Vec::new(),
            pending_since: None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, clear_tx: &ClearSender) -> Flow {
        self.view.clear_notice();
        match self.mode {
            Mode::Search => {
                self.handle_search_key(key, clear_tx);
                Flow::Continue
            }
            Mode::Browse => self.handle_browse_key(key, clear_tx),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent, clear_tx: &ClearSender) {
        match key.code {
            // Leave the query and its results in place; `<Esc>` in browse
            // mode clears them.
            KeyCode::Escape => {
                self.mode = Mode::Browse;
                self.view.set_search_open(false);
            }
            KeyCode::Enter | KeyCode::Down => self.view.advance_search(Direction::Next, clear_tx),
            KeyCode::Up => self.view.advance_search(Direction::Previous, clear_tx),
            KeyCode::Backspace => self.view.pop_search_char(clear_tx),
            KeyCode::Char(c) => self.view.push_search_char(c, clear_tx),
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent, clear_tx: &ClearSender) -> Flow {
        self.pending.push(key);
        match self.keymap.resolve(&self.pending) {
            Resolution::Action(action) => {
                self.pending.clear();
                self.pending_since = None;
                self.run_action(action, clear_tx)
            }
            Resolution::Pending => {
                self.pending_since = Some(Instant::now());
                Flow::Continue
            }
            Resolution::Unbound => {
                self.pending.clear();
                self.pending_since = None;
                Flow::Continue
            }
        }
    }

    fn run_action(&mut self, action: Action, clear_tx: &ClearSender) -> Flow {
        match action {
            Action::Quit => return Flow::Quit,
            Action::OpenSearch => {
                self.mode = Mode::Search;
                self.view.set_search_open(true);
            }
            Action::ClearSearch => self.view.clear_search(clear_tx),
            Action::NextMatch => self.view.advance_search(Direction::Next, clear_tx),
            Action::PreviousMatch => self.view.advance_search(Direction::Previous, clear_tx),
            Action::SelectNext => self.view.select_next(),
            Action::SelectPrevious => self.view.select_previous(),
            Action::JumpFirst => self.view.jump_first(),
            Action::JumpLatest => self.view.jump_latest(clear_tx),
            Action::FollowReply => self.view.follow_reply(clear_tx),
        }
        Flow::Continue
    }

    fn flush_pending(&mut self) {
        self.pending.clear();
        self.pending_since = None;
    }
}

pub async fn run(
    config: ViewConfig,
    messages: mpsc::UnboundedReceiver<Message>,
) -> Result<(), Error> {
    let terminal = ratatui::init();
    let res = run_inner(terminal, config, messages).await;
    ratatui::restore();
    res
}

async fn run_inner(
    mut term: ratatui::DefaultTerminal,
    config: ViewConfig,
    mut messages: mpsc::UnboundedReceiver<Message>,
) -> Result<(), Error> {
    let mut app = App::new(config);
    let (clear_tx, mut clear_rx) = mpsc::unbounded_channel::<HighlightToken>();
    let mut term_events = crossterm::event::EventStream::new();

    loop {
        term.draw(|frame| frame.render_widget(&mut app.view, frame.area()))?;
        let flush_at = app.pending_since.map(|since| since + PENDING_KEY_TIMEOUT);
        tokio::select! {
            event = term_events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                    if app.handle_key(key.into(), &clear_tx) == Flow::Quit {
                        break;
                    }
                }
                Some(Ok(event)) => tracing::trace!("{event:?}"),
                Some(Err(err)) => tracing::warn!("{err}"),
                None => {
                    tracing::info!("term events stream stopped, shutting down");
                    break;
                }
            },
            message = messages.recv() => match message {
                Some(message) => app.view.insert(message, &clear_tx),
                None => {
                    tracing::info!("message stream stopped, shutting down");
                    break;
                }
            },
            Some(token) = clear_rx.recv() => {
                app.view.expire_highlight(token, &clear_tx);
            }
            () = sleep_until_flush(flush_at), if flush_at.is_some() => app.flush_pending(),
        }
    }
    Ok(())
}

async fn sleep_until_flush(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
