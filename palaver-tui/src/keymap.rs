use std::{cmp, collections::BTreeMap};

use crossterm::event::KeyModifiers;

// resolving a key press needs more than the key itself:
// - multi-key sequences ("gg") mean a press can be a prefix rather than a
//   binding, so the app buffers pending keys
// - buffered prefixes expire; the event loop owns the timeout and calls
//   back into the map with the buffer each time it grows

/// Parse a key-sequence notation string, e.g. `"gg"`, `"<Esc>"`, `"<C-n>"`.
pub fn parse_key_sequence(input: &str) -> Result<Vec<KeyEvent>, nom::error::Error<&str>> {
    use nom::Finish;
    nom::multi::many1(parse_key)(input).finish().map(|(_, k)| k)
}

fn parse_key(input: &str) -> nom::IResult<&str, KeyEvent> {
    use nom::{
        branch::alt,
        bytes::complete::tag,
        character::complete::one_of,
        combinator::map,
        sequence::{delimited, separated_pair},
    };

    let key = alt((KeyCode::parse_char, KeyCode::parse_special));
    let modifiers = nom::multi::fold_many1(
        map(one_of("ACMS"), |c| match c {
            'A' => KeyModifiers::ALT,
            'C' => KeyModifiers::CONTROL,
            'M' => KeyModifiers::META,
            'S' => KeyModifiers::SHIFT,
            _ => unreachable!(),
        }),
        KeyModifiers::empty,
        KeyModifiers::union,
    );

    let bracketed = alt((
        map(
            separated_pair(modifiers, tag("-"), key),
            |(modifiers, code)| KeyEvent { modifiers, code },
        ),
        map(KeyCode::parse_special, KeyEvent::from),
    ));
    alt((
        delimited(tag("<"), bracketed, tag(">")),
        map(KeyCode::parse_char, KeyEvent::from),
    ))(input)
}

#[derive(Clone, Copy, Debug, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl From<KeyCode> for KeyEvent {
    fn from(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::empty(),
        }
    }
}

impl From<crossterm::event::KeyEvent> for KeyEvent {
    fn from(event: crossterm::event::KeyEvent) -> Self {
        let code = KeyCode::from(event.code);
        // The char already encodes case; keeping SHIFT around would make
        // `Char('N')` unmatchable by the `"N"` notation.
        let modifiers = if matches!(code, KeyCode::Char(_)) {
            event.modifiers.difference(KeyModifiers::SHIFT)
        } else {
            event.modifiers
        };
        Self { code, modifiers }
    }
}

// manually impl `Ord` since `KeyModifiers` isn't `Ord`
// https://github.com/crossterm-rs/crossterm/pull/951
impl Ord for KeyEvent {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.code
            .cmp(&other.code)
            .then(self.modifiers.bits().cmp(&other.modifiers.bits()))
    }
}

impl PartialOrd for KeyEvent {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == cmp::Ordering::Equal
    }
}

// Our own version of `crossterm::event::KeyCode`
// https://github.com/crossterm-rs/crossterm/pull/951
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum KeyCode {
    Char(char),
    Backspace,
    Delete,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Tab,
    Escape,
    Unknown,
}

impl KeyCode {
    fn parse_char(input: &str) -> nom::IResult<&str, Self> {
        nom::combinator::map(
            nom::character::complete::satisfy(|c| {
                nom_unicode::is_alphanumeric(c)
                    || matches!(c, '/' | '?' | '.' | ',' | ';' | ':' | '-' | '_')
            }),
            Self::Char,
        )(input)
    }

    fn parse_special(input: &str) -> nom::IResult<&str, Self> {
        use nom::{bytes::complete::tag, combinator::value};
        nom::branch::alt((
            value(Self::Backspace, tag("BS")),
            value(Self::Delete, tag("Del")),
            value(Self::Enter, tag("CR")),
            value(Self::Left, tag("Left")),
            value(Self::Right, tag("Right")),
            value(Self::Up, tag("Up")),
            value(Self::Down, tag("Down")),
            value(Self::Home, tag("Home")),
            value(Self::End, tag("End")),
            value(Self::PageUp, tag("PageUp")),
            value(Self::PageDown, tag("PageDown")),
            value(Self::Tab, tag("Tab")),
            value(Self::Escape, tag("Esc")),
        ))(input)
    }
}

impl From<crossterm::event::KeyCode> for KeyCode {
    fn from(code: crossterm::event::KeyCode) -> Self {
        use crossterm::event::KeyCode as Kc;
        match code {
            Kc::Char(c) => Self::Char(c),
            Kc::Backspace => Self::Backspace,
            Kc::Delete => Self::Delete,
            Kc::Enter => Self::Enter,
            Kc::Left => Self::Left,
            Kc::Right => Self::Right,
            Kc::Up => Self::Up,
            Kc::Down => Self::Down,
            Kc::Home => Self::Home,
            Kc::End => Self::End,
            Kc::PageUp => Self::PageUp,
            Kc::PageDown => Self::PageDown,
            Kc::Tab => Self::Tab,
            Kc::Esc => Self::Escape,
            _ => Self::Unknown,
        }
    }
}

/// Outcome of feeding the pending key buffer to a [`Keymap`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution<A> {
    /// The buffer is exactly a binding.
    Action(A),
    /// The buffer is a strict prefix of at least one binding; wait for more
    /// keys (or a timeout).
    Pending,
    /// The buffer is not a prefix of any binding.
    Unbound,
}

#[derive(Clone, Debug)]
pub struct Keymap<A> {
    keys: BTreeMap<Vec<KeyEvent>, A>,
}

impl<A> Default for Keymap<A> {
    fn default() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }
}

impl<A> Keymap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `sequence` (in key notation) to `action`, replacing any
    /// previous binding.
    pub fn bind<'s>(
        &mut self,
        sequence: &'s str,
        action: A,
    ) -> Result<(), nom::error::Error<&'s str>> {
        let keys = parse_key_sequence(sequence)?;
        self.keys.insert(keys, action);
        Ok(())
    }

    /// Resolve a buffered key sequence against the bindings.
    pub fn resolve(&self, keys: &[KeyEvent]) -> Resolution<A>
    where
        A: Clone,
    {
        use std::ops::Bound;

        let mut entries = self
            .keys
            .range::<[KeyEvent], _>((Bound::Included(keys), Bound::Unbounded))
            .take_while(|(bound, _)| bound.starts_with(keys));
        match entries.next() {
            Some((bound, action)) if bound.as_slice() == keys => Resolution::Action(action.clone()),
            Some(_) => Resolution::Pending,
            None => Resolution::Unbound,
        }
    }
}
