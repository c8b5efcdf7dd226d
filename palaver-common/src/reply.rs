//! The inline reply convention.
//!
//! Replies are encoded inside the message body itself, so any producer can
//! quote any message without protocol support:
//!
//! ```text
//! {reply text}\n> Em resposta a: {excerpt} [MSG_ID:{id}]
//! ```
//!
//! where `{excerpt}` is the first 100 characters of the quoted body, with a
//! trailing `...` if it was cut. The `[MSG_ID:...]` tag is stripped before
//! display and used to look the original message up again.

use crate::message::{Message, MessageId};

pub const REPLY_DELIMITER: &str = "\n> Em resposta a:";

/// Maximum number of characters quoted from the original message.
pub const EXCERPT_MAX_CHARS: usize = 100;

/// A message body split into its own text and, when the reply marker is
/// present, the quoted part.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedBody<'a> {
    pub main: &'a str,
    pub quoted: Option<Quoted>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Quoted {
    /// The quoted excerpt with the id tag removed. Surrounding whitespace is
    /// preserved except for the single space the encoding template inserts
    /// after the delimiter.
    pub excerpt: String,
    /// `None` when the tag is missing or malformed; the quote is still shown
    /// but offers no jump target.
    pub referenced: Option<MessageId>,
}

/// Encode `text` as a reply to `original`.
pub fn encode_reply(text: &str, original: &Message) -> String {
    let excerpt = quoted_excerpt(&original.body);
    format!("{text}{REPLY_DELIMITER} {excerpt} [MSG_ID:{}]", original.id)
}

fn quoted_excerpt(body: &str) -> String {
    let mut excerpt: String = body.chars().take(EXCERPT_MAX_CHARS).collect();
    if excerpt.len() < body.len() {
        excerpt.push_str("...");
    }
    excerpt
}

/// Split a message body at the reply marker.
///
/// Bodies without the marker come back whole, with `quoted: None`. This
/// never fails; a marker with a missing or mangled id tag still yields the
/// excerpt, just without a `referenced` id.
pub fn parse_reply(body: &str) -> ParsedBody<'_> {
    let Some(at) = body.find(REPLY_DELIMITER) else {
        return ParsedBody {
            main: body,
            quoted: None,
        };
    };
    let main = &body[..at];
    let mut segment = &body[at + REPLY_DELIMITER.len()..];
    // A quoted excerpt can itself contain the delimiter (replies to
    // replies); only the first segment belongs to this message's quote.
    if let Some(next) = segment.find(REPLY_DELIMITER) {
        segment = &segment[..next];
    }
    // The encoding template puts one space after the delimiter.
    let segment = segment.strip_prefix(' ').unwrap_or(segment);
    let (excerpt, referenced) = match extract_id_tag(segment) {
        Some((excerpt, id)) => (excerpt, Some(id)),
        None => (segment.to_owned(), None),
    };
    ParsedBody {
        main,
        quoted: Some(Quoted { excerpt, referenced }),
    }
}

/// Find and parse the `[MSG_ID:<digits>]` tag, returning the segment with
/// the tag removed alongside the id.
fn extract_id_tag(segment: &str) -> Option<(String, MessageId)> {
    let start = segment.find("[MSG_ID:")?;
    let (rest, id) = id_tag(&segment[start..]).ok()?;
    let mut stripped = String::with_capacity(segment.len());
    stripped.push_str(&segment[..start]);
    stripped.push_str(rest);
    Some((stripped, id))
}

fn id_tag(input: &str) -> nom::IResult<&str, MessageId> {
    use nom::{bytes::complete::tag, combinator::map, sequence::delimited};
    delimited(
        tag("[MSG_ID:"),
        map(nom::character::complete::u64, MessageId),
        tag("]"),
    )(input)
}
