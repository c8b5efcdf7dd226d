//! A stand-in message source: pushes generated messages over a channel the
//! way a real backend would, including inline-encoded replies and file
//! attachments, so the whole view pipeline can be exercised offline.

use std::sync::Arc;

use chrono::Utc;
use palaver_common::{encode_reply, Attachment, Message, MessageId, User};
use rand::prelude::{Rng, SliceRandom};
use uuid::Uuid;

const USER_NAMES: &[&str] = &["alice", "bob", "charlie", "dana"];

const REPLY_CHANCE: f64 = 0.2;
const ATTACHMENT_CHANCE: f64 = 0.1;

pub async fn message_sender(channel: tokio::sync::mpsc::UnboundedSender<Message>) {
    let users = USER_NAMES
        .iter()
        .enumerate()
        .map(|(index, name)| User {
            id: index as u64 + 1,
            display_name: Arc::from(*name),
        })
        .collect::<Vec<_>>();

    // The source plays the server, so it owns id assignment.
    let mut next_id = 1;
    let mut history = Vec::new();
    loop {
        let (message, millis) = generate_message(&users, &history, &mut next_id);
        history.push(message.clone());
        if channel.send(message).is_err() {
            return;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(millis)).await;
    }
}

fn generate_message(users: &[User], history: &[Message], next_id: &mut u64) -> (Message, u64) {
    const MIN_MESSAGE_WORDS: usize = 1;
    const MAX_MESSAGE_WORDS: usize = 15;
    let mut rng = rand::thread_rng();
    let id = MessageId(*next_id);
    *next_id += 1;
    let sender = users.choose(&mut rng).unwrap().clone();
    let message_len = rng.gen_range(MIN_MESSAGE_WORDS..=MAX_MESSAGE_WORDS);
    let text = lipsum::lipsum_words_with_rng(&mut rng, message_len);
    let body = match history.choose(&mut rng) {
        Some(original) if rng.gen_bool(REPLY_CHANCE) => encode_reply(&text, original),
        _ => text,
    };
    let attachments = if rng.gen_bool(ATTACHMENT_CHANCE) {
        let name = format!("report-{}.pdf", rng.gen_range(1..100));
        let url = format!("https://files.example.com/{}/{name}", Uuid::now_v7());
        vec![Attachment {
            filename: name.into(),
            url: url.into(),
        }]
    } else {
        Vec::new()
    };
    let message = Message {
        id,
        sender,
        body: body.into(),
        created_at: Utc::now(),
        attachments,
    };
    let millis = rng.gen_range(0..5000);
    (message, millis)
}
