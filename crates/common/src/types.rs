//! Canonical message shapes exchanged between channel adapters and the bus.

use {
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, path::PathBuf},
};

/// Metadata key carrying the platform message identifier.
pub const META_MESSAGE_ID: &str = "message_id";
/// Metadata key carrying the full sender address.
pub const META_SENDER_JID: &str = "sender_jid";
/// Metadata key carrying the sender's display name.
pub const META_USER_NAME: &str = "user_name";
/// Metadata key set to `"true"` for messages from group chats.
pub const META_IS_GROUP: &str = "is_group";

/// A normalized inbound message, independent of the transport that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel name (e.g. "whatsapp").
    pub channel: String,
    /// Platform address of the sender.
    pub sender_id: String,
    /// Platform address of the conversation. Equals `sender_id` for direct chats.
    pub chat_id: String,
    /// Text body, possibly empty.
    pub content: String,
    /// Local attachment paths, in extraction order.
    #[serde(default)]
    pub media_paths: Vec<PathBuf>,
    /// `"<channel>:<chat_id>"`.
    pub session_key: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        let channel = channel.into();
        let chat_id = chat_id.into();
        Self {
            session_key: format!("{channel}:{chat_id}"),
            channel,
            sender_id: sender_id.into(),
            chat_id,
            ..Default::default()
        }
    }

    /// A message with neither text nor attachments carries nothing to forward.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.media_paths.is_empty()
    }

    /// Append a line to `content`, newline-separated unless `content` is empty.
    pub fn append_content(&mut self, suffix: &str) {
        if suffix.is_empty() {
            return;
        }
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(suffix);
    }

    pub fn message_id(&self) -> Option<&str> {
        self.metadata.get(META_MESSAGE_ID).map(String::as_str)
    }
}

/// A reply on its way back to a channel. Text only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
        }
    }
}

/// Shorten `text` to at most `max_chars` characters for log output.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
