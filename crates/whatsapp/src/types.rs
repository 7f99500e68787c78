use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use wharf_channels::Error;

/// Server of individual user addresses.
pub const USER_SERVER: &str = "s.whatsapp.net";
/// Server of group chat addresses.
pub const GROUP_SERVER: &str = "g.us";
/// Server of broadcast lists and the status pseudo-chat.
pub const BROADCAST_SERVER: &str = "broadcast";

// ── Addresses ───────────────────────────────────────────────────────────────

/// A WhatsApp address: `user@server`, or `user[.agent]:device@server` for a
/// specific device of a multi-device account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Jid {
    pub user: String,
    pub agent: u8,
    pub device: u16,
    pub server: String,
}

impl Jid {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
            ..Default::default()
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.server == BROADCAST_SERVER
    }

    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }

    /// The account address without agent and device parts.
    pub fn to_non_ad(&self) -> Self {
        Self::new(self.user.clone(), self.server.clone())
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.agent, self.device) {
            (0, 0) => write!(f, "{}@{}", self.user, self.server),
            (0, device) => write!(f, "{}:{}@{}", self.user, device, self.server),
            (agent, device) => write!(f, "{}.{}:{}@{}", self.user, agent, device, self.server),
        }
    }
}

impl FromStr for Jid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::invalid_address(s, reason);

        let input = s.trim();
        if input.is_empty() {
            return Err(invalid("empty address"));
        }
        let mut parts = input.split('@');
        let (Some(user_part), Some(server)) = (parts.next(), parts.next()) else {
            return Err(invalid("missing '@'"));
        };
        if parts.next().is_some() {
            return Err(invalid("more than one '@'"));
        }
        if server.is_empty() {
            return Err(invalid("empty server"));
        }

        let Some((user_agent, device)) = user_part.rsplit_once(':') else {
            return Ok(Self::new(user_part, server));
        };
        let device = device
            .parse::<u16>()
            .map_err(|_| invalid("device is not a number"))?;
        let (user, agent) = match user_agent.split_once('.') {
            Some((user, agent)) => (
                user,
                agent
                    .parse::<u8>()
                    .map_err(|_| invalid("agent is not a number"))?,
            ),
            None => (user_agent, 0),
        };

        Ok(Self {
            user: user.to_string(),
            agent,
            device,
            server: server.to_string(),
        })
    }
}

// ── Native protocol payloads ────────────────────────────────────────────────

/// Envelope of an inbound protocol message.
#[derive(Debug, Clone, Default)]
pub struct MessageInfo {
    pub id: String,
    pub chat: Jid,
    pub sender: Jid,
    pub is_from_me: bool,
    pub is_group: bool,
    /// Sender's self-chosen display name, empty when unknown.
    pub push_name: String,
}

/// A downloadable attachment as announced by the protocol.
///
/// Only `caption`, `file_name` and `mime_type` are interpreted here; the rest
/// is handed back to the protocol client for download.
#[derive(Debug, Clone, Default)]
pub struct MediaAttachment {
    pub caption: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub direct_path: String,
    pub media_key: Vec<u8>,
    pub file_length: u64,
    /// Push-to-talk, i.e. a recorded voice note rather than an audio file.
    pub ptt: bool,
}

/// Content of an inbound protocol message. Any combination may be present.
#[derive(Debug, Clone, Default)]
pub struct WaMessage {
    pub conversation: Option<String>,
    pub extended_text: Option<String>,
    pub image: Option<MediaAttachment>,
    pub video: Option<MediaAttachment>,
    pub document: Option<MediaAttachment>,
    pub audio: Option<MediaAttachment>,
    pub sticker: Option<MediaAttachment>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageEvent {
    pub info: MessageInfo,
    pub message: WaMessage,
}

/// Backlog the server replays after (re)connecting.
#[derive(Debug, Clone, Default)]
pub struct HistorySync {
    pub messages: Vec<MessageEvent>,
}

/// Everything the protocol client reports through its event callback.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Message(Box<MessageEvent>),
    Connected,
    Disconnected,
    LoggedOut { reason: String },
    HistorySync(HistorySync),
}

/// Progress of an interactive pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// A code to show the operator as a QR code.
    Code(String),
    Success,
    Timeout,
    Error(String),
}

/// Connection lifecycle as seen by the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingPairing,
    Connected,
    /// The platform revoked the session. Re-pairing is required.
    LoggedOut,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Connected => "connected",
            Self::LoggedOut => "logged_out",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Bridge wire frames ──────────────────────────────────────────────────────

/// Frame type the bridge uses for chat messages in both directions.
pub const BRIDGE_MESSAGE_TYPE: &str = "message";

/// An inbound `"message"` frame from the bridge.
///
/// Only `from` must be a string. Optional fields of any other JSON type are
/// treated as absent so the rest of the frame still gets through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BridgeInboundMessage {
    pub from: String,
    #[serde(default, deserialize_with = "string_or_none")]
    pub chat: Option<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub content: String,
    /// Paths of files the bridge already saved. Non-string entries are dropped.
    #[serde(default, deserialize_with = "string_entries")]
    pub media: Vec<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub from_name: Option<String>,
}

/// Outbound frame sent to the bridge.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeOutboundFrame<'a> {
    pub r#type: &'a str,
    pub to: &'a str,
    pub content: &'a str,
}

impl<'a> BridgeOutboundFrame<'a> {
    pub fn message(to: &'a str, content: &'a str) -> Self {
        Self {
            r#type: BRIDGE_MESSAGE_TYPE,
            to,
            content,
        }
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_none(deserializer)?.unwrap_or_default())
}

fn string_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(values) => values,
        _ => return Ok(Vec::new()),
    };
    Ok(entries
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}
