//! WhatsApp channel for wharf.
//!
//! Two mutually exclusive transports sit behind [`WhatsAppChannel`]:
//! native mode embeds a multi-device protocol client (paired once by
//! scanning a QR code), bridge mode talks JSON over a WebSocket to an
//! external bridge process. Both produce the same [`InboundMessage`]s.
//!
//! [`InboundMessage`]: wharf_common::InboundMessage

pub mod bridge;
pub mod channel;
pub mod config;
pub mod native;
pub mod normalize;
pub mod state;
pub mod types;

/// Channel name used in messages and session keys.
pub const CHANNEL_NAME: &str = "whatsapp";

pub use {
    channel::{WhatsAppChannel, WhatsAppChannelBuilder},
    config::{BridgeOptions, TransportMode, WhatsAppConfig},
    native::{EventHandler, PairingDisplay, ProtocolBackend, ProtocolClient},
    types::{ClientEvent, ConnectionState, Jid, PairingEvent},
};
