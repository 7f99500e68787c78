//! Seam to the embedded multi-device protocol client.
//!
//! The protocol implementation (handshake, encryption, session persistence)
//! lives outside this crate. It is plugged in through [`ProtocolBackend`],
//! which opens a session store and hands back a [`ProtocolClient`].

use std::{path::Path, sync::Arc};

use {async_trait::async_trait, tokio::sync::mpsc};

use crate::types::{ClientEvent, Jid, MediaAttachment, PairingEvent};

/// Callback the client invokes for every event, on its own execution context.
pub type EventHandler = Arc<dyn Fn(ClientEvent) + Send + Sync>;

/// Opens the persisted session store and builds a client around it.
#[async_trait]
pub trait ProtocolBackend: Send + Sync {
    /// Open (or create) the store at `store_path` and return a client bound
    /// to the stored device identity, creating a fresh identity if none exists.
    async fn open(&self, store_path: &Path) -> anyhow::Result<Arc<dyn ProtocolClient>>;
}

#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Address of the paired account, `None` when the device was never paired.
    fn own_jid(&self) -> Option<Jid>;

    /// Register the event callback. Called once, before [`Self::connect`].
    fn add_event_handler(&self, handler: EventHandler);

    /// Pairing progress for an unpaired device. Must be requested before
    /// [`Self::connect`].
    async fn pairing_channel(&self) -> anyhow::Result<mpsc::Receiver<PairingEvent>>;

    async fn connect(&self) -> anyhow::Result<()>;

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Send a plain text message to `to`.
    async fn send_text(&self, to: &Jid, text: &str) -> anyhow::Result<()>;

    /// Fetch and decrypt the bytes of an attachment.
    async fn download(&self, attachment: &MediaAttachment) -> anyhow::Result<Vec<u8>>;
}
