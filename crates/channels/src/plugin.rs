use {
    async_trait::async_trait,
    tokio_util::sync::CancellationToken,
    wharf_common::{InboundMessage, OutboundMessage},
};

use crate::Result;

/// Receiver of normalized inbound messages (the agent's message bus).
///
/// Delivery is a push: nothing is returned to the channel. Attachment files
/// listed in `media_paths` are only guaranteed to exist until this future
/// completes, so consumers that keep them around must copy them first.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn handle_message(&self, msg: InboundMessage);
}

/// Lifecycle of a messaging channel adapter.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel identifier (e.g. "whatsapp").
    fn name(&self) -> &str;

    /// Connect and begin delivering inbound messages.
    ///
    /// Background work spawned here stops when `cancel` fires or on
    /// [`Channel::stop`].
    async fn start(&self, cancel: CancellationToken) -> Result<()>;

    /// Disconnect. Safe to call more than once.
    async fn stop(&self) -> Result<()>;

    /// Send a text reply.
    async fn send(&self, msg: &OutboundMessage) -> Result<()>;

    /// Whether the channel is started and has not been logged out or stopped.
    fn is_running(&self) -> bool;
}
