use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    tracing::{debug, info},
    wharf_common::InboundMessage,
};

use crate::{gating, plugin::MessageSink};

/// State every channel adapter shares with the host application.
pub struct BaseChannel {
    name: String,
    allow_from: Vec<String>,
    sink: Arc<dyn MessageSink>,
    running: Arc<AtomicBool>,
}

impl BaseChannel {
    pub fn new(name: impl Into<String>, allow_from: Vec<String>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            name: name.into(),
            allow_from,
            sink,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_allowed(&self, sender_id: &str) -> bool {
        gating::is_allowed(sender_id, &self.allow_from)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        let was = self.running.swap(running, Ordering::SeqCst);
        if was != running {
            info!(channel = %self.name, running, "channel running state changed");
        }
    }

    /// Shared handle on the running flag, for health reporting.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Forward a normalized message to the bus if its sender is allowed.
    ///
    /// Returns once the sink has finished with the message.
    pub async fn handle_message(&self, msg: InboundMessage) {
        if !self.is_allowed(&msg.sender_id) {
            debug!(
                channel = %self.name,
                sender_id = %msg.sender_id,
                "sender not in allowlist, dropping message"
            );
            return;
        }
        self.sink.handle_message(msg).await;
    }
}
