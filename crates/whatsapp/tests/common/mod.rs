#![allow(dead_code, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio::sync::mpsc,
    wharf_channels::MessageSink,
    wharf_common::InboundMessage,
};

/// What the bus saw for one message.
#[derive(Debug)]
pub struct Received {
    pub message: InboundMessage,
    /// Whether each media path existed while the sink was handling it.
    pub media_existed: Vec<bool>,
}

pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Received>,
}

impl RecordingSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Received>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn handle_message(&self, message: InboundMessage) {
        let media_existed = message.media_paths.iter().map(|p| p.exists()).collect();
        let _ = self.tx.send(Received {
            message,
            media_existed,
        });
    }
}

pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<Received>) -> Received {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a bus message")
        .expect("sink dropped")
}

pub async fn assert_no_message(rx: &mut mpsc::UnboundedReceiver<Received>, wait: Duration) {
    if let Ok(Some(received)) = tokio::time::timeout(wait, rx.recv()).await {
        panic!("unexpected bus message: {:?}", received.message);
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("wharf_whatsapp=debug,wharf_channels=debug")
        .with_test_writer()
        .try_init();
}
