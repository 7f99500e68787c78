//! Bridge mode: JSON frames over a WebSocket to an external bridge process.

use std::{sync::Arc, time::Duration};

use {
    futures::{
        SinkExt, StreamExt,
        stream::{SplitSink, SplitStream},
    },
    tokio::{
        net::TcpStream,
        sync::{Mutex, RwLock},
        task::JoinHandle,
    },
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    wharf_channels::{BaseChannel, Error, Result},
    wharf_common::OutboundMessage,
};

use crate::{
    config::BridgeOptions,
    normalize::normalize_bridge,
    state::SharedState,
    types::{BRIDGE_MESSAGE_TYPE, BridgeInboundMessage, BridgeOutboundFrame, ConnectionState},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Transport talking to an out-of-process bridge.
pub struct BridgeTransport {
    inner: Arc<BridgeInner>,
    reader: RwLock<Option<(CancellationToken, JoinHandle<()>)>>,
}

struct BridgeInner {
    url: String,
    options: BridgeOptions,
    base: Arc<BaseChannel>,
    /// Write half of the current socket. The lock guards only the handle,
    /// reads happen on the reader half owned by the read loop.
    writer: Mutex<Option<Arc<Mutex<WsWriter>>>>,
    state: SharedState,
}

impl BridgeTransport {
    pub fn new(url: impl Into<String>, options: BridgeOptions, base: Arc<BaseChannel>) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                url: url.into(),
                options,
                base,
                writer: Mutex::new(None),
                state: SharedState::default(),
            }),
            reader: RwLock::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let mut slot = self.reader.write().await;
        if let Some((previous, handle)) = slot.take() {
            previous.cancel();
            let _ = handle.await;
        }

        info!(url = %self.inner.url, "connecting to whatsapp bridge");
        let reader = self.inner.dial().await.inspect_err(|_| {
            self.inner.state.set(ConnectionState::Disconnected);
        })?;

        let token = cancel.child_token();
        let handle = tokio::spawn(Arc::clone(&self.inner).read_loop(reader, token.clone()));
        *slot = Some((token, handle));
        Ok(())
    }

    pub async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        let writer = self
            .inner
            .writer
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::connectivity("whatsapp bridge not connected"))?;

        let payload = serde_json::to_string(&BridgeOutboundFrame::message(&msg.chat_id, &msg.content))
            .map_err(|e| Error::delivery("encode bridge frame", e))?;
        writer
            .lock()
            .await
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| Error::delivery("write bridge frame", e))?;
        debug!(to = %msg.chat_id, chars = msg.content.len(), "bridge message sent");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if let Some((token, handle)) = self.reader.write().await.take() {
            token.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "bridge read loop ended abnormally");
            }
        }
        // Normally already released by the read loop.
        if self.inner.drop_connection().await {
            info!(url = %self.inner.url, "disconnected from whatsapp bridge");
        }
        Ok(())
    }
}

impl BridgeInner {
    /// Open a socket, publish its write half and return the read half.
    async fn dial(&self) -> Result<WsReader> {
        self.state.set(ConnectionState::Connecting);
        let (stream, _response) =
            tokio::time::timeout(self.options.handshake_timeout(), connect_async(self.url.as_str()))
                .await
                .map_err(|_| {
                    Error::connectivity(format!(
                        "bridge handshake with {} timed out after {:?}",
                        self.url,
                        self.options.handshake_timeout()
                    ))
                })?
                .map_err(|e| {
                    Error::connectivity(format!("failed to connect to bridge {}: {e}", self.url))
                })?;

        let (writer, reader) = stream.split();
        *self.writer.lock().await = Some(Arc::new(Mutex::new(writer)));
        self.state.set(ConnectionState::Connected);
        info!(url = %self.url, "connected to whatsapp bridge");
        Ok(reader)
    }

    /// Forget the current socket, closing it if possible. Returns whether one
    /// was held.
    async fn drop_connection(&self) -> bool {
        let writer = self.writer.lock().await.take();
        self.state.set(ConnectionState::Disconnected);
        let Some(writer) = writer else {
            return false;
        };
        if let Err(e) = writer.lock().await.close().await {
            debug!(error = %e, "bridge socket close failed");
        }
        true
    }

    async fn read_loop(self: Arc<Self>, reader: WsReader, cancel: CancellationToken) {
        let mut reader = Some(reader);
        loop {
            let Some(stream) = reader.as_mut() else {
                match self.dial().await {
                    Ok(fresh) => reader = Some(fresh),
                    Err(e) => {
                        warn!(error = %e, "bridge reconnect failed");
                        self.state.set(ConnectionState::Disconnected);
                        if sleep_or_cancelled(self.options.idle_backoff(), &cancel).await {
                            break;
                        }
                    },
                }
                continue;
            };

            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = stream.next() => next,
            };

            let failure = match next {
                Some(Ok(Message::Text(text))) => {
                    self.handle_frame(text.as_str()).await;
                    None
                },
                Some(Ok(Message::Binary(data))) => {
                    match std::str::from_utf8(&data) {
                        Ok(text) => self.handle_frame(text).await,
                        Err(e) => skip_frame(e),
                    }
                    None
                },
                Some(Ok(Message::Close(frame))) => Some(format!("closed by bridge: {frame:?}")),
                Some(Ok(_)) => None,
                Some(Err(e)) => Some(e.to_string()),
                None => Some("stream ended".to_string()),
            };

            if let Some(reason) = failure {
                warn!(reason = %reason, "bridge read failed, reconnecting");
                reader = None;
                self.drop_connection().await;
                if sleep_or_cancelled(self.options.error_backoff(), &cancel).await {
                    break;
                }
            }
        }

        // Only cancellation ends the loop. Without a reader the socket is
        // useless, so release it and stop reporting as running.
        drop(reader);
        if self.drop_connection().await {
            info!(url = %self.url, "disconnected from whatsapp bridge");
        }
        self.base.set_running(false);
        debug!("bridge read loop stopped");
    }

    async fn handle_frame(&self, text: &str) {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(value @ serde_json::Value::Object(_)) => value,
            Ok(_) => return skip_frame("not a JSON object"),
            Err(e) => return skip_frame(e),
        };

        if value.get("type").and_then(serde_json::Value::as_str) != Some(BRIDGE_MESSAGE_TYPE) {
            return;
        }

        let frame: BridgeInboundMessage = match serde_json::from_value(value) {
            Ok(frame) => frame,
            Err(e) => return skip_frame(e),
        };
        if let Some(msg) = normalize_bridge(frame) {
            self.base.handle_message(msg).await;
        }
    }
}

fn skip_frame(reason: impl std::fmt::Display) {
    let err = Error::malformed_frame(reason);
    warn!(error = %err, "skipping bridge frame");
}

/// Sleep for `delay`; returns `true` if cancelled first.
async fn sleep_or_cancelled(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
