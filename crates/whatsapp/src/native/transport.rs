use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    tokio::sync::{RwLock, mpsc},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    wharf_channels::{BaseChannel, Error, Result},
    wharf_common::OutboundMessage,
};

use crate::{
    native::{
        client::{EventHandler, ProtocolBackend, ProtocolClient},
        pairing::PairingDisplay,
    },
    normalize::{MessageNormalizer, Normalized},
    state::SharedState,
    types::{ClientEvent, ConnectionState, Jid, MessageEvent, PairingEvent},
};

/// Transport backed by the embedded protocol client.
pub struct NativeTransport {
    base: Arc<BaseChannel>,
    backend: Arc<dyn ProtocolBackend>,
    store_path: PathBuf,
    pairing_timeout: Duration,
    display: PairingDisplay,
    normalizer: MessageNormalizer,
    client: RwLock<Option<Arc<dyn ProtocolClient>>>,
    dispatcher: RwLock<Option<CancellationToken>>,
    state: SharedState,
}

impl NativeTransport {
    pub fn new(
        base: Arc<BaseChannel>,
        backend: Arc<dyn ProtocolBackend>,
        store_path: PathBuf,
        pairing_timeout: Duration,
        display: PairingDisplay,
        normalizer: MessageNormalizer,
    ) -> Self {
        Self {
            base,
            backend,
            store_path,
            pairing_timeout,
            display,
            normalizer,
            client: RwLock::new(None),
            dispatcher: RwLock::new(None),
            state: SharedState::default(),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    pub async fn start(&self, cancel: CancellationToken) -> Result<()> {
        if self.state.get() == ConnectionState::LoggedOut {
            return Err(Error::logged_out(
                "whatsapp session was revoked, clear the session store and pair again",
            ));
        }
        self.release_client().await;

        self.state.set(ConnectionState::Connecting);
        info!(store = %self.store_path.display(), "starting whatsapp native client");

        ensure_store_dir(&self.store_path).await?;
        let client = self
            .backend
            .open(&self.store_path)
            .await
            .map_err(|e| Error::external("open whatsapp session store", e))?;

        let token = cancel.child_token();
        let (tx, rx) = mpsc::unbounded_channel::<ClientEvent>();
        let handler: EventHandler = Arc::new(move |event: ClientEvent| {
            if tx.send(event).is_err() {
                debug!("whatsapp event dropped, dispatcher stopped");
            }
        });
        client.add_event_handler(handler);

        let dispatcher = Dispatcher {
            base: Arc::clone(&self.base),
            client: Arc::clone(&client),
            normalizer: self.normalizer.clone(),
            state: self.state.clone(),
        };
        tokio::spawn(dispatcher.run(rx, token.clone()));

        if let Err(e) = self.connect(client.as_ref()).await {
            token.cancel();
            client.disconnect().await;
            self.state.set_unless_logged_out(ConnectionState::Disconnected);
            return Err(e);
        }

        self.state.set_unless_logged_out(ConnectionState::Connected);
        *self.client.write().await = Some(client);
        *self.dispatcher.write().await = Some(token);
        info!("whatsapp native client connected");
        Ok(())
    }

    async fn connect(&self, client: &dyn ProtocolClient) -> Result<()> {
        if client.own_jid().is_some() {
            return client
                .connect()
                .await
                .map_err(|e| Error::connectivity(format!("failed to connect: {e}")));
        }

        info!("no whatsapp session found, starting pairing");
        let events = client
            .pairing_channel()
            .await
            .map_err(|e| Error::external("open pairing channel", e))?;
        client
            .connect()
            .await
            .map_err(|e| Error::connectivity(format!("failed to connect for pairing: {e}")))?;
        self.state.set(ConnectionState::AwaitingPairing);

        tokio::time::timeout(self.pairing_timeout, wait_for_pairing(events, &self.display))
            .await
            .map_err(|_| {
                warn!(timeout_secs = self.pairing_timeout.as_secs(), "whatsapp pairing timed out");
                Error::timeout("whatsapp pairing")
            })?
    }

    pub async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        if self.state.get() == ConnectionState::LoggedOut {
            return Err(Error::logged_out("whatsapp session was revoked"));
        }
        let client = self
            .client
            .read()
            .await
            .clone()
            .filter(|c| c.is_connected())
            .ok_or_else(|| Error::connectivity("whatsapp client not connected"))?;

        let to: Jid = msg.chat_id.parse()?;
        client
            .send_text(&to, &msg.content)
            .await
            .map_err(|e| Error::delivery(format!("send to {to}"), e))?;
        debug!(to = %to, chars = msg.content.len(), "whatsapp message sent");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if self.release_client().await {
            info!("whatsapp native client stopped");
        }
        self.state.set_unless_logged_out(ConnectionState::Disconnected);
        Ok(())
    }

    /// Stop the dispatcher and disconnect the current client, if any.
    /// Returns whether a client was held.
    async fn release_client(&self) -> bool {
        if let Some(token) = self.dispatcher.write().await.take() {
            token.cancel();
        }
        let Some(client) = self.client.write().await.take() else {
            return false;
        };
        client.disconnect().await;
        true
    }
}

async fn ensure_store_dir(store_path: &Path) -> Result<()> {
    let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);
    builder
        .create(parent)
        .await
        .map_err(|e| Error::external(format!("create store dir {}", parent.display()), e))
}

async fn wait_for_pairing(
    mut events: mpsc::Receiver<PairingEvent>,
    display: &PairingDisplay,
) -> Result<()> {
    while let Some(event) = events.recv().await {
        match event {
            PairingEvent::Code(code) => {
                info!("whatsapp pairing code issued");
                display(&code);
            },
            PairingEvent::Success => {
                info!("whatsapp pairing succeeded");
                return Ok(());
            },
            PairingEvent::Timeout => {
                warn!("whatsapp pairing code expired without a scan");
                return Err(Error::timeout("whatsapp pairing"));
            },
            PairingEvent::Error(reason) => {
                return Err(Error::connectivity(format!("pairing failed: {reason}")));
            },
        }
    }
    Err(Error::connectivity("pairing channel closed before completion"))
}

/// Drains client events in arrival order on a single task.
struct Dispatcher {
    base: Arc<BaseChannel>,
    client: Arc<dyn ProtocolClient>,
    normalizer: MessageNormalizer,
    state: SharedState,
}

impl Dispatcher {
    async fn run(self, mut events: mpsc::UnboundedReceiver<ClientEvent>, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.handle_event(event).await;
        }
        debug!("whatsapp event dispatcher stopped");
    }

    async fn handle_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::Message(message) => self.handle_message(*message).await,
            ClientEvent::Connected => {
                info!("whatsapp connected");
                self.state.set_unless_logged_out(ConnectionState::Connected);
            },
            ClientEvent::Disconnected => {
                warn!("whatsapp disconnected, client will reconnect");
                self.state
                    .set_unless_logged_out(ConnectionState::Disconnected);
            },
            ClientEvent::LoggedOut { reason } => {
                error!(
                    reason = %reason,
                    "whatsapp session logged out, clear the session store and pair again"
                );
                self.state.set(ConnectionState::LoggedOut);
                self.base.set_running(false);
            },
            ClientEvent::HistorySync(history) => {
                debug!(messages = history.messages.len(), "ignoring whatsapp history sync");
            },
        }
    }

    async fn handle_message(&self, event: MessageEvent) {
        let info = &event.info;
        if info.is_from_me || self.is_own_address(&info.sender) {
            return;
        }
        if info.chat.is_broadcast() {
            debug!(chat = %info.chat, "ignoring broadcast message");
            return;
        }

        let Some(Normalized { message, media }) = self
            .normalizer
            .normalize_native(&event, self.client.as_ref())
            .await
        else {
            return;
        };
        self.base.handle_message(message).await;
        drop(media);
    }

    fn is_own_address(&self, sender: &Jid) -> bool {
        self.client
            .own_jid()
            .is_some_and(|own| own.to_non_ad() == sender.to_non_ad())
    }
}
