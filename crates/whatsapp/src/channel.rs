use std::sync::Arc;

use {
    async_trait::async_trait,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
    wharf_channels::{BaseChannel, Channel, Error, MessageSink, Result},
    wharf_common::OutboundMessage,
    wharf_media::MediaDownloader,
    wharf_voice::VoiceAnnotator,
};

use crate::{
    CHANNEL_NAME,
    bridge::BridgeTransport,
    config::{TransportMode, WhatsAppConfig},
    native::{NativeTransport, PairingDisplay, ProtocolBackend, stdout_display},
    normalize::{MEDIA_FILE_PREFIX, MessageNormalizer},
    types::ConnectionState,
};

enum Transport {
    Native(NativeTransport),
    Bridge(BridgeTransport),
}

/// WhatsApp channel adapter.
///
/// The transport is chosen once, at build time, from
/// [`WhatsAppConfig::bridge_url`]; every lifecycle call goes to that
/// transport only.
pub struct WhatsAppChannel {
    base: Arc<BaseChannel>,
    transport: Transport,
}

impl WhatsAppChannel {
    pub fn builder(config: WhatsAppConfig, sink: Arc<dyn MessageSink>) -> WhatsAppChannelBuilder {
        WhatsAppChannelBuilder {
            config,
            sink,
            backend: None,
            voice: None,
            display: None,
        }
    }

    pub fn mode(&self) -> TransportMode {
        match self.transport {
            Transport::Native(_) => TransportMode::Native,
            Transport::Bridge(_) => TransportMode::Bridge,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        match &self.transport {
            Transport::Native(t) => t.connection_state(),
            Transport::Bridge(t) => t.connection_state(),
        }
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        self.base.name()
    }

    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        match &self.transport {
            Transport::Native(t) => t.start(cancel).await?,
            Transport::Bridge(t) => t.start(cancel).await?,
        }
        self.base.set_running(true);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.base.set_running(false);
        match &self.transport {
            Transport::Native(t) => t.stop().await,
            Transport::Bridge(t) => t.stop().await,
        }
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        match &self.transport {
            Transport::Native(t) => t.send(msg).await,
            Transport::Bridge(t) => t.send(msg).await,
        }
    }

    fn is_running(&self) -> bool {
        self.base.is_running()
    }
}

pub struct WhatsAppChannelBuilder {
    config: WhatsAppConfig,
    sink: Arc<dyn MessageSink>,
    backend: Option<Arc<dyn ProtocolBackend>>,
    voice: Option<VoiceAnnotator>,
    display: Option<PairingDisplay>,
}

impl WhatsAppChannelBuilder {
    /// Protocol client implementation, required in native mode.
    #[must_use]
    pub fn with_protocol_backend(mut self, backend: Arc<dyn ProtocolBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Voice note transcription. Without one, voice notes get a placeholder.
    #[must_use]
    pub fn with_transcriber(mut self, voice: VoiceAnnotator) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Where pairing codes are shown. Defaults to a QR code on stdout.
    #[must_use]
    pub fn with_pairing_display(mut self, display: PairingDisplay) -> Self {
        self.display = Some(display);
        self
    }

    pub fn build(self) -> Result<WhatsAppChannel> {
        let Self {
            config,
            sink,
            backend,
            voice,
            display,
        } = self;
        let mode = TransportMode::from_config(&config);
        let base = Arc::new(BaseChannel::new(CHANNEL_NAME, config.allow_from.clone(), sink));

        let transport = match mode {
            TransportMode::Native => {
                let backend = backend.ok_or_else(|| {
                    Error::invalid_config(
                        "native mode needs a protocol backend; set bridge_url to use a bridge",
                    )
                })?;
                let downloader =
                    MediaDownloader::new(config.resolved_media_dir()).with_prefix(MEDIA_FILE_PREFIX);
                Transport::Native(NativeTransport::new(
                    Arc::clone(&base),
                    backend,
                    config.resolved_store_path(),
                    config.pairing_timeout(),
                    display.unwrap_or_else(stdout_display),
                    MessageNormalizer::new(downloader, voice.unwrap_or_default()),
                ))
            },
            TransportMode::Bridge => {
                let url = config.bridge_url.trim();
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    return Err(Error::invalid_config(format!(
                        "bridge_url must be a ws:// or wss:// URL, got {url:?}"
                    )));
                }
                if backend.is_some() {
                    debug!("bridge mode selected, ignoring protocol backend");
                }
                Transport::Bridge(BridgeTransport::new(url, config.bridge, Arc::clone(&base)))
            },
        };

        info!(mode = ?mode, allow_from = config.allow_from.len(), "whatsapp channel configured");
        Ok(WhatsAppChannel { base, transport })
    }
}
