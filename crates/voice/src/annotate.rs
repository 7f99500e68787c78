//! Text annotation for inbound voice notes.
//!
//! Channel adapters append the annotation to the message body so the agent
//! sees either the transcription or a placeholder saying why there is none.

use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::Context,
    bytes::Bytes,
    tracing::{debug, error},
};

use crate::{
    config::{DEFAULT_TRANSCRIBE_TIMEOUT_SECS, SttConfig},
    stt::{AudioFormat, SttProvider, TranscribeRequest, build_stt_provider},
};

/// Annotation for a voice note when no transcriber is available.
pub const VOICE_PLACEHOLDER: &str = "[voice]";

/// Annotation for a voice note whose transcription failed or timed out.
pub const VOICE_FAILED_PLACEHOLDER: &str = "[voice (transcription failed)]";

/// Wraps an optional STT provider with a timeout and textual fallbacks.
#[derive(Clone)]
pub struct VoiceAnnotator {
    provider: Option<Arc<dyn SttProvider>>,
    timeout: Duration,
}

impl std::fmt::Debug for VoiceAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceAnnotator")
            .field("provider", &self.provider.as_ref().map(|p| p.id()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for VoiceAnnotator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl VoiceAnnotator {
    pub fn new(provider: Option<Arc<dyn SttProvider>>) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(DEFAULT_TRANSCRIBE_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &SttConfig) -> Self {
        Self::new(build_stt_provider(config)).with_timeout(Duration::from_secs(config.timeout_secs))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a configured provider is attached.
    pub fn is_available(&self) -> bool {
        self.provider.as_ref().is_some_and(|p| p.is_configured())
    }

    /// Annotation for the voice note at `path`. Never fails.
    pub async fn annotate(&self, path: &Path) -> String {
        let Some(provider) = self.provider.as_ref().filter(|p| p.is_configured()) else {
            return VOICE_PLACEHOLDER.to_string();
        };

        match tokio::time::timeout(self.timeout, transcribe_file(provider.as_ref(), path)).await {
            Ok(Ok(text)) => {
                debug!(provider = provider.id(), chars = text.len(), "voice note transcribed");
                format!("[voice transcription: {text}]")
            },
            Ok(Err(e)) => {
                error!(provider = provider.id(), error = %e, "voice transcription failed");
                VOICE_FAILED_PLACEHOLDER.to_string()
            },
            Err(_) => {
                error!(
                    provider = provider.id(),
                    timeout_secs = self.timeout.as_secs(),
                    "voice transcription timed out"
                );
                VOICE_FAILED_PLACEHOLDER.to_string()
            },
        }
    }
}

async fn transcribe_file(provider: &dyn SttProvider, path: &Path) -> anyhow::Result<String> {
    let audio = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let request = TranscribeRequest {
        audio: Bytes::from(audio),
        format: AudioFormat::from_path(path).unwrap_or_default(),
        language: None,
    };
    let transcript = provider.transcribe(request).await?;
    Ok(transcript.text.trim().to_string())
}
