//! Speech-to-Text provider abstraction and implementations.

mod groq;

pub use groq::GroqStt;

use std::{path::Path, sync::Arc};

use {
    anyhow::Result,
    async_trait::async_trait,
    bytes::Bytes,
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::config::SttConfig;

/// Audio container/codec of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Opus in OGG container (WhatsApp and Telegram voice notes).
    #[default]
    Opus,
    /// MP3 format.
    Mp3,
    /// AAC in an MP4 container.
    M4a,
    /// AAC format.
    Aac,
    /// WAV (PCM) format.
    Wav,
}

impl AudioFormat {
    /// MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Opus => "audio/ogg",
            Self::Mp3 => "audio/mpeg",
            Self::M4a => "audio/mp4",
            Self::Aac => "audio/aac",
            Self::Wav => "audio/wav",
        }
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Opus => "ogg",
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Aac => "aac",
            Self::Wav => "wav",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ogg" | "oga" | "opus" => Some(Self::Opus),
            "mp3" => Some(Self::Mp3),
            "m4a" | "mp4" => Some(Self::M4a),
            "aac" => Some(Self::Aac),
            "wav" => Some(Self::Wav),
            _ => None,
        }
    }
}

/// Request to transcribe audio to text.
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    /// Raw audio data.
    pub audio: Bytes,
    /// Audio format.
    pub format: AudioFormat,
    /// Language hint (ISO 639-1 code, e.g., "en", "es", "fr").
    pub language: Option<String>,
}

/// Transcription result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Transcribed text.
    pub text: String,
    /// Detected language (ISO 639-1 code).
    pub language: Option<String>,
    /// Duration of audio in seconds.
    pub duration_seconds: Option<f32>,
}

/// Speech-to-Text provider trait.
///
/// Implementations provide audio transcription using various services.
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Provider identifier (e.g., "groq").
    fn id(&self) -> &'static str;

    /// Human-readable provider name.
    fn name(&self) -> &'static str;

    /// Check if the provider is configured and ready.
    fn is_configured(&self) -> bool;

    /// Transcribe audio to text.
    async fn transcribe(&self, request: TranscribeRequest) -> Result<Transcript>;
}

/// Build the provider selected by `config`, or `None` when STT is disabled
/// or the provider is unknown.
pub fn build_stt_provider(config: &SttConfig) -> Option<Arc<dyn SttProvider>> {
    if !config.enabled {
        return None;
    }
    match config.provider.as_str() {
        "groq" => Some(Arc::new(GroqStt::from_config(&config.groq))),
        other => {
            warn!(provider = other, "unknown STT provider, voice notes will not be transcribed");
            None
        },
    }
}
