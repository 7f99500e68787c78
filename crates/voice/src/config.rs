//! Speech-to-text configuration types.

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Default bound on a single transcription, in seconds.
pub const DEFAULT_TRANSCRIBE_TIMEOUT_SECS: u64 = 30;

/// Speech-to-Text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Enable STT globally.
    pub enabled: bool,

    /// Default provider: "groq".
    pub provider: String,

    /// Upper bound on one transcription before falling back to a placeholder.
    pub timeout_secs: u64,

    /// Groq (Whisper-compatible) settings.
    pub groq: GroqSttConfig,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "groq".into(),
            timeout_secs: DEFAULT_TRANSCRIBE_TIMEOUT_SECS,
            groq: GroqSttConfig::default(),
        }
    }
}

/// Groq STT configuration (Whisper-compatible API).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqSttConfig {
    /// API key (from GROQ_API_KEY env or config).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret",
        deserialize_with = "deserialize_option_secret"
    )]
    pub api_key: Option<Secret<String>>,

    /// Model to use (e.g., "whisper-large-v3-turbo").
    pub model: Option<String>,

    /// Language hint (ISO 639-1 code).
    pub language: Option<String>,

    /// Override the API base URL (self-hosted gateways, tests).
    pub base_url: Option<String>,
}

// ── Secret serialization helpers ───────────────────────────────────────────

fn serialize_option_secret<S>(
    value: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use secrecy::ExposeSecret;
    match value {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_option_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.map(Secret::new))
}
