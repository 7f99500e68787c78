//! Voice capabilities for wharf: speech-to-text providers and the voice-note
//! annotation used by channel adapters.

pub mod annotate;
pub mod config;
pub mod stt;

pub use {
    annotate::{VOICE_FAILED_PLACEHOLDER, VOICE_PLACEHOLDER, VoiceAnnotator},
    config::{GroqSttConfig, SttConfig},
    stt::{AudioFormat, GroqStt, SttProvider, TranscribeRequest, Transcript, build_stt_provider},
};
