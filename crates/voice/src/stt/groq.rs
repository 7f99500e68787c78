//! Groq speech-to-text over its Whisper-compatible transcription endpoint.

use {
    anyhow::{Context, Result, bail},
    async_trait::async_trait,
    reqwest::{
        Client,
        multipart::{Form, Part},
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

use {
    super::{SttProvider, TranscribeRequest, Transcript},
    crate::config::GroqSttConfig,
};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "whisper-large-v3-turbo";

/// Transcribes voice notes with Groq-hosted Whisper.
///
/// `Debug` is derived: the API key is a [`Secret`] and prints redacted.
#[derive(Debug, Clone)]
pub struct GroqStt {
    http: Client,
    api_key: Option<Secret<String>>,
    model: String,
    language: Option<String>,
    endpoint: String,
}

impl GroqStt {
    pub fn from_config(config: &GroqSttConfig) -> Self {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: config.language.clone(),
            endpoint: format!("{base_url}/audio/transcriptions"),
        }
    }

    fn upload(&self, request: TranscribeRequest) -> Result<Form> {
        let file = Part::stream(request.audio)
            .file_name(format!("voice.{}", request.format.extension()))
            .mime_str(request.format.mime_type())
            .context("invalid audio mime type")?;
        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        Ok(match request.language.or_else(|| self.language.clone()) {
            Some(language) => form.text("language", language),
            None => form,
        })
    }
}

#[async_trait]
impl SttProvider for GroqStt {
    fn id(&self) -> &'static str {
        "groq"
    }

    fn name(&self) -> &'static str {
        "Groq"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn transcribe(&self, request: TranscribeRequest) -> Result<Transcript> {
        let Some(api_key) = &self.api_key else {
            bail!("groq api key not configured");
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key.expose_secret())
            .multipart(self.upload(request)?)
            .send()
            .await
            .context("groq transcription request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("groq transcription rejected with {status}: {}", body.trim());
        }

        let body: TranscriptionBody = response
            .json()
            .await
            .context("unexpected groq transcription response")?;
        Ok(Transcript {
            text: body.text,
            language: body.language,
            duration_seconds: body.duration,
        })
    }
}

#[derive(Deserialize)]
struct TranscriptionBody {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f32>,
}
