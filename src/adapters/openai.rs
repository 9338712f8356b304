//! OpenAI audio API adapter.
//!
//! - Transcription: `POST /v1/audio/transcriptions` (multipart upload)
//! - Speech: `POST /v1/audio/speech` (JSON in, MP3 or WAV bytes out)

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{SpeechToText, SynthesizedAudio, TextToSpeech};

/// Default API root
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Encoding requested from the speech endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechFormat {
    #[default]
    Mp3,
    /// Needed by players that only decode WAV
    Wav,
}

impl SpeechFormat {
    /// Value of `response_format`, also used as the file extension
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

/// OpenAI client for transcription and speech synthesis
pub struct OpenAiClient {
    api_key: String,
    api_base: String,
    stt_model: String,
    tts_model: String,
    tts_voice: String,
    speech_format: SpeechFormat,
    client: reqwest::Client,
}

/// Body of a speech request
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// Transcription response (json format)
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Error envelope returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl OpenAiClient {
    /// Create a client with the default models ("whisper-1", "tts-1", voice "alloy")
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            speech_format: SpeechFormat::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the models and voice
    pub fn with_models(
        mut self,
        stt_model: impl Into<String>,
        tts_model: impl Into<String>,
        tts_voice: impl Into<String>,
    ) -> Self {
        self.stt_model = stt_model.into();
        self.tts_model = tts_model.into();
        self.tts_voice = tts_voice.into();
        self
    }

    pub fn with_speech_format(mut self, format: SpeechFormat) -> Self {
        self.speech_format = format;
        self
    }

    /// Point the client at a different API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Turn a non-success response into an error with the API's message
    async fn api_error(operation: &str, response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        anyhow::anyhow!("OpenAI {} failed ({}): {}", operation, status, message)
    }
}

#[async_trait]
impl SpeechToText for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file: {}", audio_path.display()))?;

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let form = Form::new()
            .text("model", self.stt_model.clone())
            .text("response_format", "json")
            .part("file", file_part);

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach OpenAI transcription endpoint")?;

        if !response.status().is_success() {
            return Err(Self::api_error("transcription", response).await);
        }

        let transcript: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        Ok(transcript.text.trim().to_string())
    }
}

#[async_trait]
impl TextToSpeech for OpenAiClient {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let request = SpeechRequest {
            model: &self.tts_model,
            voice: &self.tts_voice,
            input: text,
            response_format: self.speech_format.as_str(),
        };

        let response = self
            .client
            .post(self.url("audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach OpenAI speech endpoint")?;

        if !response.status().is_success() {
            return Err(Self::api_error("speech synthesis", response).await);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read synthesized audio")?;

        Ok(SynthesizedAudio {
            bytes: bytes.to_vec(),
            extension: self.speech_format.as_str(),
        })
    }
}
