//! Adapter interfaces for external systems.
//!
//! Every outside service voicetask talks to sits behind one of these traits:
//! speech-to-text, text-to-speech, the microphone, the speaker, and the
//! outbound notification channel. Concrete adapters live in the submodules.

pub mod audio;
pub mod device;
pub mod openai;
pub mod telegram;
pub mod twilio;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

// Re-export the concrete adapters
pub use audio::{CommandPlayer, CommandRecorder};
#[cfg(feature = "device-audio")]
pub use device::{DevicePlayer, DeviceRecorder};
pub use openai::{OpenAiClient, SpeechFormat};
pub use telegram::{TelegramClient, TelegramConfig};
pub use twilio::{TwilioClient, TwilioWhatsApp};

/// Audio returned by a text-to-speech service
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Encoded audio bytes
    pub bytes: Vec<u8>,

    /// File extension matching the encoding (e.g. "mp3")
    pub extension: &'static str,
}

/// Turns a recorded audio file into text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Transcribe the audio file at `audio_path`
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Turns text into playable audio
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;
}

/// Records from the microphone
#[async_trait]
pub trait AudioRecorder: Send + Sync {
    /// Record for `duration` and write the audio to `output`.
    ///
    /// Blocks (asynchronously) for the whole recording.
    async fn record(&self, output: &Path, duration: Duration) -> Result<()>;
}

/// Plays an audio file to completion
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, path: &Path) -> Result<()>;
}

/// Errors delivering an outbound notification
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to reach {service}: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },
}

/// Sends a message to the single recipient configured for this process
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Channel name for logs
    fn name(&self) -> &str;

    /// Deliver one message. Failures are returned, never retried.
    async fn send(&self, message: &str) -> Result<(), DeliveryError>;
}
