//! Spoken output: synthesize, write to a scoped temp file, play.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use super::temp_audio::TempWorkspace;
use crate::adapters::{AudioPlayer, TextToSpeech};

/// Speaks text aloud through the configured TTS service and player
#[derive(Clone)]
pub struct Speaker {
    tts: Arc<dyn TextToSpeech>,
    player: Arc<dyn AudioPlayer>,
    workspace: TempWorkspace,
}

impl Speaker {
    pub fn new(
        tts: Arc<dyn TextToSpeech>,
        player: Arc<dyn AudioPlayer>,
        workspace: TempWorkspace,
    ) -> Self {
        Self {
            tts,
            player,
            workspace,
        }
    }

    /// Speak `text`, returning once playback has finished
    pub async fn say(&self, text: &str) -> Result<()> {
        debug!(text, "Speaking");

        let audio = self
            .tts
            .synthesize(text)
            .await
            .context("Speech synthesis failed")?;

        let path = self
            .workspace
            .scoped(&format!(".{}", audio.extension))
            .context("Failed to allocate temp file for speech")?;

        tokio::fs::write(&path, &audio.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.player.play(&path).await.context("Playback failed")?;

        // `path` drops here and removes the file
        Ok(())
    }
}
