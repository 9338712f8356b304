//! Local Whisper transcription backend.
//!
//! Shells out to a local whisper binary and reads its JSON output.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::adapters::SpeechToText;

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
}

/// Speech-to-text through a locally installed `whisper` binary
#[derive(Debug, Clone)]
pub struct LocalWhisper {
    binary: PathBuf,
    model: String,
    language: String,
}

impl LocalWhisper {
    /// Binary from `WHISPER_PATH`, falling back to `whisper` on the PATH
    pub fn new(model: impl Into<String>) -> Self {
        let binary = std::env::var("WHISPER_PATH").unwrap_or_else(|_| "whisper".to_string());
        Self {
            binary: PathBuf::from(binary),
            model: model.into(),
            language: "en".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl SpeechToText for LocalWhisper {
    fn name(&self) -> &str {
        "whisper-local"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let output_dir = tempfile::tempdir().context("Failed to create temp dir")?;

        debug!(binary = %self.binary.display(), model = %self.model, "Running local whisper");

        let output = Command::new(&self.binary)
            .arg(audio_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_dir")
            .arg(output_dir.path())
            .arg("--output_format")
            .arg("json")
            .arg("--language")
            .arg(&self.language)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Whisper failed: {}", stderr.trim());
        }

        let stem = audio_path.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = output_dir.path().join(format!("{}.json", stem));

        let json_content = tokio::fs::read_to_string(&json_path)
            .await
            .context("Failed to read whisper output")?;

        parse_output(&json_content)
    }
}

fn parse_output(json: &str) -> Result<String> {
    let whisper: WhisperOutput =
        serde_json::from_str(json).context("Failed to parse whisper JSON")?;
    Ok(whisper.text.trim().to_string())
}
