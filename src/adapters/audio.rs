//! Microphone and speaker access through external commands.
//!
//! Recording and playback shell out to a configured program (sox's `rec`
//! and ffmpeg's `ffplay` by default), the same way transcription can shell
//! out to a local whisper binary.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{AudioPlayer, AudioRecorder};

/// Records by running a command template.
///
/// Template arguments may contain `{output}`, `{rate}`, `{channels}` and
/// `{seconds}`, which are substituted before each recording.
#[derive(Debug, Clone)]
pub struct CommandRecorder {
    command: Vec<String>,
    sample_rate: u32,
    channels: u16,
}

impl CommandRecorder {
    pub fn new(command: Vec<String>, sample_rate: u32, channels: u16) -> Self {
        Self {
            command,
            sample_rate,
            channels,
        }
    }

    /// Expand the template for one recording
    fn expand(&self, output: &Path, duration: Duration) -> Vec<String> {
        let output = output.to_string_lossy();
        let rate = self.sample_rate.to_string();
        let channels = self.channels.to_string();
        let seconds = duration.as_secs().max(1).to_string();

        self.command
            .iter()
            .map(|arg| {
                arg.replace("{output}", &output)
                    .replace("{rate}", &rate)
                    .replace("{channels}", &channels)
                    .replace("{seconds}", &seconds)
            })
            .collect()
    }
}

#[async_trait]
impl AudioRecorder for CommandRecorder {
    async fn record(&self, output: &Path, duration: Duration) -> Result<()> {
        let args = self.expand(output, duration);
        debug!(?args, "Recording audio");
        run_to_completion(&args, "recorder").await
    }
}

/// Plays a file by running a command with the file path appended
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    command: Vec<String>,
}

impl CommandPlayer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        let mut args = self.command.clone();
        args.push(path.to_string_lossy().to_string());
        run_to_completion(&args, "player").await
    }
}

/// Run `args[0]` with the remaining arguments and wait for it to exit
async fn run_to_completion(args: &[String], role: &str) -> Result<()> {
    let (program, rest) = args
        .split_first()
        .with_context(|| format!("Audio {} command is empty", role))?;

    let output = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to run audio {} '{}'", role, program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "Audio {} '{}' failed with exit code {}: {}",
            role,
            program,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn template(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recorder_template_expansion() {
        let recorder = CommandRecorder::new(
            template(&["rec", "-q", "-r", "{rate}", "-c", "{channels}", "{output}", "trim", "0", "{seconds}"]),
            16000,
            1,
        );

        let args = recorder.expand(&PathBuf::from("/tmp/a.wav"), Duration::from_secs(3));
        assert_eq!(
            args,
            template(&["rec", "-q", "-r", "16000", "-c", "1", "/tmp/a.wav", "trim", "0", "3"])
        );
    }

    #[test]
    fn test_sub_second_duration_rounds_up() {
        let recorder = CommandRecorder::new(template(&["rec", "{seconds}"]), 16000, 1);
        let args = recorder.expand(&PathBuf::from("a.wav"), Duration::from_millis(200));
        assert_eq!(args[1], "1");
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        assert!(run_to_completion(&[], "player").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_player_fails() {
        let player = CommandPlayer::new(template(&["/definitely/not/a/player"]));
        assert!(player.play(Path::new("speech.mp3")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let recorder = CommandRecorder::new(template(&["false"]), 16000, 1);
        let result = recorder
            .record(Path::new("/tmp/unused.wav"), Duration::from_secs(1))
            .await;
        assert!(result.is_err());
    }
}
