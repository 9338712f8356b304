//! Voice input with bounded retries.
//!
//! Each attempt records into a scoped temp file, transcribes it and trims the
//! result. The retry bookkeeping lives in [`CaptureState`], which knows nothing
//! about audio and is tested on its own.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::speaker::Speaker;
use super::temp_audio::TempWorkspace;
use crate::adapters::{AudioRecorder, SpeechToText};

/// Spoken after an attempt that produced no words
pub const APOLOGY: &str = "Sorry, I didn't catch that. Please try again.";

/// Errors from [`VoiceInputController::capture`]
#[derive(Debug, Error)]
pub enum VoiceInputError {
    #[error("Maximum retries reached ({attempts} attempts)")]
    RetriesExhausted { attempts: u32 },

    #[error("Failed to speak prompt: {0:#}")]
    Prompt(anyhow::Error),
}

/// Why a single attempt did not produce text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Transcription succeeded but was blank
    EmptyTranscript,

    /// Recording or transcription failed
    Error(String),
}

/// Result of one record-and-transcribe attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    Failure(AttemptFailure),
}

impl AttemptOutcome {
    /// Classify a raw transcript; whitespace-only text is a failure
    pub fn from_transcript(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            AttemptOutcome::Failure(AttemptFailure::EmptyTranscript)
        } else {
            AttemptOutcome::Success(text.to_string())
        }
    }
}

/// What the controller should do after recording an outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Return this text to the caller
    Done(String),
    /// Try again
    Retry,
    /// Give up
    Exhausted,
}

/// Retry bookkeeping for one capture
#[derive(Debug, Clone)]
pub struct CaptureState {
    attempt: u32,
    max_retries: u32,
    failures: Vec<AttemptFailure>,
}

impl CaptureState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_retries,
            failures: Vec::new(),
        }
    }

    /// Start the next attempt, returning its 1-based number, or `None` when
    /// no attempts remain
    pub fn begin_attempt(&mut self) -> Option<u32> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// Record the outcome of the current attempt
    pub fn record(&mut self, outcome: AttemptOutcome) -> Step {
        match outcome {
            AttemptOutcome::Success(text) => Step::Done(text),
            AttemptOutcome::Failure(failure) => {
                self.failures.push(failure);
                if self.is_exhausted() {
                    Step::Exhausted
                } else {
                    Step::Retry
                }
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn failures(&self) -> &[AttemptFailure] {
        &self.failures
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_retries
    }
}

/// Turns a spoken prompt into validated text
pub struct VoiceInputController {
    recorder: Arc<dyn AudioRecorder>,
    stt: Arc<dyn SpeechToText>,
    speaker: Speaker,
    workspace: TempWorkspace,
    record_duration: Duration,
    max_retries: u32,
}

impl VoiceInputController {
    pub fn new(
        recorder: Arc<dyn AudioRecorder>,
        stt: Arc<dyn SpeechToText>,
        speaker: Speaker,
        workspace: TempWorkspace,
        record_duration: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            recorder,
            stt,
            speaker,
            workspace,
            record_duration,
            max_retries,
        }
    }

    pub fn speaker(&self) -> &Speaker {
        &self.speaker
    }

    /// Speak `prompt` (if any), then listen until something non-blank is heard
    #[instrument(skip(self), fields(stt = self.stt.name()))]
    pub async fn capture(&self, prompt: Option<&str>) -> Result<String, VoiceInputError> {
        if let Some(prompt) = prompt {
            self.speaker
                .say(prompt)
                .await
                .map_err(VoiceInputError::Prompt)?;
        }

        let mut state = CaptureState::new(self.max_retries);

        while let Some(attempt) = state.begin_attempt() {
            let outcome = match self.listen_once().await {
                Ok(raw) => AttemptOutcome::from_transcript(&raw),
                Err(e) => {
                    warn!(attempt, error = %format!("{:#}", e), "Voice input attempt failed");
                    AttemptOutcome::Failure(AttemptFailure::Error(format!("{:#}", e)))
                }
            };

            if outcome == AttemptOutcome::Failure(AttemptFailure::EmptyTranscript) {
                debug!(attempt, "Empty transcript");
                if let Err(e) = self.speaker.say(APOLOGY).await {
                    warn!(error = %format!("{:#}", e), "Failed to speak apology");
                }
            }

            match state.record(outcome) {
                Step::Done(text) => {
                    debug!(attempt, %text, "Captured voice input");
                    return Ok(text);
                }
                Step::Retry => continue,
                Step::Exhausted => break,
            }
        }

        Err(VoiceInputError::RetriesExhausted {
            attempts: state.attempts(),
        })
    }

    /// Record and transcribe once; the temp file is gone when this returns
    async fn listen_once(&self) -> Result<String> {
        let path = self
            .workspace
            .scoped(".wav")
            .context("Failed to allocate temp file for recording")?;

        self.recorder
            .record(&path, self.record_duration)
            .await
            .context("Recording failed")?;

        self.stt
            .transcribe(&path)
            .await
            .context("Transcription failed")
    }
}
