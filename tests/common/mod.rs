//! Shared fakes for integration tests.
//!
//! Every collaborator trait has an in-memory stand-in here. Speech is "synthesized"
//! as the UTF-8 text itself, so the recording player can report exactly what was said.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use voicetask::adapters::{
    AudioPlayer, AudioRecorder, DeliveryError, NotificationDispatcher, SpeechToText,
    SynthesizedAudio, TextToSpeech,
};
use voicetask::core::{
    DateTimeNormalizer, ManualClock, Orchestrator, Recurrence, ReminderScheduler,
    TaskCaptureFlow, TaskStore,
};
use voicetask::ingest::{Speaker, TempWorkspace, VoiceInputController};

/// Monday 2026-10-19 at the given time
pub fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Writes a few bytes wherever it is asked to record
#[derive(Default)]
pub struct FakeRecorder {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl AudioRecorder for FakeRecorder {
    async fn record(&self, output: &Path, _duration: Duration) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("microphone unavailable");
        }
        tokio::fs::write(output, b"RIFF").await?;
        Ok(())
    }
}

/// Returns scripted transcripts in order; `Err` entries become failures
#[derive(Default)]
pub struct ScriptedStt {
    script: Mutex<VecDeque<Result<String, String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedStt {
    pub fn new(script: &[Result<&str, &str>]) -> Self {
        Self {
            script: Mutex::new(
                script
                    .iter()
                    .copied()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, transcript: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(transcript.to_string()));
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio_path.exists(), "recording should exist while transcribing");

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("script exhausted")),
        }
    }
}

/// "Synthesizes" text as its own bytes
pub struct FakeTts;

#[async_trait]
impl TextToSpeech for FakeTts {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        Ok(SynthesizedAudio {
            bytes: text.as_bytes().to_vec(),
            extension: "txt",
        })
    }
}

/// Reads each played file back as text
#[derive(Default)]
pub struct RecordingPlayer {
    spoken: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    /// The next playback hangs for a long time after being recorded
    pub stall_next: AtomicBool,
}

impl RecordingPlayer {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioPlayer for RecordingPlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("no audio device");
        }
        let text = tokio::fs::read_to_string(path).await?;
        self.spoken.lock().unwrap().push(text);
        if self.stall_next.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(())
    }
}

/// Collects outbound messages
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Api {
                service: "fake",
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// A full set of fakes rooted in a temp directory
pub struct Harness {
    pub root: TempDir,
    pub workspace: TempWorkspace,
    pub recorder: Arc<FakeRecorder>,
    pub stt: Arc<ScriptedStt>,
    pub player: Arc<RecordingPlayer>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub clock: Arc<ManualClock>,
    pub max_retries: u32,
}

impl Harness {
    pub fn new(script: &[Result<&str, &str>], now: NaiveDateTime) -> Self {
        let root = TempDir::new().unwrap();
        let workspace = TempWorkspace::new(root.path().join("tmp")).unwrap();
        Self {
            root,
            workspace,
            recorder: Arc::new(FakeRecorder::default()),
            stt: Arc::new(ScriptedStt::new(script)),
            player: Arc::new(RecordingPlayer::default()),
            dispatcher: Arc::new(RecordingDispatcher::default()),
            clock: Arc::new(ManualClock::new(now)),
            max_retries: 3,
        }
    }

    pub fn speaker(&self) -> Speaker {
        Speaker::new(Arc::new(FakeTts), self.player.clone(), self.workspace.clone())
    }

    pub fn voice(&self) -> VoiceInputController {
        VoiceInputController::new(
            self.recorder.clone(),
            self.stt.clone(),
            self.speaker(),
            self.workspace.clone(),
            Duration::from_millis(10),
            self.max_retries,
        )
    }

    pub fn flow(&self) -> TaskCaptureFlow {
        TaskCaptureFlow::new(self.voice(), DateTimeNormalizer::new(self.clock.clone()))
    }

    pub fn store(&self) -> TaskStore {
        TaskStore::new(self.root.path().join("data").join("tasks.csv"))
    }

    pub fn scheduler(&self, recurrence: Recurrence) -> ReminderScheduler {
        ReminderScheduler::new(self.dispatcher.clone(), self.clock.clone(), recurrence)
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.flow(),
            self.store(),
            self.scheduler(Recurrence::Daily),
            self.dispatcher.clone(),
            self.workspace.clone(),
            Duration::from_millis(5),
        )
        .unwrap()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.player.spoken()
    }

    pub fn sent(&self) -> Vec<String> {
        self.dispatcher.sent()
    }
}
