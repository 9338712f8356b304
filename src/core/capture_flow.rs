//! Task capture: ask for a name, ask for a due date, build the task.

use thiserror::Error;
use tracing::{info, instrument, warn};

use super::normalizer::{DateTimeNormalizer, NormalizeError};
use crate::domain::{Task, TaskError};
use crate::ingest::{VoiceInputController, VoiceInputError};

pub const NAME_PROMPT: &str = "Please say the task name:";
pub const DUE_PROMPT: &str = "When is this due? For example, you can say 'tomorrow at 3pm'";

/// Why a capture produced no task
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Voice(#[from] VoiceInputError),

    #[error(transparent)]
    DateTime(#[from] NormalizeError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Voice prompts plus normalization, producing one [`Task`]
pub struct TaskCaptureFlow {
    voice: VoiceInputController,
    normalizer: DateTimeNormalizer,
}

impl TaskCaptureFlow {
    pub fn new(voice: VoiceInputController, normalizer: DateTimeNormalizer) -> Self {
        Self { voice, normalizer }
    }

    pub fn voice(&self) -> &VoiceInputController {
        &self.voice
    }

    /// Run the two prompts and build the task
    #[instrument(skip(self))]
    pub async fn try_create_task(&self) -> Result<Task, CaptureError> {
        let name = self.voice.capture(Some(NAME_PROMPT)).await?;
        let due_text = self.voice.capture(Some(DUE_PROMPT)).await?;

        let resolved = self.normalizer.normalize(&due_text)?;
        let task = Task::new(name, resolved.date, resolved.time)?;

        info!(
            task = %task.name(),
            due = %task.due_date_string(),
            at = %task.deadline_string(),
            "Task captured"
        );
        Ok(task)
    }

    /// Like [`try_create_task`](Self::try_create_task), but speaks the failure
    /// and returns `None` instead of an error
    pub async fn create_task(&self) -> Option<Task> {
        match self.try_create_task().await {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(error = %e, "Task capture failed");
                let message = format!("Error creating task: {}", e);
                if let Err(e) = self.voice.speaker().say(&message).await {
                    warn!(error = %format!("{:#}", e), "Failed to speak capture error");
                }
                None
            }
        }
    }
}
