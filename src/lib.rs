//! voicetask - Voice-driven task capture with scheduled reminders
//!
//! Speak a task name and a due date; voicetask resolves the date, appends
//! the task to a CSV log, and sends a reminder through WhatsApp or Telegram
//! at the task's deadline time.
//!
//! # Architecture
//!
//! ```text
//! mic → VoiceInputController → DateTimeNormalizer → Task
//!                                                  ├→ TaskStore (tasks.csv)
//!                                                  └→ ReminderScheduler → NotificationDispatcher
//! ```
//!
//! # Modules
//!
//! - `adapters`: External services (OpenAI, Twilio, Telegram, audio commands)
//! - `core`: Normalizer, task log, scheduler, capture flow, orchestrator
//! - `domain`: The `Task` value
//! - `ingest`: Voice capture (speaker, retries, temp files)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Start a voice session
//! voicetask run --notify telegram
//!
//! # Check how a phrase resolves
//! voicetask parse "next friday at 9:30am"
//!
//! # List captured tasks
//! voicetask tasks --limit 10
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;

// Re-export main types at crate root for convenience
pub use core::{DateTimeNormalizer, Orchestrator, ReminderScheduler, TaskCaptureFlow, TaskStore};
pub use domain::Task;
pub use ingest::{TempWorkspace, VoiceInputController};
