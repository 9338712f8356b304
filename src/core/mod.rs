//! Core engine.
//!
//! This module contains:
//! - Clock: Wall-clock seam
//! - DateTimeNormalizer: Spoken date/time resolution
//! - TaskStore: Append-only task log
//! - ReminderScheduler: Time-of-day reminder triggers
//! - TaskCaptureFlow: Voice prompts to a validated task
//! - Orchestrator: Interactive and polling loops

pub mod capture_flow;
pub mod clock;
pub mod normalizer;
pub mod orchestrator;
pub mod scheduler;
pub mod task_store;

// Re-export commonly used types
pub use capture_flow::{CaptureError, TaskCaptureFlow};
pub use clock::{Clock, ManualClock, SystemClock};
pub use normalizer::{DateTimeNormalizer, NormalizeError, NormalizedDateTime};
pub use orchestrator::{Command, LoopControl, Orchestrator};
pub use scheduler::{Recurrence, ReminderScheduler, ReminderTrigger, TickReport};
pub use task_store::{TaskStore, TaskStoreError};
