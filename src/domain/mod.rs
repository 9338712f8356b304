//! Domain types for voicetask.
//!
//! - Task: a named reminder with a due date and deadline time

pub mod task;

// Re-export commonly used types
pub use task::{Task, TaskError, DATE_FORMAT, TIME_FORMAT};
