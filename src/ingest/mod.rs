//! Voice capture.
//!
//! Turns speech into text and text into speech:
//!
//! 1. **Speaker**: synthesizes a prompt and plays it
//! 2. **VoiceInputController**: records, transcribes, retries on silence
//! 3. **TempWorkspace**: scratch files for both, removed automatically
//!
//! # Architecture
//!
//! ```text
//! prompt → Speaker → (user speaks) → AudioRecorder → temp .wav
//!                                                      ↓
//!                                    SpeechToText → trimmed text
//! ```

pub mod speaker;
pub mod temp_audio;
pub mod transcriber;
pub mod voice_input;

// Re-export key types
pub use speaker::Speaker;
pub use temp_audio::TempWorkspace;
pub use transcriber::LocalWhisper;
pub use voice_input::{
    AttemptFailure, AttemptOutcome, CaptureState, Step, VoiceInputController, VoiceInputError,
    APOLOGY,
};
