//! Pommai Session crate - Continuous listening on top of a single-shot recognizer.
//!
//! The `SessionController` restarts the recognizer after every natural end and
//! every recoverable error, with per-cause backoff, until the caller stops it.
//! The `ResolutionPipeline` feeds final transcripts through the matcher and
//! publishes the outcome as `SessionEvent`s.

pub mod controller;
pub mod error;
pub mod pipeline;
pub mod recognizer;
pub mod state;

pub use controller::{RestartReason, SessionController, SessionStats};
pub use error::{RecognizerError, SessionError};
pub use pipeline::ResolutionPipeline;
pub use recognizer::{EventSink, MockRecognizer, Recognizer, RecognizerEvent};
pub use state::SessionStatus;
