//! The recognizer capability the session controller drives.
//!
//! A recognizer is single-shot: after `start()` it delivers results for one
//! utterance and then ends, or reports an error. Events go through an
//! [`EventSink`] handed over at `init()` and are consumed in delivery order.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use pommai_core::types::RecognitionErrorKind;
use tokio::sync::mpsc;

use crate::error::RecognizerError;

// =============================================================================
// Events
// =============================================================================

/// Something the recognizer reports asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// A transcript for the current utterance, interim or final.
    Result { text: String, is_final: bool },
    /// The run failed.
    Error(RecognitionErrorKind),
    /// The run ended without error.
    End,
}

/// Sending half of a recognizer's event stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RecognizerEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<RecognizerEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver the controller reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RecognizerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Deliver an event. Returns `false` once the controller is gone.
    pub fn emit(&self, event: RecognizerEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn result(&self, text: impl Into<String>, is_final: bool) -> bool {
        self.emit(RecognizerEvent::Result {
            text: text.into(),
            is_final,
        })
    }

    pub fn error(&self, kind: RecognitionErrorKind) -> bool {
        self.emit(RecognizerEvent::Error(kind))
    }

    pub fn end(&self) -> bool {
        self.emit(RecognizerEvent::End)
    }
}

// =============================================================================
// Trait
// =============================================================================

/// A speech-to-text capability with start/stop control.
///
/// `start` and `stop` return immediately; outcomes arrive later as events.
/// Implementations report a start while a run is active as
/// [`RecognizerError::AlreadyRunning`].
pub trait Recognizer: Send + Sync + 'static {
    /// Acquire the capability (device, permission, service) and keep the sink
    /// for event delivery. Failure is fatal for the session.
    fn init(&self, sink: EventSink) -> impl Future<Output = Result<(), RecognizerError>> + Send;

    fn start(&self) -> Result<(), RecognizerError>;

    fn stop(&self) -> Result<(), RecognizerError>;
}

// =============================================================================
// Mock implementation
// =============================================================================

#[derive(Debug, Default)]
struct MockState {
    sink: Option<EventSink>,
    init_failure: Option<RecognizerError>,
    start_failures: VecDeque<RecognizerError>,
    inits: usize,
    starts: usize,
    stops: usize,
}

/// Scriptable recognizer for tests and embedding without a speech service.
///
/// Counts calls, fails `start` with queued errors, and lets the test play the
/// recognizer's side of the conversation through [`MockRecognizer::sink`].
#[derive(Debug, Default)]
pub struct MockRecognizer {
    state: Mutex<MockState>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recognizer whose `init` always fails with `err`.
    pub fn failing_init(err: RecognizerError) -> Self {
        let mock = Self::new();
        mock.lock().init_failure = Some(err);
        mock
    }

    /// Queue an error for an upcoming `start` call.
    pub fn push_start_failure(&self, err: RecognizerError) {
        self.lock().start_failures.push_back(err);
    }

    /// The sink captured at `init`, if initialized.
    pub fn sink(&self) -> Option<EventSink> {
        self.lock().sink.clone()
    }

    pub fn inits(&self) -> usize {
        self.lock().inits
    }

    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock recognizer mutex poisoned")
    }
}

impl Recognizer for MockRecognizer {
    async fn init(&self, sink: EventSink) -> Result<(), RecognizerError> {
        // Acquisition takes a scheduling round, like a real device would.
        tokio::task::yield_now().await;
        let mut state = self.lock();
        state.inits += 1;
        if let Some(err) = state.init_failure.clone() {
            return Err(err);
        }
        state.sink = Some(sink);
        Ok(())
    }

    fn start(&self) -> Result<(), RecognizerError> {
        let mut state = self.lock();
        state.starts += 1;
        match state.start_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn stop(&self) -> Result<(), RecognizerError> {
        self.lock().stops += 1;
        Ok(())
    }
}
