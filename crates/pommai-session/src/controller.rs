//! Recognition session controller.
//!
//! Keeps listening alive on top of a single-shot recognizer: every natural
//! end and every recoverable error schedules a restart while listening is
//! desired. At most one restart is pending at any time; scheduling a new one
//! cancels the previous. After `stop()` no handler is called again, even for
//! events the recognizer delivers late.

use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use pommai_core::config::SessionConfig;
use pommai_core::types::{ErrorClass, RecognitionErrorKind, SessionId};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{RecognizerError, SessionError};
use crate::recognizer::{EventSink, Recognizer, RecognizerEvent};
use crate::state::{SessionStatus, StateMachine};

/// Called with `(raw_text, is_final)` for every recognizer result.
pub type ResultHandler = Arc<dyn Fn(&str, bool) + Send + Sync>;

/// Called for recognizer faults that are not silence or interruption.
pub type ErrorHandler = Arc<dyn Fn(&RecognitionErrorKind) + Send + Sync>;

/// Why a restart was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    End,
    NoSpeech,
    Aborted,
    Fault,
    StartFailed,
}

/// Counters describing how a session has behaved so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub restarts_scheduled: u64,
    /// Pending restarts replaced by a newer one or cancelled by `stop()`.
    pub restarts_cancelled: u64,
    pub restart_attempts: u64,
    pub start_failures: u64,
    pub results_forwarded: u64,
    pub errors_forwarded: u64,
    /// Events received while listening was not desired.
    pub events_discarded: u64,
}

struct PendingRestart {
    generation: u64,
    reason: RestartReason,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Control {
    desired_listening: bool,
    runtime: Option<Handle>,
    pending: Option<PendingRestart>,
    generation: u64,
    /// Thread currently running a handler.
    in_flight: Option<ThreadId>,
    stats: SessionStats,
}

#[derive(Default)]
struct Handlers {
    on_result: Option<ResultHandler>,
    on_error: Option<ErrorHandler>,
}

struct Inner<R> {
    recognizer: Arc<R>,
    config: SessionConfig,
    session_id: SessionId,
    state: StateMachine,
    control: Mutex<Control>,
    /// Signalled when a handler call returns.
    handler_done: Condvar,
    handlers: Mutex<Handlers>,
    init_lock: tokio::sync::Mutex<()>,
}

/// Clears the in-flight mark when a handler returns or unwinds.
struct InFlight<'a> {
    control: &'a Mutex<Control>,
    handler_done: &'a Condvar,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut control) = self.control.lock() {
            control.in_flight = None;
        }
        self.handler_done.notify_all();
    }
}

/// Drives a [`Recognizer`] as a continuous listening session.
///
/// Cheap to clone; clones share the same session.
pub struct SessionController<R: Recognizer> {
    inner: Arc<Inner<R>>,
}

impl<R: Recognizer> Clone for SessionController<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Recognizer> std::fmt::Debug for SessionController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session_id", &self.inner.session_id)
            .field("status", &self.status())
            .field("desired_listening", &self.is_listening_desired())
            .field("has_pending_restart", &self.has_pending_restart())
            .finish()
    }
}

impl<R: Recognizer> SessionController<R> {
    pub fn new(recognizer: Arc<R>, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                recognizer,
                config,
                session_id: SessionId::new(),
                state: StateMachine::new(),
                control: Mutex::new(Control::default()),
                handler_done: Condvar::new(),
                handlers: Mutex::new(Handlers::default()),
                init_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.current()
    }

    pub fn is_listening_desired(&self) -> bool {
        self.control().desired_listening
    }

    pub fn has_pending_restart(&self) -> bool {
        self.control().pending.is_some()
    }

    /// Reason of the pending restart, if one is scheduled.
    pub fn pending_restart(&self) -> Option<RestartReason> {
        self.control().pending.as_ref().map(|p| p.reason)
    }

    pub fn stats(&self) -> SessionStats {
        self.control().stats
    }

    pub fn recognizer(&self) -> &Arc<R> {
        &self.inner.recognizer
    }

    /// Register the handler for recognizer results. Replaces any previous one.
    ///
    /// Handlers run on the event pump, outside the controller's locks, and
    /// may call `stop()`.
    pub fn on_result(&self, handler: impl Fn(&str, bool) + Send + Sync + 'static) {
        self.handlers().on_result = Some(Arc::new(handler));
    }

    /// Register the handler for surfaced recognizer faults.
    pub fn on_error(&self, handler: impl Fn(&RecognitionErrorKind) + Send + Sync + 'static) {
        self.handlers().on_error = Some(Arc::new(handler));
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Acquire the recognizer and start the event pump.
    ///
    /// Must be called from within a tokio runtime. A failure here is fatal:
    /// the caller should surface it and not retry. Concurrent calls acquire
    /// the recognizer once.
    pub async fn init(&self) -> Result<(), SessionError> {
        let _initializing = self.inner.init_lock.lock().await;
        if self.control().runtime.is_some() {
            debug!(session_id = %self.inner.session_id, "Session already initialized");
            return Ok(());
        }

        let (sink, rx) = EventSink::channel();
        self.inner
            .recognizer
            .init(sink)
            .await
            .map_err(SessionError::Initialization)?;

        let runtime = Handle::current();
        self.control().runtime = Some(runtime.clone());
        runtime.spawn(run_event_pump(Arc::downgrade(&self.inner), rx));

        info!(session_id = %self.inner.session_id, "Recognition session initialized");
        Ok(())
    }

    /// Begin listening. Calling it while listening is already desired is a
    /// no-op.
    pub fn start(&self) -> Result<(), SessionError> {
        {
            let mut control = self.control();
            if control.runtime.is_none() {
                return Err(SessionError::NotInitialized);
            }
            if control.desired_listening {
                debug!(session_id = %self.inner.session_id, "Start ignored, already listening");
                return Ok(());
            }
            self.inner.state.transition(SessionStatus::Starting)?;
            control.desired_listening = true;
        }

        info!(session_id = %self.inner.session_id, "Listening started");
        self.attempt_start();
        Ok(())
    }

    /// Stop listening. Cancels any pending restart and suppresses every later
    /// handler call, including for events already in flight.
    ///
    /// A handler already running on another thread is waited for; a handler
    /// that calls `stop()` itself is not.
    pub fn stop(&self) {
        {
            let mut control = self.control();
            control.desired_listening = false;
            if let Some(pending) = control.pending.take() {
                pending.handle.abort();
                control.stats.restarts_cancelled += 1;
            }

            let current = thread::current().id();
            let _control = self
                .inner
                .handler_done
                .wait_while(control, |c| c.in_flight.is_some_and(|id| id != current))
                .expect("control mutex poisoned");
        }

        let previous = self.inner.state.stop();
        if let Err(e) = self.inner.recognizer.stop() {
            warn!(session_id = %self.inner.session_id, error = %e, "Recognizer stop failed");
        }

        info!(
            session_id = %self.inner.session_id,
            previous = %previous,
            "Listening stopped"
        );
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Process one recognizer event. The event pump calls this in delivery
    /// order.
    pub fn handle_event(&self, event: RecognizerEvent) {
        match event {
            RecognizerEvent::Result { text, is_final } => {
                self.dispatch(|handlers, stats| {
                    stats.results_forwarded += 1;
                    handlers.on_result.clone().map(|h| move || h(&text, is_final))
                });
            }
            RecognizerEvent::Error(kind) => self.handle_error(kind),
            RecognizerEvent::End => {
                if self.is_listening_desired() {
                    debug!(session_id = %self.inner.session_id, "Recognizer run ended");
                    self.schedule_restart(self.inner.config.end_restart_delay(), RestartReason::End);
                } else {
                    self.discard("end");
                }
            }
        }
    }

    fn handle_error(&self, kind: RecognitionErrorKind) {
        let (delay, reason) = match kind.classify() {
            ErrorClass::BenignSilence => {
                (self.inner.config.no_speech_restart_delay(), RestartReason::NoSpeech)
            }
            ErrorClass::Aborted => (self.inner.config.aborted_restart_delay(), RestartReason::Aborted),
            ErrorClass::Fault => (self.inner.config.error_restart_delay(), RestartReason::Fault),
        };

        if kind.is_transient() {
            debug!(session_id = %self.inner.session_id, error = %kind, "Transient recognizer error");
        } else {
            warn!(session_id = %self.inner.session_id, error = %kind, "Recognizer fault");
            let delivered = self.dispatch(|handlers, stats| {
                stats.errors_forwarded += 1;
                handlers.on_error.clone().map(|h| move || h(&kind))
            });
            if !delivered {
                return;
            }
        }

        if self.is_listening_desired() {
            self.schedule_restart(delay, reason);
        } else {
            self.discard("error");
        }
    }

    /// Run a handler unless listening is no longer desired. Returns whether
    /// the event was accepted.
    ///
    /// The handler is picked and marked in flight under the control lock, so
    /// a concurrent `stop()` either discards the event or waits for the call.
    fn dispatch<F, C>(&self, select: F) -> bool
    where
        F: FnOnce(&Handlers, &mut SessionStats) -> Option<C>,
        C: FnOnce(),
    {
        let call = {
            let mut control = self.control();
            if !control.desired_listening {
                control.stats.events_discarded += 1;
                debug!(session_id = %self.inner.session_id, "Event after stop discarded");
                return false;
            }
            let call = select(&self.handlers(), &mut control.stats);
            if call.is_some() {
                control.in_flight = Some(thread::current().id());
            }
            call
        };

        if let Some(call) = call {
            let _in_flight = InFlight {
                control: &self.inner.control,
                handler_done: &self.inner.handler_done,
            };
            call();
        }
        true
    }

    fn discard(&self, what: &str) {
        self.control().stats.events_discarded += 1;
        debug!(session_id = %self.inner.session_id, event = what, "Event after stop discarded");
    }

    // =========================================================================
    // Restarts
    // =========================================================================

    fn schedule_restart(&self, delay: Duration, reason: RestartReason) {
        let mut control = self.control();
        if !control.desired_listening {
            return;
        }
        let Some(runtime) = control.runtime.clone() else {
            warn!(session_id = %self.inner.session_id, "No runtime, restart not scheduled");
            return;
        };

        if let Some(previous) = control.pending.take() {
            previous.handle.abort();
            control.stats.restarts_cancelled += 1;
            debug!(
                session_id = %self.inner.session_id,
                replaced = ?previous.reason,
                "Pending restart replaced"
            );
        }

        if let Err(e) = self.inner.state.transition(SessionStatus::Restarting) {
            debug!(session_id = %self.inner.session_id, error = %e, "Restart from unexpected status");
        }

        control.generation += 1;
        let generation = control.generation;
        let deadline = tokio::time::Instant::now() + delay;
        let controller = self.clone();
        // Spawned under the lock: the task cannot observe `pending` before it
        // is stored.
        let handle = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            controller.fire_restart(generation);
        });
        control.pending = Some(PendingRestart {
            generation,
            reason,
            handle,
        });
        control.stats.restarts_scheduled += 1;

        debug!(
            session_id = %self.inner.session_id,
            ?reason,
            delay_ms = delay.as_millis() as u64,
            "Restart scheduled"
        );
    }

    fn fire_restart(&self, generation: u64) {
        {
            let mut control = self.control();
            match &control.pending {
                Some(pending) if pending.generation == generation => {}
                _ => return,
            }
            control.pending = None;
            if !control.desired_listening {
                return;
            }
            control.stats.restart_attempts += 1;
        }
        self.attempt_start();
    }

    fn attempt_start(&self) {
        let outcome = self.inner.recognizer.start();

        if !self.is_listening_desired() {
            // stop() raced the start primitive; make sure the run ends.
            if outcome.is_ok() {
                let _ = self.inner.recognizer.stop();
            }
            return;
        }

        match outcome {
            Ok(()) | Err(RecognizerError::AlreadyRunning) => {
                if let Err(e) = self.inner.state.transition(SessionStatus::Listening) {
                    debug!(session_id = %self.inner.session_id, error = %e, "Already listening");
                }
            }
            Err(e) => {
                warn!(
                    session_id = %self.inner.session_id,
                    error = %e,
                    "Recognizer start failed, retrying"
                );
                self.control().stats.start_failures += 1;
                self.schedule_restart(self.inner.config.start_retry_delay(), RestartReason::StartFailed);
            }
        }
    }

    fn control(&self) -> std::sync::MutexGuard<'_, Control> {
        self.inner.control.lock().expect("control mutex poisoned")
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, Handlers> {
        self.inner.handlers.lock().expect("handlers mutex poisoned")
    }
}

/// Feed recognizer events to the controller until either side goes away.
async fn run_event_pump<R: Recognizer>(
    inner: Weak<Inner<R>>,
    mut rx: mpsc::UnboundedReceiver<RecognizerEvent>,
) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        SessionController { inner }.handle_event(event);
    }
    debug!("Recognizer event stream closed");
}

// =============================================================================
// Tests
// =============================================================================
