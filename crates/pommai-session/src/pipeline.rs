//! Resolution pipeline: session controller + debounce + matcher.
//!
//! Every recognizer result is published as a `Transcript` event. Final
//! transcripts are held for the debounce window; a newer final result
//! replaces the held one. When the window closes the transcript is resolved
//! and published as `Resolved` or `NoMatch`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pommai_core::config::SessionConfig;
use pommai_core::events::SessionEvent;
use pommai_core::types::{RecognitionErrorKind, SessionId, Timestamp};
use pommai_resolve::{normalize, Matcher};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::controller::SessionController;
use crate::error::SessionError;
use crate::recognizer::Recognizer;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub const STATUS_LISTENING: &str = "Listening";
pub const STATUS_STOPPED: &str = "Stopped";

struct Shared {
    session_id: SessionId,
    matcher: Arc<Matcher>,
    events: broadcast::Sender<SessionEvent>,
    debounce: Duration,
    status_hold: Duration,
    pending_resolution: Mutex<Option<JoinHandle<()>>>,
    status_reset: Mutex<Option<JoinHandle<()>>>,
    /// Set by `stop()`. Timer tasks that already woke up publish nothing
    /// while it is set.
    stopped: Mutex<bool>,
}

impl Shared {
    fn publish(&self, event: SessionEvent) {
        let name = event.event_name();
        if self.events.send(event).is_err() {
            debug!(event = name, "No subscribers for session event");
        }
    }

    /// Publish unless the pipeline has been stopped. The flag stays locked
    /// through the send so `stop()` cannot slip in between.
    fn publish_live(&self, event: SessionEvent) {
        let stopped = self.lock_stopped();
        if *stopped {
            debug!(event = event.event_name(), "Pipeline stopped, event dropped");
            return;
        }
        self.publish(event);
    }

    fn publish_status(&self, message: &str) {
        self.publish(SessionEvent::Status {
            session_id: self.session_id,
            message: message.to_string(),
            timestamp: Timestamp::now(),
        });
    }

    fn on_result(self: &Arc<Self>, text: &str, is_final: bool) {
        self.publish(SessionEvent::Transcript {
            session_id: self.session_id,
            raw: text.to_string(),
            is_final,
            timestamp: Timestamp::now(),
        });

        if !is_final {
            return;
        }

        let deadline = tokio::time::Instant::now() + self.debounce;
        let shared = Arc::clone(self);
        let transcript = text.to_string();
        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            previous.abort();
            debug!("Pending transcript replaced by a newer final result");
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.resolve(&transcript);
        }));
    }

    fn on_error(self: &Arc<Self>, kind: &RecognitionErrorKind) {
        self.publish(SessionEvent::SessionError {
            session_id: self.session_id,
            kind: kind.clone(),
            timestamp: Timestamp::now(),
        });
        self.publish_status(&format!("Speech recognition error: {}", kind));

        let deadline = tokio::time::Instant::now() + self.status_hold;
        let shared = Arc::clone(self);
        let mut reset = self.lock_status_reset();
        if let Some(previous) = reset.take() {
            previous.abort();
        }
        *reset = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.publish_live(SessionEvent::Status {
                session_id: shared.session_id,
                message: STATUS_LISTENING.to_string(),
                timestamp: Timestamp::now(),
            });
        }));
    }

    fn resolve(&self, transcript: &str) {
        if normalize(transcript).is_empty() {
            debug!("Empty final transcript ignored");
            return;
        }

        let event = match self.matcher.resolve_transcript(transcript) {
            Some(resolved) => SessionEvent::Resolved {
                session_id: self.session_id,
                transcript: transcript.to_string(),
                resolved,
                timestamp: Timestamp::now(),
            },
            None => SessionEvent::NoMatch {
                session_id: self.session_id,
                transcript: transcript.to_string(),
                timestamp: Timestamp::now(),
            },
        };
        self.publish_live(event);
    }

    fn cancel_timers(&self) {
        if let Some(pending) = self.lock_pending().take() {
            pending.abort();
        }
        if let Some(reset) = self.lock_status_reset().take() {
            reset.abort();
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending_resolution
            .lock()
            .expect("pending resolution mutex poisoned")
    }

    fn lock_status_reset(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.status_reset.lock().expect("status reset mutex poisoned")
    }

    fn lock_stopped(&self) -> std::sync::MutexGuard<'_, bool> {
        self.stopped.lock().expect("stopped flag mutex poisoned")
    }
}

/// Turns a listening session into a stream of [`SessionEvent`]s.
pub struct ResolutionPipeline<R: Recognizer> {
    controller: SessionController<R>,
    shared: Arc<Shared>,
}

impl<R: Recognizer> ResolutionPipeline<R> {
    /// Wire the pipeline into `controller`, replacing its result and error
    /// handlers.
    pub fn new(controller: SessionController<R>, matcher: Arc<Matcher>, config: &SessionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            session_id: controller.session_id(),
            matcher,
            events,
            debounce: config.result_debounce(),
            status_hold: config.status_message_duration(),
            pending_resolution: Mutex::new(None),
            status_reset: Mutex::new(None),
            stopped: Mutex::new(false),
        });

        let s = Arc::clone(&shared);
        controller.on_result(move |text, is_final| s.on_result(text, is_final));
        let s = Arc::clone(&shared);
        controller.on_error(move |kind| s.on_error(kind));

        Self { controller, shared }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn controller(&self) -> &SessionController<R> {
        &self.controller
    }

    pub fn matcher(&self) -> &Matcher {
        &self.shared.matcher
    }

    pub async fn init(&self) -> Result<(), SessionError> {
        self.controller.init().await
    }

    pub fn start(&self) -> Result<(), SessionError> {
        let was_listening = self.controller.is_listening_desired();
        if !was_listening {
            *self.shared.lock_stopped() = false;
        }
        self.controller.start()?;
        if !was_listening {
            self.shared.publish_status(STATUS_LISTENING);
        }
        Ok(())
    }

    /// Stop listening and drop any transcript still inside its debounce
    /// window. `Stopped` is the last event until the next `start()`.
    pub fn stop(&self) {
        self.controller.stop();
        let mut stopped = self.shared.lock_stopped();
        *stopped = true;
        self.shared.cancel_timers();
        self.shared.publish_status(STATUS_STOPPED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{EventSink, MockRecognizer};
    use pommai_core::config::MatchingConfig;
    use pommai_core::types::{MatchTier, Payload};
    use pommai_resolve::{TriggerRegistry, VocabularyTables};
    use tokio::sync::broadcast::error::TryRecvError;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        settle().await;
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
        events
    }

    fn names(events: &[SessionEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.event_name()).collect()
    }

    struct Harness {
        pipeline: ResolutionPipeline<MockRecognizer>,
        sink: EventSink,
        rx: broadcast::Receiver<SessionEvent>,
    }

    async fn harness() -> Harness {
        let config = MatchingConfig::default();
        let registry = TriggerRegistry::build(&VocabularyTables::default(), &config);
        let matcher = Arc::new(Matcher::new(Arc::new(registry), &config));

        let mock = Arc::new(MockRecognizer::new());
        let controller = SessionController::new(Arc::clone(&mock), SessionConfig::default());
        let pipeline = ResolutionPipeline::new(controller, matcher, &SessionConfig::default());
        let mut rx = pipeline.subscribe();

        pipeline.init().await.unwrap();
        pipeline.start().unwrap();
        let sink = mock.sink().unwrap();
        assert_eq!(names(&drain(&mut rx)), vec!["status"]);

        Harness { pipeline, sink, rx }
    }

    fn command_of(event: &SessionEvent) -> &str {
        match event {
            SessionEvent::Resolved { resolved, .. } => match &resolved.payload {
                Payload::Command { key } => key.as_str(),
                other => panic!("Expected command payload, got {:?}", other),
            },
            other => panic!("Expected Resolved, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_result_resolved_after_debounce() {
        let mut h = harness().await;

        h.sink.result("நட", true);
        settle().await;
        assert_eq!(names(&drain(&mut h.rx)), vec!["transcript"]);

        advance(499).await;
        assert!(drain(&mut h.rx).is_empty());

        advance(1).await;
        let events = drain(&mut h.rx);
        assert_eq!(events.len(), 1);
        assert_eq!(command_of(&events[0]), "walk");
        match &events[0] {
            SessionEvent::Resolved { resolved, .. } => assert_eq!(resolved.tier, MatchTier::Exact),
            _ => unreachable!(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_final_result_replaces_pending() {
        let mut h = harness().await;

        h.sink.result("நட", true);
        settle().await;
        advance(300).await;
        h.sink.result("குதி", true);
        settle().await;
        advance(500).await;

        let resolved: Vec<SessionEvent> = drain(&mut h.rx)
            .into_iter()
            .filter(|e| e.event_name() == "resolved")
            .collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(command_of(&resolved[0]), "jump");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interim_results_are_not_resolved() {
        let mut h = harness().await;

        h.sink.result("உட்", false);
        h.sink.result("உட்கா", false);
        settle().await;
        advance(2_000).await;

        let events = drain(&mut h.rx);
        assert_eq!(names(&events), vec!["transcript", "transcript"]);
        match &events[1] {
            SessionEvent::Transcript { raw, is_final, .. } => {
                assert_eq!(raw, "உட்கா");
                assert!(!is_final);
            }
            other => panic!("Expected Transcript, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmatched_transcript_publishes_no_match() {
        let mut h = harness().await;

        h.sink.result("வணக்கம்", true);
        settle().await;
        advance(500).await;

        let events = drain(&mut h.rx);
        assert_eq!(names(&events), vec!["transcript", "no_match"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_final_transcript_is_ignored() {
        let mut h = harness().await;

        h.sink.result(" ... ", true);
        settle().await;
        advance(500).await;

        assert_eq!(names(&drain(&mut h.rx)), vec!["transcript"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_publishes_error_and_status() {
        let mut h = harness().await;

        h.sink.error(RecognitionErrorKind::Other("network".into()));
        settle().await;
        let events = drain(&mut h.rx);
        assert_eq!(names(&events), vec!["session_error", "status"]);
        match &events[1] {
            SessionEvent::Status { message, .. } => assert!(message.contains("network")),
            _ => unreachable!(),
        }

        advance(3_000).await;
        let events = drain(&mut h.rx);
        match events.as_slice() {
            [SessionEvent::Status { message, .. }] => assert_eq!(message, STATUS_LISTENING),
            other => panic!("Expected one status reset, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_publish_nothing() {
        let mut h = harness().await;

        h.sink.error(RecognitionErrorKind::NoSpeech);
        h.sink.error(RecognitionErrorKind::Aborted);
        settle().await;

        assert!(drain(&mut h.rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_drops_pending_transcript() {
        let mut h = harness().await;

        h.sink.result("நட", true);
        settle().await;
        h.pipeline.stop();
        advance(1_000).await;

        let events = drain(&mut h.rx);
        assert_eq!(names(&events), vec!["transcript", "status"]);
        match &events[1] {
            SessionEvent::Status { message, .. } => assert_eq!(message, STATUS_STOPPED),
            _ => unreachable!(),
        }
        assert!(!h.pipeline.controller().is_listening_desired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_resolved_after_stop() {
        let mut h = harness().await;
        h.pipeline.stop();
        assert_eq!(names(&drain(&mut h.rx)), vec!["status"]);

        // A debounce task already past its sleep still calls resolve().
        h.pipeline.shared.resolve("நட");
        h.pipeline.shared.resolve("வணக்கம்");
        assert!(drain(&mut h.rx).is_empty());

        h.pipeline.start().unwrap();
        h.sink.result("நட", true);
        settle().await;
        advance(500).await;
        assert_eq!(
            names(&drain(&mut h.rx)),
            vec!["status", "transcript", "resolved"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reset_suppressed_after_stop() {
        let mut h = harness().await;
        h.sink.error(RecognitionErrorKind::Other("network".into()));
        settle().await;
        assert_eq!(names(&drain(&mut h.rx)), vec!["session_error", "status"]);

        h.pipeline.stop();
        advance(5_000).await;
        let events = drain(&mut h.rx);
        match events.as_slice() {
            [SessionEvent::Status { message, .. }] => assert_eq!(message, STATUS_STOPPED),
            other => panic!("Expected only the stop status, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_carry_session_id() {
        let mut h = harness().await;
        let id = h.pipeline.controller().session_id();

        h.sink.result("குதி", true);
        settle().await;
        advance(500).await;

        for event in drain(&mut h.rx) {
            assert_eq!(event.session_id(), id);
        }
    }
}
