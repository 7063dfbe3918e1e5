use serde::{Deserialize, Serialize};

use crate::types::{RecognitionErrorKind, ResolvedMatch, SessionId, Timestamp};

/// Events published to the presentation layer.
///
/// Emitted by the resolution pipeline in delivery order and consumed by
/// whatever renders the animation, letter, or word.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    /// Raw recognizer output, interim or final.
    Transcript {
        session_id: SessionId,
        raw: String,
        is_final: bool,
        timestamp: Timestamp,
    },

    /// A final transcript resolved to a command, letter, or word.
    Resolved {
        session_id: SessionId,
        transcript: String,
        resolved: ResolvedMatch,
        timestamp: Timestamp,
    },

    /// A final transcript matched nothing; the display keeps its state.
    NoMatch {
        session_id: SessionId,
        transcript: String,
        timestamp: Timestamp,
    },

    /// A recognizer fault that was surfaced but is being recovered.
    SessionError {
        session_id: SessionId,
        kind: RecognitionErrorKind,
        timestamp: Timestamp,
    },

    /// Short-lived status text for the user.
    Status {
        session_id: SessionId,
        message: String,
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SessionEvent::Transcript { timestamp, .. }
            | SessionEvent::Resolved { timestamp, .. }
            | SessionEvent::NoMatch { timestamp, .. }
            | SessionEvent::SessionError { timestamp, .. }
            | SessionEvent::Status { timestamp, .. } => *timestamp,
        }
    }

    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::Transcript { session_id, .. }
            | SessionEvent::Resolved { session_id, .. }
            | SessionEvent::NoMatch { session_id, .. }
            | SessionEvent::SessionError { session_id, .. }
            | SessionEvent::Status { session_id, .. } => *session_id,
        }
    }

    /// Returns a short event name for logging and output.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::Transcript { .. } => "transcript",
            SessionEvent::Resolved { .. } => "resolved",
            SessionEvent::NoMatch { .. } => "no_match",
            SessionEvent::SessionError { .. } => "session_error",
            SessionEvent::Status { .. } => "status",
        }
    }
}
