//! Error types for the recognition session.

use pommai_core::error::PommaiError;

use crate::state::SessionStatus;

/// Errors reported by a recognizer's control primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognizerError {
    #[error("Speech recognizer unavailable: {0}")]
    Unavailable(String),
    #[error("Speech recognition permission denied")]
    PermissionDenied,
    /// Start was requested while a recognition run is still active.
    #[error("Speech recognizer is already running")]
    AlreadyRunning,
    #[error("Speech recognizer failed: {0}")]
    Failed(String),
}

/// Errors surfaced by the session controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The recognizer could not be acquired. Fatal for the session.
    #[error("Recognizer initialization failed: {0}")]
    Initialization(#[source] RecognizerError),
    #[error("Session controller has not been initialized")]
    NotInitialized,
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
    #[error("Core error: {0}")]
    Core(#[from] PommaiError),
}

impl SessionError {
    /// Only initialization failures end a session; everything else is recovered.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Initialization(_))
    }
}

impl From<SessionError> for PommaiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Core(inner) => inner,
            SessionError::Initialization(source) => PommaiError::Initialization(source.to_string()),
            other => PommaiError::Session(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizer_error_display() {
        assert_eq!(
            RecognizerError::Unavailable("no audio device".into()).to_string(),
            "Speech recognizer unavailable: no audio device"
        );
        assert_eq!(
            RecognizerError::AlreadyRunning.to_string(),
            "Speech recognizer is already running"
        );
    }

    #[test]
    fn test_only_initialization_is_fatal() {
        assert!(SessionError::Initialization(RecognizerError::PermissionDenied).is_fatal());
        assert!(!SessionError::NotInitialized.is_fatal());
        assert!(!SessionError::InvalidTransition {
            from: SessionStatus::Idle,
            to: SessionStatus::Listening,
        }
        .is_fatal());
    }

    #[test]
    fn test_initialization_keeps_source() {
        let err = SessionError::Initialization(RecognizerError::PermissionDenied);
        assert!(err.to_string().contains("permission denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_into_pommai_error() {
        let core: PommaiError =
            SessionError::Initialization(RecognizerError::Unavailable("x".into())).into();
        assert!(matches!(core, PommaiError::Initialization(_)));

        let core: PommaiError = SessionError::NotInitialized.into();
        assert!(matches!(core, PommaiError::Session(_)));

        let core: PommaiError = SessionError::Core(PommaiError::Config("bad".into())).into();
        assert!(matches!(core, PommaiError::Config(_)));
    }
}
