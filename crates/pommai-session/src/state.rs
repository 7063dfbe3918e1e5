//! Session status machine with thread-safe transitions.
//!
//! Valid transitions for the listening lifecycle:
//! - Idle/Stopped -> Starting (start requested)
//! - Starting -> Listening (recognizer started)
//! - Starting -> Restarting (start failed, retry scheduled)
//! - Listening -> Restarting (utterance ended or recoverable error)
//! - Restarting -> Restarting (a newer restart replaced the pending one)
//! - Restarting -> Listening (restart succeeded)
//! - any -> Stopped (explicit stop)

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::SessionError;

/// Operational status of a recognition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Initialized or fresh; never started.
    Idle,
    /// Start requested, recognizer start primitive in flight.
    Starting,
    /// The recognizer is running.
    Listening,
    /// Between recognizer runs, a restart is pending.
    Restarting,
    /// Stopped by the caller. No restarts happen from here.
    Stopped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "Idle"),
            SessionStatus::Starting => write!(f, "Starting"),
            SessionStatus::Listening => write!(f, "Listening"),
            SessionStatus::Restarting => write!(f, "Restarting"),
            SessionStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

impl SessionStatus {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (Idle, Starting)
                | (Stopped, Starting)
                | (Starting, Listening)
                | (Starting, Restarting)
                | (Listening, Restarting)
                | (Restarting, Restarting)
                | (Restarting, Listening)
                | (Idle, Stopped)
                | (Starting, Stopped)
                | (Listening, Stopped)
                | (Restarting, Stopped)
        )
    }
}

/// Shared, validated session status.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<SessionStatus>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionStatus::Idle)),
        }
    }

    pub fn current(&self) -> SessionStatus {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target status.
    pub fn transition(&self, target: SessionStatus) -> Result<(), SessionError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Session status: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: *state,
                to: target,
            })
        }
    }

    /// Move to `Stopped` from wherever the session is. Returns the prior status.
    pub fn stop(&self) -> SessionStatus {
        let mut state = self.state.lock().expect("state mutex poisoned");
        let previous = *state;
        if previous != SessionStatus::Stopped {
            tracing::debug!("Session status: {} -> {}", previous, SessionStatus::Stopped);
            *state = SessionStatus::Stopped;
        }
        previous
    }
}

// =============================================================================
// Tests
// =============================================================================
