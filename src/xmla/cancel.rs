//! Cooperative cancellation.
//!
//! One token accompanies each execute call. The token's mutex guards
//! the window between "decide to send" and "request sent": the sender
//! transitions to in-flight under the lock, and a cancel issued
//! concurrently either lands before the transition (the send is
//! skipped, no network call happens) or after it (the canceller gets
//! the in-flight statement text back and performs the best-effort
//! server-side cancel). A cancel can never race past the point where
//! the request is irrevocably sent without being observed.

use std::sync::{Arc, Mutex};

/// What the canceller found when it marked the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelObservation {
    /// Nothing was in flight; the sender will skip the send.
    NotSent,
    /// A request is in flight; carries the statement text for
    /// server-side session matching.
    InFlight { statement: String },
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: bool,
    /// Statement text of the in-flight execute, set while a request is
    /// out on the wire.
    in_flight: Option<String>,
}

/// Shared cancellation token, cloneable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    shared: Arc<Mutex<CancelState>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the token has been marked.
    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().expect("cancel lock poisoned").cancelled
    }

    /// Mark the token cancelled and report what was observed.
    pub fn cancel(&self) -> CancelObservation {
        let mut state = self.shared.lock().expect("cancel lock poisoned");
        state.cancelled = true;
        match &state.in_flight {
            Some(statement) => CancelObservation::InFlight {
                statement: statement.clone(),
            },
            None => CancelObservation::NotSent,
        }
    }

    /// Transition to in-flight unless already cancelled.
    ///
    /// Returns `false` when the token was cancelled first, in which
    /// case the caller must not send.
    pub(crate) fn try_mark_sent(&self, statement: &str) -> bool {
        let mut state = self.shared.lock().expect("cancel lock poisoned");
        if state.cancelled {
            return false;
        }
        state.in_flight = Some(statement.to_string());
        true
    }

    /// Clear the in-flight marker once the response is fully read.
    pub(crate) fn finish(&self) {
        self.shared.lock().expect("cancel lock poisoned").in_flight = None;
    }
}
