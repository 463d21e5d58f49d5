use crate::error::DictationError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Initializing,
    Running,
    Recovering { from_error: String },
    Stopping,
    Stopped,
}

/// Process-level lifecycle state, distinct from the per-session
/// `CaptureStateMachine` in [`crate::concurrency`]. Broadcasts transitions
/// to any subscriber (e.g. the health monitor) over an unbounded channel.
pub struct StateManager {
    state: Arc<RwLock<AppState>>,
    state_tx: Sender<AppState>,
    state_rx: Receiver<AppState>,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(AppState::Initializing)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: AppState) -> Result<(), DictationError> {
        let mut current = self.state.write();

        let valid = matches!(
            (&*current, &new_state),
            (AppState::Initializing, AppState::Running)
                | (AppState::Running, AppState::Recovering { .. })
                | (AppState::Running, AppState::Stopping)
                | (AppState::Recovering { .. }, AppState::Running)
                | (AppState::Recovering { .. }, AppState::Stopping)
                | (AppState::Stopping, AppState::Stopped)
        );

        if !valid {
            return Err(DictationError::Fatal(format!(
                "invalid state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::info!(from = ?*current, to = ?new_state, "state transition");
        *current = new_state.clone();
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> AppState {
        self.state.read().clone()
    }

    pub fn subscribe(&self) -> Receiver<AppState> {
        self.state_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializing_to_running_succeeds() {
        let sm = StateManager::new();
        assert!(sm.transition(AppState::Running).is_ok());
        assert_eq!(sm.current(), AppState::Running);
    }

    #[test]
    fn skipping_to_stopped_fails() {
        let sm = StateManager::new();
        assert!(sm.transition(AppState::Stopped).is_err());
        assert_eq!(sm.current(), AppState::Initializing);
    }

    #[test]
    fn subscribers_observe_transitions() {
        let sm = StateManager::new();
        let rx = sm.subscribe();
        sm.transition(AppState::Running).unwrap();
        assert_eq!(rx.recv().unwrap(), AppState::Running);
    }
}
