//! Run-state machine for a conversation thread.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThreadError};

/// Whether the pipeline may continue stepping a thread.
///
/// Valid transitions:
/// - `Idle → Running` when a new user command begins processing
/// - `Running → Stopped` on stop
/// - `Stopped | Idle → Running` on new input
///
/// Starting while already `Running` is a conflict, rejected rather than
/// silently queued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No command in flight.
    #[default]
    Idle,
    /// A command is being processed.
    Running,
    /// A stop was requested; no further steps start.
    Stopped,
}

impl RunState {
    /// Transition to `Running` for new input.
    pub fn start(&mut self) -> Result<()> {
        match self {
            RunState::Idle | RunState::Stopped => {
                *self = RunState::Running;
                Ok(())
            }
            RunState::Running => Err(ThreadError::InvalidTransition { state: *self }),
        }
    }

    /// Transition to `Stopped`. A no-op when not running.
    pub fn stop(&mut self) {
        if *self == RunState::Running {
            *self = RunState::Stopped;
        }
    }

    /// Transition back to `Idle` once processing completes normally.
    pub fn finish(&mut self) {
        if *self == RunState::Running {
            *self = RunState::Idle;
        }
    }

    /// True when a command is in flight.
    pub fn is_running(&self) -> bool {
        *self == RunState::Running
    }

    /// True when a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self == RunState::Stopped
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_to_running() {
        let mut state = RunState::Idle;
        state.start().unwrap();
        assert!(state.is_running());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut state = RunState::Running;
        let err = state.start().unwrap_err();
        assert!(matches!(
            err,
            ThreadError::InvalidTransition {
                state: RunState::Running
            }
        ));
        // State unchanged by the rejected transition.
        assert!(state.is_running());
    }

    #[test]
    fn test_stopped_restarts_on_new_input() {
        let mut state = RunState::Running;
        state.stop();
        assert!(state.is_stopped());
        state.start().unwrap();
        assert!(state.is_running());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut state = RunState::Idle;
        state.stop();
        assert_eq!(state, RunState::Idle);
    }

    #[test]
    fn test_finish_returns_to_idle() {
        let mut state = RunState::Running;
        state.finish();
        assert_eq!(state, RunState::Idle);
    }
}
