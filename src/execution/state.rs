//! Per-run lifecycle state machine.

use thiserror::Error;

/// Lifecycle state of a single process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Request built, nothing spawned yet.
    #[default]
    Created,
    /// Child process is running.
    Spawned,
    /// Output is being pumped from the child.
    Streaming,
    /// Child has exited; the outcome is settled.
    Terminated,
}

/// Rejected state transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid run state transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}

impl RunState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Created -> Spawned
    /// - Spawned -> Streaming
    /// - Streaming -> Streaming
    /// - Spawned -> Terminated
    /// - Streaming -> Terminated
    pub fn can_transition_to(&self, target: RunState) -> bool {
        use RunState::*;
        matches!(
            (*self, target),
            (Created, Spawned)
                | (Spawned, Streaming)
                | (Streaming, Streaming)
                | (Spawned, Terminated)
                | (Streaming, Terminated)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: RunState) -> Result<(), InvalidTransition> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Terminated)
    }
}
