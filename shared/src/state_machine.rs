//! Delivery State Machine
//!
//! Per-device view of a command batch moving from delivery to
//! acknowledgement. New batches are created by an external producer, so
//! the machine only reacts to what a poll or an acknowledgement reports.

use crate::SeqToken;

/// Where a device stands with respect to its command queue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliveryState {
    /// Nothing delivered, or the last delivery was abandoned
    #[default]
    NoCommands,
    /// Batch delivered and being processed, not yet acknowledged
    Pending(SeqToken),
    /// Batch processed and removed from the queue
    Acknowledged(SeqToken),
}

/// Observations that drive the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// A poll returned a batch for this token
    Delivered(SeqToken),
    /// A poll found no batch for the current token
    NothingPending,
    /// Local processing of the batch failed
    ProcessingFailed(SeqToken),
    /// The server confirmed deletion of the batch
    Acknowledged(SeqToken),
    /// The server had no batch left to delete
    AlreadyAcknowledged(SeqToken),
}

/// Result of feeding an event to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// A new batch must be executed
    Execute(SeqToken),
    /// The batch for this token is settled
    Settled(SeqToken),
    /// Nothing to do
    Unchanged,
    /// The event does not apply in the current state
    Invalid {
        from: DeliveryState,
        event: DeliveryEvent,
    },
}

/// Tracks delivery of command batches for one device
#[derive(Debug, Default)]
pub struct DeliveryStateMachine {
    current_state: DeliveryState,
}

impl DeliveryStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> &DeliveryState {
        &self.current_state
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: DeliveryEvent) -> TransitionResult {
        use DeliveryEvent as E;
        use DeliveryState as S;

        let (next, result) = match (&self.current_state, event) {
            (S::Pending(cur) | S::Acknowledged(cur), E::Delivered(t)) if *cur == t => {
                (None, TransitionResult::Unchanged)
            }
            (_, E::Delivered(t)) => (
                Some(S::Pending(t.clone())),
                TransitionResult::Execute(t),
            ),

            (S::Pending(cur), E::Acknowledged(t) | E::AlreadyAcknowledged(t)) if *cur == t => (
                Some(S::Acknowledged(t.clone())),
                TransitionResult::Settled(t),
            ),

            (S::Pending(cur), E::ProcessingFailed(t)) if *cur == t => {
                (Some(S::NoCommands), TransitionResult::Unchanged)
            }

            // Someone else removed the batch we were working on
            (S::Pending(_), E::NothingPending) => (Some(S::NoCommands), TransitionResult::Unchanged),
            (_, E::NothingPending) => (None, TransitionResult::Unchanged),

            (from, event) => (
                None,
                TransitionResult::Invalid {
                    from: from.clone(),
                    event,
                },
            ),
        };

        if let Some(state) = next {
            self.current_state = state;
        }
        result
    }
}
