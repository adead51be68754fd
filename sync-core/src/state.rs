//! Connectivity state machine for practice-sync.
//!
//! This module provides a pure, side-effect-free state machine tracking
//! whether the device can reach the remote work source. It takes reports as
//! input and produces a new state plus a list of actions to execute.
//!
//! Probing, broadcasting and draining are performed by sync-client, not by
//! this module.

/// Connectivity state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Nothing reported yet. Treated as offline by every consumer.
    #[default]
    Unknown,
    /// Last report said the device is offline.
    Offline,
    /// Last report said the device is online.
    Online,
}

impl Connectivity {
    /// Create a new state machine in the Unknown state.
    pub fn new() -> Self {
        Self::Unknown
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function. A drain is requested exactly once per
    /// transition into `Online`; repeated online reports request nothing.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Into Online
            (Self::Unknown | Self::Offline, Event::ReportedOnline) => (
                Self::Online,
                vec![
                    Action::EmitEvent(NetworkEvent::WentOnline),
                    Action::TriggerDrain,
                ],
            ),
            (Self::Online, Event::ReportedOnline) => (Self::Online, vec![]),

            // Out of Online
            (Self::Online, Event::ReportedOffline) => (
                Self::Offline,
                vec![Action::EmitEvent(NetworkEvent::WentOffline { reason: None })],
            ),
            (Self::Online, Event::ProbeFailed { error }) => (
                Self::Offline,
                vec![Action::EmitEvent(NetworkEvent::WentOffline {
                    reason: Some(error),
                })],
            ),

            // First determination, or repeated offline reports
            (Self::Unknown | Self::Offline, Event::ReportedOffline | Event::ProbeFailed { .. }) => {
                (Self::Offline, vec![])
            }
        }
    }

    /// Check if the last report said online.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Reports fed into the connectivity state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A probe or the platform reported the remote source reachable.
    ReportedOnline,
    /// A probe or the platform reported the remote source unreachable.
    ReportedOffline,
    /// The probe itself failed; treated as offline.
    ProbeFailed {
        /// Error message describing the failure.
        error: String,
    },
}

/// Actions to be executed by the sync-client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Broadcast an event to subscribers.
    EmitEvent(NetworkEvent),
    /// Ask the engine to drain the result queue.
    TriggerDrain,
}

/// Events emitted to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Connectivity came back.
    WentOnline,
    /// Connectivity was lost.
    WentOffline {
        /// Probe error, when the loss was detected by a failing probe.
        reason: Option<String>,
    },
}
