//! Network state monitor.
//!
//! Wraps a [`ConnectivityProbe`] and the pure [`Connectivity`] state
//! machine from sync-core. Every report (probe result or platform push) is
//! fed through the state machine, and its actions are carried out here:
//! - `EmitEvent` is broadcast to subscribers
//! - `TriggerDrain` wakes whoever waits on [`NetworkMonitor::drain_trigger`]
//!
//! The monitor owns nothing but its connectivity flag. Until the first
//! successful probe it reports offline.

mod probe;

pub use probe::{ConnectivityProbe, HttpProbe, ManualProbe, ProbeError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use practice_sync_core::{Action, Connectivity, Event, NetworkEvent};
use tokio::sync::{broadcast, Mutex, Notify};

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Tracks connectivity and announces transitions.
pub struct NetworkMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    state: Mutex<Connectivity>,
    online: AtomicBool,
    events: broadcast::Sender<NetworkEvent>,
    drain_trigger: Arc<Notify>,
}

impl NetworkMonitor {
    /// Create a monitor over `probe`, starting in the unknown (offline) state.
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            probe,
            state: Mutex::new(Connectivity::new()),
            online: AtomicBool::new(false),
            events,
            drain_trigger: Arc::new(Notify::new()),
        }
    }

    /// Last known connectivity, without probing.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Probe now and return the refreshed connectivity.
    pub async fn check_online(&self) -> bool {
        let event = match self.probe.probe().await {
            Ok(true) => Event::ReportedOnline,
            Ok(false) => Event::ReportedOffline,
            Err(e) => {
                tracing::warn!("Connectivity probe failed, assuming offline: {}", e);
                Event::ProbeFailed {
                    error: e.to_string(),
                }
            }
        };
        self.apply(event).await
    }

    /// Accept a connectivity transition pushed by the platform.
    pub async fn report(&self, online: bool) -> bool {
        let event = if online {
            Event::ReportedOnline
        } else {
            Event::ReportedOffline
        };
        self.apply(event).await
    }

    /// Subscribe to connectivity transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe()
    }

    /// Notified once per transition into online.
    ///
    /// At most one wake-up is stored while nobody is waiting.
    pub fn drain_trigger(&self) -> Arc<Notify> {
        Arc::clone(&self.drain_trigger)
    }

    async fn apply(&self, event: Event) -> bool {
        let mut state = self.state.lock().await;
        let (next, actions) = state.clone().on_event(event);
        let online = next.is_online();
        *state = next;
        self.online.store(online, Ordering::SeqCst);

        for action in actions {
            match action {
                Action::EmitEvent(event) => {
                    match &event {
                        NetworkEvent::WentOnline => tracing::info!("Network: online"),
                        NetworkEvent::WentOffline { reason: Some(reason) } => {
                            tracing::info!("Network: offline ({})", reason)
                        }
                        NetworkEvent::WentOffline { reason: None } => {
                            tracing::info!("Network: offline")
                        }
                    }
                    // No subscribers is fine.
                    let _ = self.events.send(event);
                }
                Action::TriggerDrain => self.drain_trigger.notify_one(),
            }
        }
        online
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn monitor(online: bool) -> (NetworkMonitor, ManualProbe) {
        let probe = ManualProbe::new(online);
        (NetworkMonitor::new(Arc::new(probe.clone())), probe)
    }

    #[tokio::test]
    async fn offline_until_first_probe() {
        let (monitor, _probe) = monitor(true);
        assert!(!monitor.is_online());
        assert!(monitor.check_online().await);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn probe_failure_reports_offline() {
        let (monitor, probe) = monitor(true);
        monitor.check_online().await;

        probe.set_failure(Some("no route"));
        assert!(!monitor.check_online().await);
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn transitions_are_broadcast() {
        let (monitor, probe) = monitor(false);
        let mut events = monitor.subscribe();

        monitor.check_online().await;
        probe.set_online(true);
        monitor.check_online().await;
        monitor.check_online().await;
        monitor.report(false).await;

        assert_eq!(events.recv().await.unwrap(), NetworkEvent::WentOnline);
        assert_eq!(
            events.recv().await.unwrap(),
            NetworkEvent::WentOffline { reason: None }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn going_online_fires_drain_trigger() {
        let (monitor, _probe) = monitor(false);
        let trigger = monitor.drain_trigger();

        monitor.report(true).await;

        tokio::time::timeout(Duration::from_millis(100), trigger.notified())
            .await
            .expect("drain trigger should have a stored permit");
    }

    #[tokio::test]
    async fn staying_online_does_not_retrigger() {
        let (monitor, _probe) = monitor(false);
        let trigger = monitor.drain_trigger();

        monitor.report(true).await;
        trigger.notified().await;

        monitor.report(true).await;
        let second = tokio::time::timeout(Duration::from_millis(50), trigger.notified()).await;
        assert!(second.is_err(), "no new transition, no new trigger");
    }
}
