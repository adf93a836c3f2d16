use spdlog::{debug, error, info, warn};
use tokio::sync::watch;

use crate::agent::AgentEvent;
use crate::metrics::SharedStore;
use crate::sync::ConnectionState;

/// Reacts to publisher events: gates the consume loop on the connection state and clears
/// reported metrics after each report.
pub struct ReportTracker {
    store: SharedStore,
    connection: watch::Sender<ConnectionState>,
}

impl ReportTracker {
    pub fn new(store: SharedStore, connection: watch::Sender<ConnectionState>) -> Self {
        Self { store, connection }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn handle_event(&self, event: AgentEvent) {
        match event {
            AgentEvent::Connected => {
                info!("Agent connected. Consuming queue");
                self.set_connection(ConnectionState::Connected);
            }
            AgentEvent::Disconnected => {
                warn!("Agent disconnected. Pausing queue consumption");
                self.set_connection(ConnectionState::Disconnected);
            }
            AgentEvent::Reconnecting => {
                warn!("Agent reconnecting. Pausing queue consumption");
                self.set_connection(ConnectionState::Reconnecting);
            }
            AgentEvent::MessageReceived => {
                self.on_report_tick();
            }
        }
    }

    /// Runs once a report has been sent. When anything was merged since the last reset, the
    /// readings that report carried go back to unset. Returns how many were cleared.
    pub fn on_report_tick(&self) -> usize {
        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(_) => {
                error!("Metric store lock poisoned. Skipping reset");
                return 0;
            }
        };

        if !store.is_dirty() {
            return 0;
        }

        let cleared = store.reset_reported();
        debug!("Reset {} metrics after report", cleared);
        cleared
    }

    fn set_connection(&self, state: ConnectionState) {
        self.connection.send_replace(state);
    }
}

#[cfg(test)]
mod tests {
    use crate::metrics::metric_store::MetricStore;
    use crate::metrics::metric_types::Reading;
    use crate::metrics::shared_store;
    use crate::sync::connection_channel;

    use super::*;

    #[test]
    fn test_connection_transitions() {
        let (tx, rx) = connection_channel();
        let tracker = ReportTracker::new(shared_store(MetricStore::new(&["cpu"])), tx);
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);

        tracker.handle_event(AgentEvent::Connected);
        assert_eq!(*rx.borrow(), ConnectionState::Connected);
        tracker.handle_event(AgentEvent::Reconnecting);
        assert_eq!(*rx.borrow(), ConnectionState::Reconnecting);
        tracker.handle_event(AgentEvent::Connected);
        tracker.handle_event(AgentEvent::Disconnected);
        assert_eq!(tracker.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_report_then_reset() {
        let (tx, _rx) = connection_channel();
        let store = shared_store(MetricStore::new(&["cpu", "mem"]));
        let tracker = ReportTracker::new(store.clone(), tx);

        // Nothing merged yet
        assert_eq!(tracker.on_report_tick(), 0);

        store.lock().unwrap().update("cpu", Some(500), Some(42.0));
        let reported = store.lock().unwrap().read_for_report("cpu");
        assert_eq!(reported, Some(Reading::new(Some(500), Some(42.0))));

        tracker.handle_event(AgentEvent::MessageReceived);
        assert_eq!(store.lock().unwrap().read("cpu"), Some(Reading::unset()));
        assert!(!store.lock().unwrap().is_dirty());
    }

    #[test]
    fn test_unreported_sample_survives_tick() {
        let (tx, _rx) = connection_channel();
        let store = shared_store(MetricStore::new(&["cpu"]));
        let tracker = ReportTracker::new(store.clone(), tx);

        store.lock().unwrap().update("cpu", Some(500), Some(42.0));
        assert_eq!(tracker.on_report_tick(), 0);
        assert_eq!(store.lock().unwrap().read("cpu"), Some(Reading::new(Some(500), Some(42.0))));
    }
}
