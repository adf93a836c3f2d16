use tokio::sync::watch;

pub use event_handler::EventHandler;
pub use rate_state::{RateState, SPEEDUP_FACTOR};
pub use report_tracker::ReportTracker;
pub use sync_engine::{ConsumeOutcome, SyncEngine};

mod event_handler;
mod rate_state;
mod report_tracker;
mod sync_engine;

/// Publisher connection as seen by the consume loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Reconnecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    AwaitingMessage,
    Processing,
    BacklogCheck,
}

/// Starts disconnected. Consumption waits for the first `Connected` event.
pub fn connection_channel() -> (watch::Sender<ConnectionState>, watch::Receiver<ConnectionState>) {
    watch::channel(ConnectionState::Disconnected)
}
