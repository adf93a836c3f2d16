use spdlog::{info, trace};
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

use crate::agent::AgentEvent;
use crate::sync::ReportTracker;

/// Drains publisher events on its own task and applies them to the tracker.
pub struct EventHandler {
    receiver_task: JoinHandle<()>,
}

impl EventHandler {
    pub fn new(mut events: Receiver<AgentEvent>, tracker: ReportTracker) -> Self {
        let receiver_task = tokio::spawn(async move {
            info!("Starting agent event receiver");
            while let Some(event) = events.recv().await {
                trace!("Agent event {:?}", event);
                tracker.handle_event(event);
            }
            info!("Agent event stream closed");
        });

        Self { receiver_task }
    }

    pub fn is_finished(&self) -> bool {
        self.receiver_task.is_finished()
    }

    pub fn stop(&self) {
        self.receiver_task.abort();
    }
}
