use tokio::sync::broadcast;
use tracing::debug;

use spill_shared::types::ChangeEvent;

/// Fan-out of committed row changes to every live subscriber.
///
/// Subscribers that fall more than `capacity` events behind skip ahead
/// (`RecvError::Lagged`). Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers will see the event; zero is normal.
    pub fn emit(&self, event: ChangeEvent) -> usize {
        debug!(event = %event.event_name(), record_id = %event.record_id, "change emitted");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}
