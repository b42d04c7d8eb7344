//! Engine event bus - user-visible acknowledgements and failure toasts

use tokio::sync::broadcast;

/// Events the presentation layer renders as toasts/acknowledgements
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A reputation delta was applied
    PointsAwarded {
        user_id: String,
        delta: i64,
        reason: String,
    },
    /// A mutation failed after validation; local state is unchanged
    OperationFailed { context: String, message: String },
}

/// Fan-out bus for engine events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Send an event; dropped silently when nothing is listening
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.emit(EngineEvent::PointsAwarded {
            user_id: "u1".into(),
            delta: 25,
            reason: "resource upload".into(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, EngineEvent::PointsAwarded { delta: 25, .. }));
    }

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        let bus = EventBus::new(8);
        bus.emit(EngineEvent::OperationFailed {
            context: "vote".into(),
            message: "remote operation failed".into(),
        });
    }
}
