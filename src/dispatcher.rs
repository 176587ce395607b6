use std::sync::Arc;

use crate::events::DomainEvent;
use crate::registry::SessionRegistry;
use crate::websocket::messages::ServerMessage;

/// Buffer of domain events awaiting fan-out. Handlers stage an event only
/// after the store write it describes has committed, so draining the outbox
/// can never leak an aborted mutation to observers.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<DomainEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn into_events(self) -> Vec<DomainEvent> {
        self.events
    }
}

/// Drains committed events into the session registry, one game's events at a
/// time, preserving publish order. Delivery failures stay inside the
/// registry; they never propagate back into the mutation path.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn dispatch(&self, outbox: Outbox) {
        for event in outbox.into_events() {
            let game_id = event.game_id();
            tracing::debug!("dispatching {:?} to game {}", event, game_id);
            self.registry
                .broadcast(game_id, ServerMessage::from(event))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn dispatch_preserves_publish_order() {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone());
        let (tx, mut rx) = mpsc::channel(8);
        registry.register(9, tx);

        let mut outbox = Outbox::new();
        outbox.stage(DomainEvent::CardDrawReset { game_id: 9 });
        outbox.stage(DomainEvent::CountingUpdate {
            game_id: 9,
            score_counting: true,
        });
        dispatcher.dispatch(outbox).await;

        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::CardDrawReset { .. })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::ScoreCountingUpdated { .. })
        ));
    }

    #[tokio::test]
    async fn empty_outbox_dispatches_nothing() {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone());
        let (tx, mut rx) = mpsc::channel(8);
        registry.register(9, tx);

        dispatcher.dispatch(Outbox::new()).await;
        assert!(rx.try_recv().is_err());
    }
}
