use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::scene::EntityId;

/// Input forwarded from the host's interaction layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionEvent {
    /// The movable entity of `step` was let go by the user.
    GrabReleased { step: usize },
    /// Some entity entered the capture volume of socket `socket`.
    EnteredSocket { socket: usize, entity: EntityId },
}

impl InteractionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InteractionEvent::GrabReleased { .. } => EventKind::GrabReleased,
            InteractionEvent::EnteredSocket { .. } => EventKind::EnteredSocket,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GrabReleased,
    EnteredSocket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug)]
struct Listener {
    id: ListenerId,
    kinds: Vec<EventKind>,
    inbox: VecDeque<InteractionEvent>,
}

/// Typed event bus with an explicit subscription lifetime.
///
/// Each listener owns a FIFO inbox; publishing copies the event into every
/// inbox subscribed to its kind. Unsubscribing drops the inbox, so nothing
/// published afterwards reaches the former listener.
#[derive(Debug, Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kinds: &[EventKind]) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            kinds: kinds.to_vec(),
            inbox: VecDeque::new(),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        before != self.listeners.len()
    }

    /// Delivers `event` and returns how many listeners received it.
    pub fn publish(&mut self, event: InteractionEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for listener in &mut self.listeners {
            if listener.kinds.contains(&kind) {
                listener.inbox.push_back(event);
                delivered += 1;
            }
        }
        if delivered == 0 {
            tracing::debug!(?event, "event published with no listeners");
        }
        delivered
    }

    /// Takes every pending event for `id`, oldest first.
    pub fn drain(&mut self, id: ListenerId) -> Vec<InteractionEvent> {
        self.listeners
            .iter_mut()
            .find(|listener| listener.id == id)
            .map(|listener| listener.inbox.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_events_by_kind() {
        let mut bus = EventBus::new();
        let releases = bus.subscribe(&[EventKind::GrabReleased]);
        let everything = bus.subscribe(&[EventKind::GrabReleased, EventKind::EnteredSocket]);

        bus.publish(InteractionEvent::GrabReleased { step: 1 });
        let placed = InteractionEvent::EnteredSocket {
            socket: 0,
            entity: EntityId(4),
        };
        assert_eq!(bus.publish(placed), 1);

        assert_eq!(
            bus.drain(releases),
            vec![InteractionEvent::GrabReleased { step: 1 }]
        );
        assert_eq!(
            bus.drain(everything),
            vec![InteractionEvent::GrabReleased { step: 1 }, placed]
        );
        assert!(bus.drain(everything).is_empty());
    }

    #[test]
    fn unsubscribed_listeners_receive_nothing() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(&[EventKind::GrabReleased]);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        assert_eq!(bus.publish(InteractionEvent::GrabReleased { step: 0 }), 0);
        assert!(bus.drain(id).is_empty());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: InteractionEvent =
            serde_json::from_str(r#"{"kind":"entered_socket","socket":2,"entity":9}"#).unwrap();
        assert_eq!(
            event,
            InteractionEvent::EnteredSocket {
                socket: 2,
                entity: EntityId(9)
            }
        );
    }
}
