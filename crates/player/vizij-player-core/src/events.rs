//! Session event subscriptions.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Load,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// The engine accepted the file. `source` is the locator it came from,
    /// or empty when loaded from a raw buffer.
    Load { source: String },
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::Load { .. } => EventKind::Load,
        }
    }
}

pub type Subscriber = Box<dyn FnMut(&PlayerEvent) + Send>;

/// Subscriber lists keyed by event kind, notified in subscription order.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, subscriber: Subscriber) {
        self.subscribers.entry(kind).or_default().push(subscriber);
    }

    pub fn emit(&mut self, event: &PlayerEvent) {
        if let Some(list) = self.subscribers.get_mut(&event.kind()) {
            for subscriber in list.iter_mut() {
                subscriber(event);
            }
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.subscribers.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn emits_to_subscribers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(
                EventKind::Load,
                Box::new(move |event| {
                    let PlayerEvent::Load { source } = event;
                    seen.lock().unwrap().push(format!("{tag}:{source}"));
                }),
            );
        }
        bus.emit(&PlayerEvent::Load {
            source: "remote.riv".into(),
        });
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:remote.riv".to_string(), "b:remote.riv".to_string()]
        );
        assert_eq!(bus.subscriber_count(EventKind::Load), 2);
    }
}
